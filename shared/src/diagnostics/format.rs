//! Positional message formatting for diagnostic events.
//!
//! Templates use composite-format placeholders: `{0}`, `{1}`, ... An optional
//! alignment (`{0,8}`) or format string (`{0:x}`) is accepted and ignored.
//! `{{` and `}}` produce literal braces.

use crate::models::Scalar;
use std::fmt::Write as _;
use thiserror::Error;

/// Marker appended to the raw template when substitution fails.
pub const FORMAT_ERROR_MARKER: &str = "[format-error]";

/// Turns an event's template and payload into the final message.
///
/// Implementations must not fail: a formatting problem is reported inside the
/// returned string.
pub trait MessageFormatter: Send + Sync {
    /// Formats `template` with `payload`.
    fn format(&self, template: Option<&str>, payload: &[Scalar]) -> String;
}

/// The default formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalFormatter;

impl MessageFormatter for PositionalFormatter {
    fn format(&self, template: Option<&str>, payload: &[Scalar]) -> String {
        match (template, payload.is_empty()) {
            (Some(template), false) => substitute(template, payload)
                .unwrap_or_else(|_| format!("{template} {FORMAT_ERROR_MARKER}")),
            (Some(template), true) => template.to_string(),
            (None, false) => payload
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            (None, true) => String::new(),
        }
    }
}

/// Reasons a template could not be filled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A placeholder refers to a position the payload does not have.
    #[error("placeholder {index} is out of range for a payload of {len}")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of payload values.
        len: usize,
    },

    /// A `{` was never closed.
    #[error("unterminated placeholder")]
    Unterminated,

    /// A placeholder did not start with a position.
    #[error("invalid placeholder '{0}'")]
    InvalidPlaceholder(String),

    /// A lone `}` outside a placeholder.
    #[error("unexpected closing brace")]
    UnexpectedClosingBrace,
}

/// Substitutes payload values into `template`.
///
/// # Errors
///
/// Returns a [`FormatError`] when the template is malformed or refers to a
/// payload position that does not exist.
pub fn substitute(template: &str, payload: &[Scalar]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + payload.len() * 8);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut index_text = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => index_text.push(c),
                        None => return Err(FormatError::Unterminated),
                    }
                }
                let position = index_text
                    .split([',', ':'])
                    .next()
                    .unwrap_or_default()
                    .trim();
                let index: usize = position
                    .parse()
                    .map_err(|_| FormatError::InvalidPlaceholder(index_text.clone()))?;
                let value = payload.get(index).ok_or(FormatError::IndexOutOfRange {
                    index,
                    len: payload.len(),
                })?;
                let _ = write!(out, "{value}");
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(FormatError::UnexpectedClosingBrace),
            c => out.push(c),
        }
    }

    Ok(out)
}
