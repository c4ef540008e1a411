//! Validation of instrument and source names.

use thiserror::Error;

/// Longest instrument name accepted by the OpenTelemetry specification.
pub const MAX_INSTRUMENT_NAME_LEN: usize = 255;

/// Errors raised while creating instruments.
///
/// These are startup errors: a process with a bad instrument name does not
/// start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstrumentationError {
    /// The name is empty.
    #[error("{kind} name cannot be empty")]
    EmptyName {
        /// What was being named ("counter", "source").
        kind: &'static str,
    },

    /// The name is longer than [`MAX_INSTRUMENT_NAME_LEN`].
    #[error("{kind} name '{name}' is {len} characters long (max 255)")]
    NameTooLong {
        /// What was being named.
        kind: &'static str,
        /// The rejected name.
        name: String,
        /// Its length.
        len: usize,
    },

    /// The name contains a character that is not allowed.
    #[error("{kind} name '{name}' is invalid: {reason}")]
    InvalidName {
        /// What was being named.
        kind: &'static str,
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Checks an instrument name against the OpenTelemetry naming rules.
///
/// The first character must be an ASCII letter; the rest ASCII alphanumerics
/// or one of `_`, `.`, `-`, `/`.
///
/// # Errors
///
/// Returns an [`InstrumentationError`] describing the first rule broken.
pub fn validate_instrument_name(name: &str) -> Result<(), InstrumentationError> {
    const KIND: &str = "counter";

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(InstrumentationError::EmptyName { kind: KIND });
    };

    if name.len() > MAX_INSTRUMENT_NAME_LEN {
        return Err(InstrumentationError::NameTooLong {
            kind: KIND,
            name: name.to_string(),
            len: name.len(),
        });
    }

    if !first.is_ascii_alphabetic() {
        return Err(InstrumentationError::InvalidName {
            kind: KIND,
            name: name.to_string(),
            reason: "must start with an ASCII letter",
        });
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/')) {
        return Err(InstrumentationError::InvalidName {
            kind: KIND,
            name: name.to_string(),
            reason: "only ASCII letters, digits, '_', '.', '-' and '/' are allowed",
        });
    }

    Ok(())
}

/// Checks a span source / meter name: non-empty, no control characters.
///
/// # Errors
///
/// Returns an [`InstrumentationError`] if the name is empty or contains
/// control characters.
pub fn validate_source_name(name: &str) -> Result<(), InstrumentationError> {
    const KIND: &str = "source";

    if name.trim().is_empty() {
        return Err(InstrumentationError::EmptyName { kind: KIND });
    }
    if name.chars().any(char::is_control) {
        return Err(InstrumentationError::InvalidName {
            kind: KIND,
            name: name.to_string(),
            reason: "control characters are not allowed",
        });
    }
    Ok(())
}
