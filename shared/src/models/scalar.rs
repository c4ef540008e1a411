//! Scalar values used as span tags and diagnostic payload entries.

use serde::{Deserialize, Serialize};

/// A single scalar value.
///
/// Span tags and diagnostic payloads only ever carry scalars; anything richer
/// is rendered to a string by the caller first.
///
/// # Example
///
/// ```
/// use shared::models::Scalar;
///
/// let value: Scalar = 42_i64.into();
/// assert_eq!(value.to_string(), "42");
///
/// let value: Scalar = "GET".into();
/// assert_eq!(value, Scalar::Str("GET".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A floating point number.
    F64(f64),
    /// A string.
    Str(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::U64(u64::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Self::U64(value as u64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Scalar> for opentelemetry::Value {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Bool(v) => Self::Bool(v),
            Scalar::I64(v) => Self::I64(v),
            // OTel attributes have no unsigned type; saturate rather than wrap.
            Scalar::U64(v) => Self::I64(i64::try_from(v).unwrap_or(i64::MAX)),
            Scalar::F64(v) => Self::F64(v),
            Scalar::Str(v) => Self::String(v.into()),
        }
    }
}
