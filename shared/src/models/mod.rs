//! Data models for the OTel demo.
//!
//! This module contains the plain data structures shared by the instrumentation
//! facade, the diagnostic bridge and the HTTP layer.

pub mod diagnostic;
pub mod forecast;
pub mod scalar;
pub mod trace;

pub use diagnostic::{DiagnosticEvent, DiagnosticSeverity, ForwardedLogRecord, ParseSeverityError};
pub use forecast::WeatherForecast;
pub use scalar::Scalar;
pub use trace::SpanKind;
