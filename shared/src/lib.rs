//! OTel Demo Shared Library
//!
//! The telemetry core of the demo service, independent of the HTTP layer.
//!
//! # Modules
//!
//! - [`models`] - Plain data: scalars, span kinds, diagnostic events, forecasts
//! - [`instrumentation`] - Process-wide span source and counter
//! - [`diagnostics`] - Bridge from the SDK's internal diagnostics to the log
//! - [`metrics_proxy`] - Range queries against a Prometheus-compatible store
//! - [`weather`] - Synthetic forecasts used by the demo endpoint
//!
//! # Example
//!
//! ```
//! use shared::instrumentation::{Instrumentation, InstrumentationSettings};
//! use shared::models::SpanKind;
//!
//! let instrumentation = Instrumentation::disabled(InstrumentationSettings::default()).unwrap();
//! let mut span = instrumentation.start_span("TestOperation", SpanKind::Internal, None);
//! span.set_tag("test.tag", "test value");
//! drop(span);
//!
//! instrumentation.increment_counter(1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod diagnostics;
pub mod instrumentation;
pub mod metrics_proxy;
pub mod models;
pub mod weather;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use opentelemetry;
pub use serde;
pub use serde_json;
pub use validator;
