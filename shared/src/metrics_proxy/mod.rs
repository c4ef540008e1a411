//! Read-through proxy to a Prometheus-compatible metrics store.
//!
//! A [`RangeQuery`] is resolved from optional caller input, turned into a
//! `query_range` URL and sent by [`MetricsClient`]. The response body comes
//! back unparsed.

pub mod client;
pub mod error;
pub mod query;

pub use client::{MetricsClient, DEFAULT_TIMEOUT};
pub use error::MetricsFetchError;
pub use query::{RangeQuery, DEFAULT_STEP, QUERY_RANGE_PATH, TIMESTAMP_FORMAT};
