//! API route definitions.
//!
//! This module organizes all HTTP routes for the OTel demo API server.

mod health;
mod metrics;
mod telemetry;
mod weather;

pub use health::health_routes;
pub use metrics::metrics_routes;
pub use telemetry::telemetry_routes;
pub use weather::weather_routes;
