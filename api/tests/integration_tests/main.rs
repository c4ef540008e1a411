//! Integration tests for the OTel demo API.
//!
//! These tests drive the full router, including the metrics proxy against a
//! fake metrics store bound to a local port.

mod common;
mod health_tests;
mod metrics_tests;
mod telemetry_tests;
mod weather_tests;
