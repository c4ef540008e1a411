//! OTel Demo API Server Binary
//!
//! Entry point for the OpenTelemetry demo API server.

#![deny(unsafe_code)]

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Telemetry, including the tracing subscriber, is set up inside run_server
    api::run_server().await
}
