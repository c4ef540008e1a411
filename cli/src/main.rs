//! OTel Demo CLI
//!
//! Command-line client that exercises the demo service's endpoints.
//!
//! # Usage
//!
//! ```bash
//! otel-demo --help
//! otel-demo health
//! otel-demo metric --count 10
//! otel-demo query 'rate(http_requests_total[5m])' --step 30s
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};

/// OTel demo CLI - drives the demo service's endpoints
#[derive(Parser)]
#[command(name = "otel-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API server URL
    #[arg(
        short,
        long,
        env = "OTEL_DEMO_API_URL",
        default_value = "http://localhost:8080"
    )]
    api_url: String,

    /// Log request details to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API server health
    Health,
    /// Fetch the five day forecast
    Weather,
    /// Emit a test span
    Trace,
    /// Increment the test counter
    Metric {
        /// Number of increments
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Emit test logs at info, warn and error
    Log,
    /// Trigger the failing endpoint (answers 500)
    Exception,
    /// Run a range query against the metrics store
    Query {
        /// Query expression
        query: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Query the test counter
    TestCounter {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RangeArgs {
    /// Start of the range (RFC 3339)
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    /// End of the range (RFC 3339)
    #[arg(long)]
    end: Option<DateTime<Utc>>,
    /// Resolution step (e.g. 30s, 1m)
    #[arg(long)]
    step: Option<String>,
}

impl RangeArgs {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end {
            params.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(step) = &self.step {
            params.push(("step", step.clone()));
        }
        params
    }
}

/// A single GET against the service.
#[derive(Debug, PartialEq, Eq)]
struct Call {
    path: &'static str,
    params: Vec<(&'static str, String)>,
}

impl Call {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            params: Vec::new(),
        }
    }
}

impl Commands {
    /// The calls this command makes, in order.
    fn calls(&self) -> Vec<Call> {
        match self {
            Self::Health => vec![Call::new("/health")],
            Self::Weather => vec![Call::new("/weatherforecast")],
            Self::Trace => vec![Call::new("/telemetry/test/trace")],
            Self::Metric { count } => (0..*count)
                .map(|_| Call::new("/telemetry/test/metric"))
                .collect(),
            Self::Log => vec![Call::new("/telemetry/test/log")],
            Self::Exception => vec![Call::new("/telemetry/test/exception")],
            Self::Query { query, range } => {
                let mut params = vec![("query", query.clone())];
                params.extend(range.params());
                vec![Call {
                    path: "/metrics/query",
                    params,
                }]
            }
            Self::TestCounter { range } => vec![Call {
                path: "/metrics/test-counter",
                params: range.params(),
            }],
        }
    }
}

async fn execute(client: &reqwest::Client, api_url: &str, call: &Call) -> Result<()> {
    let url = format!("{}{}", api_url.trim_end_matches('/'), call.path);
    tracing::debug!(%url, params = ?call.params, "Sending request");

    let response = client
        .get(&url)
        .query(&call.params)
        .send()
        .await
        .with_context(|| format!("Request to {url} failed"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read response from {url}"))?;

    println!("{} {status}", call.path);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let Some(command) = cli.command else {
        println!("OTel demo CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let client = reqwest::Client::new();
    for call in command.calls() {
        execute(&client, &cli.api_url, &call).await?;
    }

    Ok(())
}
