//! Errors from the metrics query proxy.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure fetching data from the remote metrics store.
///
/// `Display` shows this layer only; the transport cause is reachable through
/// [`std::error::Error::source`]. Use [`MetricsFetchError::chain`] to log both.
///
/// None of these are retried by the proxy.
#[derive(Debug, Error)]
pub enum MetricsFetchError {
    /// The store did not answer within the configured timeout.
    #[error("Timed out waiting for the metrics store")]
    Timeout {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The store could not be reached at all.
    #[error("Metrics store unreachable")]
    Unreachable {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The store answered with a non-success status.
    #[error("Metrics store returned {status}: {body}")]
    Status {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Response body, as returned.
        body: String,
    },

    /// The store answered 2xx but the body is not valid JSON.
    #[error("Metrics store returned a malformed body")]
    MalformedBody {
        /// JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Any other transport failure (building the client, reading the body).
    #[error("Request to the metrics store failed")]
    Request {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}

impl MetricsFetchError {
    /// Classifies a transport error.
    pub(crate) fn from_transport(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { source }
        } else if source.is_connect() {
            Self::Unreachable { source }
        } else {
            Self::Request { source }
        }
    }

    /// Short machine readable kind, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Unreachable { .. } => "unreachable",
            Self::Status { .. } => "status",
            Self::MalformedBody { .. } => "malformed_body",
            Self::Request { .. } => "request",
        }
    }

    /// The message of this error and of every cause below it, joined by `": "`.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}
