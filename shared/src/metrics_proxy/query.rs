//! Range-query parameters and URL construction.

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

/// Path of the Prometheus-compatible range-query API on the metrics store.
pub const QUERY_RANGE_PATH: &str = "/prometheus/api/v1/query_range";

/// Step used when the caller does not give one.
pub const DEFAULT_STEP: &str = "1m";

/// How far back `start` reaches when the caller does not give one.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 1;

/// Timestamp format sent to the store (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A fully resolved range query.
///
/// The query expression is opaque: it is only checked for presence and
/// forwarded verbatim.
///
/// # Example
///
/// ```
/// use shared::metrics_proxy::RangeQuery;
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let query = RangeQuery::resolve("up", None, None, None, now);
///
/// assert_eq!(query.start, Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());
/// assert_eq!(query.end, now);
/// assert_eq!(query.step, "1m");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct RangeQuery {
    /// The query expression (e.g. `rate(http_requests_total[5m])`).
    #[validate(length(min = 1, message = "Query expression cannot be empty"))]
    pub query: String,

    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,

    /// End of the range (inclusive).
    pub end: DateTime<Utc>,

    /// Resolution step, passed through unchanged (e.g. `30s`, `1m`).
    #[validate(length(min = 1, message = "Step cannot be empty"))]
    pub step: String,
}

impl RangeQuery {
    /// Fills in defaults relative to `now`.
    ///
    /// `start` defaults to one hour before `now`, `end` to `now`, and `step`
    /// to [`DEFAULT_STEP`]. An empty `step` counts as absent.
    pub fn resolve(
        query: impl Into<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        step: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            query: query.into(),
            start: start.unwrap_or_else(|| now - Duration::hours(DEFAULT_LOOKBACK_HOURS)),
            end: end.unwrap_or(now),
            step: step
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STEP.to_string()),
        }
    }

    /// Same as [`RangeQuery::resolve`] with the current time.
    pub fn resolve_now(
        query: impl Into<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        step: Option<String>,
    ) -> Self {
        Self::resolve(query, start, end, step, Utc::now())
    }

    /// Builds the request URL against `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}{QUERY_RANGE_PATH}?query={}&start={}&end={}&step={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.query),
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT),
            self.step,
        )
    }
}
