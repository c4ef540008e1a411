//! Weather forecast model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single day of forecast.
///
/// # Example
///
/// ```
/// use shared::models::WeatherForecast;
/// use chrono::NaiveDate;
///
/// let day = WeatherForecast::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 20, "Mild");
/// assert_eq!(day.temperature_f, 67);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    /// Day the forecast applies to.
    pub date: NaiveDate,
    /// Temperature in degrees Celsius.
    pub temperature_c: i32,
    /// Temperature in degrees Fahrenheit, derived from `temperature_c`.
    pub temperature_f: i32,
    /// Short human readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl WeatherForecast {
    /// Creates a forecast, deriving the Fahrenheit value.
    pub fn new(date: NaiveDate, temperature_c: i32, summary: impl Into<String>) -> Self {
        Self {
            date,
            temperature_c,
            temperature_f: fahrenheit(temperature_c),
            summary: Some(summary.into()),
        }
    }
}

/// Converts Celsius to Fahrenheit using the classic truncating approximation.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fahrenheit(celsius: i32) -> i32 {
    32 + (f64::from(celsius) / 0.5556) as i32
}
