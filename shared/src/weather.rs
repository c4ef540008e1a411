//! Synthetic weather forecasts.

use crate::instrumentation::Instrumentation;
use crate::models::{SpanKind, WeatherForecast};
use chrono::{Days, NaiveDate, Utc};

/// Summaries a forecast is picked from.
pub const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

/// Number of days returned by the forecast endpoint.
pub const FORECAST_DAYS: u32 = 5;

/// Lowest generated temperature (inclusive), in °C.
pub const MIN_TEMPERATURE_C: i32 = -20;

/// Highest generated temperature (exclusive), in °C.
pub const MAX_TEMPERATURE_C: i32 = 55;

/// Generates random forecasts inside a traced span.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherService;

impl WeatherService {
    /// Forecast for the `days` days following today.
    pub fn forecast(&self, instrumentation: &Instrumentation, days: u32) -> Vec<WeatherForecast> {
        self.forecast_from(instrumentation, Utc::now().date_naive(), days)
    }

    /// Forecast for the `days` days following `today`.
    pub fn forecast_from(
        &self,
        instrumentation: &Instrumentation,
        today: NaiveDate,
        days: u32,
    ) -> Vec<WeatherForecast> {
        let mut span = instrumentation.start_span("GetWeatherForecast", SpanKind::Internal, None);
        span.set_tag("forecast.days", days);

        let forecast: Vec<WeatherForecast> = (1..=days)
            .filter_map(|offset| today.checked_add_days(Days::new(u64::from(offset))))
            .map(|date| {
                let temperature = fastrand::i32(MIN_TEMPERATURE_C..MAX_TEMPERATURE_C);
                let summary = SUMMARIES[fastrand::usize(..SUMMARIES.len())];
                WeatherForecast::new(date, temperature, summary)
            })
            .collect();

        if let Some(min) = forecast.iter().map(|f| f.temperature_c).min() {
            span.set_tag("forecast.temperature.min", min);
        }
        if let Some(max) = forecast.iter().map(|f| f.temperature_c).max() {
            span.set_tag("forecast.temperature.max", max);
        }

        forecast
    }
}
