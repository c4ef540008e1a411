//! Integration tests for the weather forecast endpoint.

use axum::http::StatusCode;
use chrono::{Days, NaiveDate, Utc};

use super::common::{get, test_app};

#[tokio::test]
async fn test_forecast_covers_the_next_five_days() {
    let (app, _state) = test_app();
    let today = Utc::now().date_naive();

    let (status, response) = get(app, "/weatherforecast").await;
    assert_eq!(status, StatusCode::OK);

    let forecast = response.as_array().unwrap();
    assert_eq!(forecast.len(), 5);

    let first: NaiveDate = forecast[0]["date"].as_str().unwrap().parse().unwrap();
    // Tolerate the date rolling over between the two clock reads.
    assert!(
        first == today.checked_add_days(Days::new(1)).unwrap()
            || first == today.checked_add_days(Days::new(2)).unwrap()
    );

    for day in forecast {
        let c = day["temperatureC"].as_i64().unwrap();
        let f = day["temperatureF"].as_i64().unwrap();
        assert!((-20..55).contains(&c));
        let expected_f = 32 + (c as f64 / 0.5556) as i64;
        assert_eq!(f, expected_f);
        assert!(day["summary"].is_string());
    }
}
