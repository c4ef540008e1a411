//! Weather forecast endpoint.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use shared::models::WeatherForecast;
use shared::weather::FORECAST_DAYS;

/// Creates the weather forecast routes.
pub fn weather_routes(state: AppState) -> Router {
    Router::new()
        .route("/weatherforecast", get(get_forecast))
        .with_state(state)
}

/// Returns a five day forecast.
async fn get_forecast(State(state): State<AppState>) -> Json<Vec<WeatherForecast>> {
    tracing::info!("Generating weather forecast");
    Json(
        state
            .weather()
            .forecast(state.instrumentation(), FORECAST_DAYS),
    )
}
