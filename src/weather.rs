//! Weather data adapter for the National Weather Service API.
//!
//! Fetches active alerts and point forecasts from api.weather.gov and formats
//! them into the plain-text shape the tool server returns. The fallback
//! strings are part of the tool contract; downstream prompts reference them.

use crate::error::Result;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const NWS_API_BASE: &str = "https://api.weather.gov";
const USER_AGENT: &str = "weather-app/1.0";
const TIMEOUT_SECS: u64 = 30;

/// Number of forecast periods included in the formatted output
const FORECAST_PERIODS: usize = 5;

/// Client for the National Weather Service API
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new() -> Self {
        Self::with_base_url(NWS_API_BASE)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// GET a NWS endpoint, returning None on any failure
    async fn get_json(&self, url: &str) -> Option<Value> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/geo+json")
            .send()
            .await;

        match response {
            Ok(resp) => {
                debug!(status = %resp.status(), url = url, "NWS response");
                if !resp.status().is_success() {
                    warn!(status = %resp.status(), "NWS request failed");
                    return None;
                }
                resp.json().await.ok()
            }
            Err(e) => {
                warn!(error = %e, "Fail to get response");
                None
            }
        }
    }

    /// Active weather alerts for a two-letter US state code
    pub async fn alerts(&self, state: &str) -> Result<String> {
        let url = format!("{}/alerts/active/area/{}", self.base_url, state);
        let Some(data) = self.get_json(&url).await else {
            return Ok("Unable to fetch alerts or no alerts found.".to_string());
        };

        let Some(features) = data.get("features").and_then(|f| f.as_array()) else {
            return Ok("Unable to fetch alerts or no alerts found.".to_string());
        };

        if features.is_empty() {
            return Ok("No active alerts for this state.".to_string());
        }

        let alerts: Vec<String> = features.iter().map(format_alert).collect();
        Ok(alerts.join("\n---\n"))
    }

    /// Forecast for a location, formatted over the next few periods
    pub async fn forecast(&self, latitude: f64, longitude: f64) -> Result<String> {
        // The points endpoint maps coordinates to a forecast grid URL
        let points_url = format!("{}/points/{},{}", self.base_url, latitude, longitude);
        let Some(points_data) = self.get_json(&points_url).await else {
            return Ok("Unable to fetch forecast data for this location.".to_string());
        };

        let Some(forecast_url) = points_data["properties"]["forecast"].as_str() else {
            return Ok("Unable to fetch forecast data for this location.".to_string());
        };

        let Some(forecast_data) = self.get_json(forecast_url).await else {
            return Ok("Unable to fetch detailed forecast.".to_string());
        };

        let Some(periods) = forecast_data["properties"]["periods"].as_array() else {
            return Ok("Unable to fetch detailed forecast.".to_string());
        };

        let forecasts: Vec<String> =
            periods.iter().take(FORECAST_PERIODS).map(format_period).collect();

        Ok(forecasts.join("\n---\n"))
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an alert feature into a readable string
fn format_alert(feature: &Value) -> String {
    let props = &feature["properties"];
    format!(
        "\nEvent: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}\n",
        props["event"].as_str().unwrap_or("Unknown"),
        props["areaDesc"].as_str().unwrap_or("Unknown"),
        props["severity"].as_str().unwrap_or("Unknown"),
        props["description"].as_str().unwrap_or("No description available"),
        props["instruction"].as_str().unwrap_or("No specific instructions provided"),
    )
}

/// Format one forecast period into a readable string
fn format_period(period: &Value) -> String {
    format!(
        "\n{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}\n",
        period["name"].as_str().unwrap_or(""),
        period["temperature"],
        period["temperatureUnit"].as_str().unwrap_or(""),
        period["windSpeed"].as_str().unwrap_or(""),
        period["windDirection"].as_str().unwrap_or(""),
        period["detailedForecast"].as_str().unwrap_or(""),
    )
}
