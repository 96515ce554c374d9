//! Tool implementations backing the JSON-RPC server.
//!
//! Each tool produces a [`ToolCallResult`]. Structured outcomes are carried
//! as JSON text blocks so the caller can extract the `message` field;
//! generated images come back as base64 image blocks.

use crate::mcp::types::{ToolCallResult, ToolContent};
use crate::weather::WeatherClient;
use serde_json::{json, Value};
use std::env;
use tracing::{info, warn};

fn text_result(text: impl Into<String>) -> ToolCallResult {
    ToolCallResult {
        content: vec![ToolContent::Text { text: text.into() }],
        is_error: None,
    }
}

fn json_result(value: &Value) -> ToolCallResult {
    text_result(value.to_string())
}

/// Multiply two integers, reporting the product in a status object
pub fn get_multiply(first_number: i64, second_number: i64) -> ToolCallResult {
    info!(first_number, second_number, "Multiplying");
    // Widened so the product of any two i64 inputs is exact
    let c = first_number as i128 * second_number as i128;
    json_result(&json!({
        "status": "ok",
        "message": format!("the mutiplication is {c}"),
    }))
}

/// Active weather alerts for a US state
pub async fn get_alerts(weather: &WeatherClient, state: &str) -> ToolCallResult {
    match weather.alerts(state).await {
        Ok(report) => text_result(report),
        Err(e) => {
            warn!(state, error = %e, "Alert lookup failed");
            text_result("Unable to fetch alerts or no alerts found.")
        }
    }
}

/// Five-period forecast for a coordinate pair
pub async fn get_forecast(weather: &WeatherClient, latitude: f64, longitude: f64) -> ToolCallResult {
    match weather.forecast(latitude, longitude).await {
        Ok(report) => text_result(report),
        Err(e) => {
            warn!(latitude, longitude, error = %e, "Forecast lookup failed");
            text_result("Unable to fetch forecast data for this location.")
        }
    }
}

/// Client for the image generation/description sidecar service
#[derive(Debug, Clone)]
pub struct ImageService {
    client: reqwest::Client,
    base_url: String,
}

impl ImageService {
    /// Reads the service URL from `IMAGE_GEN_URL`
    pub fn new() -> Self {
        Self::with_base_url(env::var("IMAGE_GEN_URL").unwrap_or_default())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Generate an image, returning it as a base64 image block
    pub async fn generate_image(&self, prompt: &str, width: i64, height: i64) -> ToolCallResult {
        info!(prompt, width, height, "Generating image");
        let request = self
            .client
            .get(format!("{}/image/generate", self.base_url))
            .query(&[
                ("prompt", prompt),
                ("width", &width.to_string()),
                ("height", &height.to_string()),
            ]);

        match self.fetch(request).await {
            Outcome::Success(data) => match data["image_bytes"].as_str() {
                Some(image_bytes) => {
                    info!("Image generated");
                    ToolCallResult {
                        content: vec![ToolContent::Image {
                            data: image_bytes.to_string(),
                            mime_type: "image/png".to_string(),
                        }],
                        is_error: None,
                    }
                }
                None => json_result(&json!({
                    "status": "error",
                    "message": "Invalid response format from image generation service",
                })),
            },
            Outcome::Failure(data) => json_result(&data),
        }
    }

    /// Describe the most recently uploaded image
    pub async fn describe_image(&self, prompt: &str) -> ToolCallResult {
        info!(prompt, "Describing image");
        let request = self
            .client
            .get(format!("{}/image/describe", self.base_url))
            .query(&[("prompt", prompt), ("file_byte", "../input.jpg")]);

        match self.fetch(request).await {
            Outcome::Success(data) | Outcome::Failure(data) => json_result(&data),
        }
    }

    async fn fetch(&self, request: reqwest::RequestBuilder) -> Outcome {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Image service unreachable");
                return Outcome::Failure(json!({
                    "status": "failed",
                    "message": "Failed to generate image",
                }));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Image service returned an error status");
            return Outcome::Failure(json!({
                "status": "failed",
                "message": format!("Image generation service returned HTTP {}", status.as_u16()),
            }));
        }

        match response.json::<Value>().await {
            Ok(data) if data["status"] == "success" => Outcome::Success(data),
            Ok(data) => {
                warn!(%data, "Image service reported failure");
                Outcome::Failure(data)
            }
            Err(e) => {
                warn!(error = %e, "Image service returned invalid JSON");
                Outcome::Failure(json!({
                    "status": "error",
                    "message": "Invalid response format from image generation service",
                }))
            }
        }
    }
}

impl Default for ImageService {
    fn default() -> Self {
        Self::new()
    }
}

enum Outcome {
    Success(Value),
    Failure(Value),
}
