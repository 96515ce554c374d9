//! JSON-RPC tool server.
//!
//! Exposes the tool catalog over MCP-style JSON-RPC 2.0 at `POST /mcp`:
//! `initialize`, `ping`, `tools/list`, and `tools/call`, plus the
//! `notifications/initialized` notification. Responses are plain JSON.

pub mod tools;

use crate::catalog;
use crate::error::Result;
use crate::mcp::client::PROTOCOL_VERSION;
use crate::mcp::types::{ToolCallResult, ToolInfo};
use crate::weather::WeatherClient;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tools::ImageService;
use tracing::{debug, info};

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Shared state behind the RPC handler
pub struct ServerState {
    weather: WeatherClient,
    images: ImageService,
}

impl ServerState {
    /// Backends configured from the environment
    pub fn new() -> Self {
        Self {
            weather: WeatherClient::new(),
            images: ImageService::new(),
        }
    }

    pub fn with_backends(weather: WeatherClient, images: ImageService) -> Self {
        Self { weather, images }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Build the router with permissive CORS, serving `POST /mcp`
pub fn router(state: Arc<ServerState>) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(handle_rpc))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(addr: &str, state: Arc<ServerState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "Tool server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_rpc(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RpcRequest>,
) -> Response {
    debug!(method = %request.method, "RPC request");

    // Notifications carry no id and get no body
    let Some(id) = request.id else {
        return StatusCode::ACCEPTED.into_response();
    };

    let reply = match dispatch(&state, &request.method, request.params.as_ref()).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message },
        }),
    };

    Json(reply).into_response()
}

async fn dispatch(
    state: &ServerState,
    method: &str,
    params: Option<&Value>,
) -> std::result::Result<Value, (i64, String)> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "toolchat-tools",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": advertised_tools() })),
        "tools/call" => {
            let params = params.ok_or_else(|| {
                (INVALID_PARAMS, "Missing params for tools/call".to_string())
            })?;
            let name = params["name"].as_str().ok_or_else(|| {
                (INVALID_PARAMS, "Missing tool name".to_string())
            })?;
            let empty = json!({});
            let arguments = params.get("arguments").unwrap_or(&empty);

            let result = call_tool(state, name, arguments).await?;
            serde_json::to_value(result)
                .map_err(|e| (INVALID_PARAMS, e.to_string()))
        }
        other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
    }
}

/// The catalog reshaped into MCP tool descriptions
fn advertised_tools() -> Vec<ToolInfo> {
    catalog::tool_definitions()
        .into_iter()
        .map(|t| ToolInfo {
            name: t.function.name,
            description: Some(t.function.description),
            input_schema: t.function.parameters,
        })
        .collect()
}

async fn call_tool(
    state: &ServerState,
    name: &str,
    arguments: &Value,
) -> std::result::Result<ToolCallResult, (i64, String)> {
    info!(tool = name, "Tool call");
    match name {
        "get_multiply" => {
            let first = arg_i64(arguments, "first_number")?;
            let second = arg_i64(arguments, "second_number")?;
            Ok(tools::get_multiply(first, second))
        }
        "get_alerts" => {
            let us_state = arg_str(arguments, "state")?;
            Ok(tools::get_alerts(&state.weather, us_state).await)
        }
        "get_forecast" => {
            let latitude = arg_f64(arguments, "latitude")?;
            let longitude = arg_f64(arguments, "longtitude")?;
            Ok(tools::get_forecast(&state.weather, latitude, longitude).await)
        }
        "generate_image" => {
            let prompt = arg_str(arguments, "prompt")?;
            let width = arg_i64_or(arguments, "width", 512)?;
            let height = arg_i64_or(arguments, "height", 512)?;
            Ok(state.images.generate_image(prompt, width, height).await)
        }
        "describe_image" => {
            let prompt = arg_str(arguments, "prompt")?;
            Ok(state.images.describe_image(prompt).await)
        }
        other => Err((INVALID_PARAMS, format!("Unknown tool: {other}"))),
    }
}

fn arg_str<'a>(args: &'a Value, key: &str) -> std::result::Result<&'a str, (i64, String)> {
    args[key]
        .as_str()
        .ok_or_else(|| (INVALID_PARAMS, format!("Missing argument: {key}")))
}

// Models often send numbers as JSON strings or whole-valued floats;
// accept all three
fn arg_i64(args: &Value, key: &str) -> std::result::Result<i64, (i64, String)> {
    let invalid = || (INVALID_PARAMS, format!("Invalid integer argument: {key}"));
    match &args[key] {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(invalid()),
            }
        }
        Value::String(s) => s.trim().parse().map_err(|_| invalid()),
        Value::Null => Err((INVALID_PARAMS, format!("Missing argument: {key}"))),
        _ => Err(invalid()),
    }
}

fn arg_i64_or(args: &Value, key: &str, default: i64) -> std::result::Result<i64, (i64, String)> {
    if args[key].is_null() {
        return Ok(default);
    }
    arg_i64(args, key)
}

fn arg_f64(args: &Value, key: &str) -> std::result::Result<f64, (i64, String)> {
    match &args[key] {
        Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| (INVALID_PARAMS, format!("Invalid number argument: {key}"))),
        _ => Err((INVALID_PARAMS, format!("Missing argument: {key}"))),
    }
}
