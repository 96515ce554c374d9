//! HTTP transport for MCP communication.
//!
//! JSON-RPC 2.0 over a single HTTP endpoint. The tool server may answer a
//! request either with a plain JSON body or with a single-event SSE body
//! (streamable HTTP servers do the latter), so both are handled here.

use crate::error::{Result, ToolchatError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP-based MCP transport
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    headers: HashMap<String, String>,
    request_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for the given MCP endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_options(endpoint, None, None)
    }

    /// Create a transport with custom timeout and headers
    pub fn with_options(
        endpoint: impl Into<String>,
        timeout_secs: Option<u64>,
        headers: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: headers.unwrap_or_default(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Send a JSON-RPC request and return the `result` member
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        // The server rejects null params; send an empty object instead
        let params = if params.is_null() {
            serde_json::json!({})
        } else {
            params
        };

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        debug!(method = method, id = id, "Sending MCP request");

        let mut request_builder = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .header("Accept", "application/json, text/event-stream");

        for (key, value) in &self.headers {
            request_builder = request_builder.header(key, value);
        }

        let response = request_builder.send().await?;

        if !response.status().is_success() {
            return Err(ToolchatError::McpError(format!(
                "MCP server returned HTTP {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let response_body: Value = if content_type.contains("text/event-stream") {
            let response_text = response.text().await?;
            parse_sse_response(&response_text)?
        } else {
            response.json().await?
        };

        if let Some(error) = response_body.get("error") {
            return Err(ToolchatError::McpError(format!("MCP server error: {}", error)));
        }

        response_body
            .get("result")
            .cloned()
            .ok_or_else(|| ToolchatError::McpError("No result in MCP response".to_string()))
    }

    /// Send a JSON-RPC notification (no id, no response expected)
    pub async fn send_notification(&self, method: &str) -> Result<()> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });

        let mut request_builder = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .header("Accept", "application/json, text/event-stream");

        for (key, value) in &self.headers {
            request_builder = request_builder.header(key, value);
        }

        request_builder.send().await?;
        Ok(())
    }
}

/// Extract the JSON-RPC message from an SSE response body
///
/// Format: `data: <json>\n\n`, optionally preceded by `event:` lines.
fn parse_sse_response(sse_text: &str) -> Result<Value> {
    let mut json_data = None;

    for line in sse_text.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        if let Some((field, value)) = line.split_once(':') {
            if field.trim() == "data" {
                if let Ok(parsed) = serde_json::from_str::<Value>(value.trim()) {
                    json_data = Some(parsed);
                    break;
                }
            }
        }
    }

    json_data
        .ok_or_else(|| ToolchatError::McpError("No valid JSON data in SSE response".to_string()))
}
