//! MCP client: session setup and tool invocation.

use crate::error::{Result, ToolchatError};
use crate::mcp::transport::HttpTransport;
use crate::mcp::types::{ToolCallResult, ToolInfo};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "toolchat";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client for a single MCP tool server
pub struct McpClient {
    transport: HttpTransport,
}

impl McpClient {
    /// Create a client for the given MCP endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(endpoint)?,
        })
    }

    /// Create a client over an existing transport
    pub fn with_transport(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Perform the MCP handshake and send the initialized notification
    pub async fn initialize(&self) -> Result<()> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": CLIENT_VERSION
            }
        });

        let result = self.transport.send_request("initialize", params).await?;

        let server_name = result["serverInfo"]["name"].as_str().unwrap_or("unknown");
        info!(server = server_name, "Connected to MCP server");

        self.transport.send_notification("notifications/initialized").await?;

        Ok(())
    }

    /// Check that the server is reachable
    pub async fn ping(&self) -> Result<()> {
        self.transport.send_request("ping", Value::Null).await?;
        debug!("MCP server is reachable");
        Ok(())
    }

    /// List the tools the server hosts, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };

            let result = self.transport.send_request("tools/list", params).await?;

            let page = result
                .get("tools")
                .and_then(|t| t.as_array())
                .ok_or_else(|| {
                    ToolchatError::McpError("tools/list result missing tools array".to_string())
                })?;

            for tool in page {
                tools.push(serde_json::from_value(tool.clone())?);
            }

            match result.get("nextCursor").and_then(|c| c.as_str()) {
                Some(next) if !next.is_empty() => cursor = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(tools)
    }

    /// Invoke a named tool with structured arguments
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<ToolCallResult> {
        info!(tool = name, "Calling MCP tool");

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let result = self.transport.send_request("tools/call", params).await?;
        let call_result: ToolCallResult = serde_json::from_value(result)?;

        debug!(tool = name, blocks = call_result.content.len(), "Tool call returned");
        Ok(call_result)
    }
}
