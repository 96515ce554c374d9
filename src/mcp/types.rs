use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A tool advertised by the MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

/// One content block of a tool-call result
///
/// Results are heterogeneous: plain text (weather, multiply), JSON carried as
/// text (image description), or binary image payloads (image generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded payload
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    /// The first text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|c| match c {
            ToolContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// The first image block as (base64 data, mime type), if any
    pub fn first_image(&self) -> Option<(&str, &str)> {
        self.content.iter().find_map(|c| match c {
            ToolContent::Image { data, mime_type } => {
                Some((data.as_str(), mime_type.as_str()))
            }
            _ => None,
        })
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

impl Display for ToolCallResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let res = self
            .content
            .iter()
            .map(|content| match content {
                ToolContent::Text { text } => text.clone(),
                ToolContent::Image { mime_type, .. } => format!("[Image: {mime_type}]"),
            })
            .collect::<Vec<_>>()
            .join("\n");

        write!(f, "{res}")
    }
}
