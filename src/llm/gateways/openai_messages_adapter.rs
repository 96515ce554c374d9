//! Adapter for converting chat messages to the OpenAI wire format.

use crate::error::Result;
use crate::llm::models::{ChatMessage, MessageRole, ToolCall};
use base64::Engine;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Determine image type from file extension.
fn get_image_type(file_path: &str) -> &'static str {
    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "jpeg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => "jpeg",
    }
}

/// Read and encode an image file as a base64 data URL.
fn encode_image_as_base64(file_path: &str) -> Result<String> {
    let bytes = std::fs::read(file_path)?;
    let base64_data = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let image_type = get_image_type(file_path);
    Ok(format!("data:image/{};base64,{}", image_type, base64_data))
}

/// Adapt chat messages to OpenAI chat-completion message objects.
pub fn adapt_messages_to_openai(messages: &[ChatMessage]) -> Result<Vec<Value>> {
    let mut result = Vec::new();

    for msg in messages {
        let openai_msg = match msg.role {
            MessageRole::System => {
                serde_json::json!({
                    "role": "system",
                    "content": msg.content.as_deref().unwrap_or("")
                })
            }
            MessageRole::User => adapt_user_message(msg),
            MessageRole::Assistant => {
                let mut assistant_msg = serde_json::json!({
                    "role": "assistant",
                    "content": msg.content.as_deref().unwrap_or("")
                });

                // Tool-call arguments go back over the wire as a JSON string
                if let Some(tool_calls) = &msg.tool_calls {
                    let calls: Result<Vec<Value>> = tool_calls
                        .iter()
                        .map(|tc| {
                            Ok(serde_json::json!({
                                "id": tc.id.as_deref().unwrap_or(""),
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": serde_json::to_string(&tc.arguments)?
                                }
                            }))
                        })
                        .collect();
                    assistant_msg["tool_calls"] = Value::Array(calls?);
                }

                assistant_msg
            }
            MessageRole::Tool => {
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id.as_deref().unwrap_or(""),
                    "content": msg.content.as_deref().unwrap_or("")
                })
            }
        };

        result.push(openai_msg);
    }

    Ok(result)
}

fn adapt_user_message(msg: &ChatMessage) -> Value {
    if let Some(image_paths) = &msg.image_paths {
        if !image_paths.is_empty() {
            let mut content_parts = Vec::new();

            if let Some(text) = &msg.content {
                if !text.is_empty() {
                    content_parts.push(serde_json::json!({
                        "type": "text",
                        "text": text
                    }));
                }
            }

            for path in image_paths {
                match encode_image_as_base64(path) {
                    Ok(data_url) => {
                        content_parts.push(serde_json::json!({
                            "type": "image_url",
                            "image_url": { "url": data_url }
                        }));
                    }
                    Err(e) => {
                        warn!(path = path, error = %e, "Failed to encode image");
                    }
                }
            }

            return serde_json::json!({
                "role": "user",
                "content": content_parts
            });
        }
    }

    serde_json::json!({
        "role": "user",
        "content": msg.content.as_deref().unwrap_or("")
    })
}

/// Convert tool calls from an OpenAI response body.
///
/// Arguments arrive as a JSON-encoded string; if parsing fails the raw text
/// is preserved under a `raw_args` key so nothing is silently dropped.
pub fn convert_tool_calls(calls: &[Value]) -> Vec<ToolCall> {
    calls
        .iter()
        .filter_map(|call| {
            let name = call["function"]["name"].as_str()?.to_string();
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");

            let arguments: HashMap<String, Value> = match serde_json::from_str(raw_args) {
                Ok(map) => map,
                Err(_) => {
                    let mut map = HashMap::new();
                    map.insert("raw_args".to_string(), Value::String(raw_args.to_string()));
                    map
                }
            };

            Some(ToolCall {
                id: call["id"].as_str().map(String::from),
                name,
                arguments,
            })
        })
        .collect()
}
