//! Gateway for OpenAI-compatible chat-completion endpoints.
//!
//! The deployment target is a local llama.cpp or Ollama server exposing the
//! OpenAI `/v1` surface, so this gateway speaks plain chat completions with
//! function tools and SSE streaming. Nothing here is specific to OpenAI the
//! service beyond the wire format.

use crate::catalog::ToolDescriptor;
use crate::error::{Result, ToolchatError};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::gateways::openai_messages_adapter::{adapt_messages_to_openai, convert_tool_calls};
use crate::llm::models::{ChatMessage, GatewayResponse, ToolCall};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Configuration for connecting to an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: crate::config::DEFAULT_API_KEY.to_string(),
            base_url: std::env::var("OLLAMA_LLM_URL")
                .map(|url| format!("{}/v1", url.trim_end_matches('/')))
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            timeout: None,
        }
    }
}

/// Gateway for an OpenAI-compatible LLM service.
pub struct OpenAiGateway {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGateway {
    /// Create a new gateway with default configuration.
    pub fn new() -> Self {
        Self::with_config(OpenAiConfig::default())
    }

    /// Create a new gateway with custom configuration.
    pub fn with_config(config: OpenAiConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap();

        Self { client, config }
    }

    /// Create gateway with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_config(OpenAiConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    fn request_params(&self, config: &CompletionConfig) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), serde_json::json!(config.temperature));

        if config.max_tokens > 0 {
            params.insert("max_tokens".to_string(), serde_json::json!(config.max_tokens));
        }

        if let Some(top_p) = config.top_p {
            params.insert("top_p".to_string(), serde_json::json!(top_p));
        }

        params
    }
}

impl Default for OpenAiGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDescriptor]>,
        config: &CompletionConfig,
    ) -> Result<GatewayResponse> {
        info!("Delegating to chat-completion endpoint");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let openai_messages = adapt_messages_to_openai(messages)?;

        let mut body = serde_json::json!({
            "model": model,
            "messages": openai_messages,
        });

        for (key, value) in self.request_params(config) {
            body[key] = value;
        }

        if let Some(tools) = tools {
            body["tools"] = serde_json::to_value(tools)?;
            body["tool_choice"] = serde_json::json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolchatError::GatewayError(format!(
                "Chat completion API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;

        let content = response_body["choices"][0]["message"]["content"].as_str().map(String::from);

        let tool_calls =
            if let Some(calls) = response_body["choices"][0]["message"]["tool_calls"].as_array() {
                convert_tool_calls(calls)
            } else {
                vec![]
            };

        Ok(GatewayResponse {
            content,
            tool_calls,
        })
    }

    fn complete_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [ChatMessage],
        tools: Option<&'a [ToolDescriptor]>,
        config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            info!("Starting streaming completion");
            debug!("Model: {}, Message count: {}", model, messages.len());

            let openai_messages = match adapt_messages_to_openai(messages) {
                Ok(msgs) => msgs,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut body = serde_json::json!({
                "model": model,
                "messages": openai_messages,
                "stream": true
            });

            for (key, value) in self.request_params(config) {
                body[key] = value;
            }

            if let Some(tools) = tools {
                if let Ok(tools_value) = serde_json::to_value(tools) {
                    body["tools"] = tools_value;
                    body["tool_choice"] = serde_json::json!("auto");
                }
            }

            let response = match self
                .client
                .post(format!("{}/chat/completions", self.config.base_url))
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(ToolchatError::GatewayError(format!(
                    "Chat completion API error: {}",
                    response.status()
                )));
                return;
            }

            // Process the SSE stream line by line; chunks may split anywhere
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut tool_calls_accumulator: HashMap<usize, ToolCallAccumulator> = HashMap::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        if let Ok(text) = std::str::from_utf8(&bytes) {
                            buffer.push_str(text);

                            while let Some(line_end) = buffer.find('\n') {
                                let line = buffer[..line_end].trim().to_string();
                                buffer = buffer[line_end + 1..].to_string();

                                if line.is_empty() || !line.starts_with("data: ") {
                                    continue;
                                }

                                let data = line.strip_prefix("data: ").unwrap();

                                if data == "[DONE]" {
                                    if !tool_calls_accumulator.is_empty() {
                                        let complete = build_complete_tool_calls(&tool_calls_accumulator);
                                        if !complete.is_empty() {
                                            yield Ok(StreamChunk::ToolCalls(complete));
                                        }
                                        tool_calls_accumulator.clear();
                                    }
                                    continue;
                                }

                                match serde_json::from_str::<Value>(data) {
                                    Ok(json) => {
                                        let Some(choices) = json["choices"].as_array() else {
                                            continue;
                                        };
                                        if choices.is_empty() {
                                            continue;
                                        }

                                        let delta = &choices[0]["delta"];
                                        let finish_reason = choices[0]["finish_reason"].as_str();

                                        if let Some(content) = delta["content"].as_str() {
                                            if !content.is_empty() {
                                                yield Ok(StreamChunk::Content(content.to_string()));
                                            }
                                        }

                                        if let Some(tool_calls) = delta["tool_calls"].as_array() {
                                            accumulate_tool_call_deltas(
                                                &mut tool_calls_accumulator,
                                                tool_calls,
                                            );
                                        }

                                        if finish_reason == Some("tool_calls")
                                            && !tool_calls_accumulator.is_empty()
                                        {
                                            let complete = build_complete_tool_calls(&tool_calls_accumulator);
                                            if !complete.is_empty() {
                                                yield Ok(StreamChunk::ToolCalls(complete));
                                            }
                                            tool_calls_accumulator.clear();
                                        }
                                    }
                                    Err(e) => {
                                        warn!("Failed to parse streaming chunk: {}", e);
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    }
                }
            }
        })
    }
}

/// Accumulator for tool calls streamed as deltas.
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

fn accumulate_tool_call_deltas(
    accumulators: &mut HashMap<usize, ToolCallAccumulator>,
    deltas: &[Value],
) {
    for tc in deltas {
        let Some(index) = tc["index"].as_u64() else {
            continue;
        };

        let acc = accumulators.entry(index as usize).or_insert_with(|| ToolCallAccumulator {
            id: None,
            name: None,
            arguments: String::new(),
        });

        // The first delta carries id and name; every delta may carry an
        // argument fragment
        if let Some(id) = tc["id"].as_str() {
            acc.id = Some(id.to_string());
        }
        if let Some(name) = tc["function"]["name"].as_str() {
            acc.name = Some(name.to_string());
        }
        if let Some(args) = tc["function"]["arguments"].as_str() {
            acc.arguments.push_str(args);
        }
    }
}

/// Build complete tool calls from accumulators, in index order.
fn build_complete_tool_calls(
    accumulators: &HashMap<usize, ToolCallAccumulator>,
) -> Vec<ToolCall> {
    let mut indices: Vec<_> = accumulators.keys().collect();
    indices.sort();

    indices
        .iter()
        .filter_map(|&&index| {
            let acc = accumulators.get(&index)?;
            let name = acc.name.clone()?;

            let arguments: HashMap<String, Value> = match serde_json::from_str(&acc.arguments) {
                Ok(map) => map,
                Err(_) if !acc.arguments.is_empty() => {
                    let mut map = HashMap::new();
                    map.insert(
                        "raw_args".to_string(),
                        Value::String(acc.arguments.clone()),
                    );
                    map
                }
                Err(_) => HashMap::new(),
            };

            Some(ToolCall {
                id: acc.id.clone(),
                name,
                arguments,
            })
        })
        .collect()
}
