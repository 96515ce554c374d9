//! Tool-call orchestration and response reconciliation.
//!
//! One turn is a single linear sequence: fold the history into a prompt, ask
//! the model whether a tool is needed, dispatch at most one tool over MCP,
//! normalize whatever came back into transcript entries, append a synthetic
//! tool-response message, and stream the model's final answer. Every yielded
//! [`ChatUpdate`] carries the complete transcript for the turn so a caller
//! can re-render in place.

use crate::catalog::{self, ToolDescriptor, SYSTEM_PROMPT};
use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::models::{ChatMessage, MessageRole, ToolCall};
use crate::mcp::client::McpClient;
use crate::mcp::types::ToolCallResult;
use crate::transcript::{self, TranscriptEntry};
use async_trait::async_trait;
use base64::Engine;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

/// Seam over remote tool dispatch, so the orchestrator can be driven
/// without a live MCP server
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<ToolCallResult>;
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn invoke(
        &self,
        name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<ToolCallResult> {
        self.call_tool(name, arguments).await
    }
}

/// Incremental state of a chat turn
#[derive(Debug, Clone)]
pub struct ChatUpdate {
    /// Full transcript for the turn so far
    pub entries: Vec<TranscriptEntry>,
    /// Decoded image payload, when a tool produced one
    pub image: Option<Vec<u8>>,
}

/// Drives one chat turn across the gateway and the tool server
pub struct Orchestrator {
    gateway: Arc<dyn LlmGateway>,
    invoker: Arc<dyn ToolInvoker>,
    model: String,
    tools: Vec<ToolDescriptor>,
    config: CompletionConfig,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        invoker: Arc<dyn ToolInvoker>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            invoker,
            model: model.into(),
            tools: catalog::tool_definitions(),
            config: CompletionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Process one user message, yielding transcript updates as they form
    ///
    /// `history` holds the prior turns; `image_path` is an uploaded image the
    /// user attached, forwarded with the user message.
    pub fn process_message<'a>(
        &'a self,
        message: &str,
        history: &[ChatMessage],
        image_path: Option<&str>,
    ) -> Pin<Box<dyn Stream<Item = Result<ChatUpdate>> + Send + 'a>> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(
            history
                .iter()
                .filter(|m| {
                    matches!(
                        m.role,
                        MessageRole::System | MessageRole::User | MessageRole::Assistant
                    )
                })
                .cloned(),
        );

        let mut user_message = ChatMessage::user(message);
        if let Some(path) = image_path {
            user_message = user_message.with_images(vec![path.to_string()]);
        }
        messages.push(user_message);

        Box::pin(async_stream::stream! {
            // First call: let the model pick a tool, or none
            let response = match self
                .gateway
                .complete(&self.model, &messages, Some(&self.tools), &self.config)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut entries: Vec<TranscriptEntry> = Vec::new();
            let mut image: Option<Vec<u8>> = None;

            if let Some(tool_call) = response.tool_calls.first() {
                if response.tool_calls.len() > 1 {
                    warn!(
                        extra = response.tool_calls.len() - 1,
                        "Multiple tool calls requested; dispatching the first only"
                    );
                }

                let tool_name = tool_call.name.clone();
                info!(tool = %tool_name, "Tool call requested");

                let params_compact =
                    serde_json::to_string(&tool_call.arguments).unwrap_or_default();
                let params_pretty =
                    serde_json::to_string_pretty(&tool_call.arguments).unwrap_or_default();

                entries.push(TranscriptEntry::tool_call_pending(&tool_name, &params_compact));
                entries.push(TranscriptEntry::tool_parameters(&tool_name, &params_pretty));
                yield Ok(ChatUpdate { entries: entries.clone(), image: None });

                // Dispatch exactly one tool and normalize the result
                let outcome = self.dispatch(&tool_name, &tool_call.arguments).await;
                transcript::mark_call_done(&mut entries, &tool_name);
                entries.push(TranscriptEntry::tool_result_header(&tool_name));

                let tool_response_content = match &outcome {
                    Ok(result) => {
                        self.reconcile(&tool_name, tool_call, result, &mut entries, &mut image)
                    }
                    Err(e) => {
                        warn!(tool = %tool_name, error = %e, "Tool dispatch failed");
                        entries.push(TranscriptEntry::dispatch_failure(&tool_name));
                        failure_response(&tool_name)
                    }
                };

                yield Ok(ChatUpdate { entries: entries.clone(), image: image.clone() });

                // Fold the call and its synthetic response back into history
                messages.push(ChatMessage::assistant_tool_calls(vec![tool_call.clone()]));
                messages.push(ChatMessage::tool_response(
                    tool_call.id.clone().unwrap_or_else(|| tool_name.clone()),
                    tool_response_content,
                ));
            }

            // Final call: stream the natural-language answer
            let mut partial_content = String::new();
            let mut final_stream =
                self.gateway.complete_stream(&self.model, &messages, None, &self.config);

            while let Some(chunk_result) = final_stream.next().await {
                match chunk_result {
                    Ok(StreamChunk::Content(content)) => {
                        partial_content.push_str(&content);

                        let mut update_entries = entries.clone();
                        update_entries.push(TranscriptEntry::assistant(partial_content.clone()));
                        yield Ok(ChatUpdate { entries: update_entries, image: image.clone() });
                    }
                    Ok(StreamChunk::ToolCalls(_)) => {
                        // Tools are not offered on the final call
                        warn!("Ignoring tool calls in final response stream");
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Dispatch a tool by name, refusing names outside the catalog
    async fn dispatch(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<ToolCallResult> {
        if !self.tools.iter().any(|t| t.function.name == tool_name) {
            warn!(tool = tool_name, "Tool not found in catalog");
            return Err(crate::error::ToolchatError::ToolError(format!(
                "Unknown tool: {tool_name}"
            )));
        }

        self.invoker.invoke(tool_name, arguments).await
    }

    /// Fold a tool result into transcript entries and produce the synthetic
    /// tool-response text for the follow-up model call
    fn reconcile(
        &self,
        tool_name: &str,
        tool_call: &ToolCall,
        result: &ToolCallResult,
        entries: &mut Vec<TranscriptEntry>,
        image: &mut Option<Vec<u8>>,
    ) -> String {
        if result.is_error() {
            let text = result.first_text().unwrap_or("Fail to get the server response");
            entries.push(TranscriptEntry::raw_output(tool_name, text));
            return text.to_string();
        }

        // Image payloads: decode and surface the bytes alongside the transcript
        if let Some((data, _mime)) = result.first_image() {
            match base64::engine::general_purpose::STANDARD.decode(data) {
                Ok(bytes) => {
                    entries.push(TranscriptEntry::generated_image(tool_name));
                    *image = Some(bytes);
                }
                Err(e) => {
                    warn!(error = %e, "Invalid base64 in image payload");
                    entries.push(TranscriptEntry::raw_output(
                        tool_name,
                        "Failed to get the generated image.",
                    ));
                    return "Image generated Failed.".to_string();
                }
            }

            // The model only needs to know the generation succeeded
            let prompt = tool_call.arguments.get("prompt").and_then(|p| p.as_str()).unwrap_or("");
            return format!("Image generated successfully with prompt {prompt}");
        }

        let text = result.first_text().unwrap_or("");

        // Structured results carry their payload under a "message" field
        let message = serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or_else(|| text.to_string());

        entries.push(TranscriptEntry::raw_output(tool_name, &message));
        message
    }
}

/// Synthetic tool response when dispatch failed outright
fn failure_response(tool_name: &str) -> String {
    if tool_name == "generate_image" {
        "Image generated Failed.".to_string()
    } else {
        "Fail to get the server response".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::GatewayResponse;
    use crate::mcp::types::ToolContent;
    use crate::transcript::EntryStatus;
    use futures::stream;
    use serde_json::json;
    use std::sync::Mutex;

    // Gateway that replays scripted responses and records what it was sent
    struct MockGateway {
        complete_response: GatewayResponse,
        stream_chunks: Vec<StreamChunk>,
        seen_messages: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl MockGateway {
        fn new(complete_response: GatewayResponse, stream_chunks: Vec<StreamChunk>) -> Self {
            Self {
                complete_response,
                stream_chunks,
                seen_messages: Mutex::new(Vec::new()),
            }
        }

        fn conversational(chunks: &[&str]) -> Self {
            Self::new(
                GatewayResponse {
                    content: Some("classify".to_string()),
                    tool_calls: vec![],
                },
                chunks.iter().map(|c| StreamChunk::Content(c.to_string())).collect(),
            )
        }

        fn tool_then(tool_call: ToolCall, chunks: &[&str]) -> Self {
            Self::new(
                GatewayResponse {
                    content: None,
                    tool_calls: vec![tool_call],
                },
                chunks.iter().map(|c| StreamChunk::Content(c.to_string())).collect(),
            )
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[ToolDescriptor]>,
            _config: &CompletionConfig,
        ) -> Result<GatewayResponse> {
            self.seen_messages.lock().unwrap().push(messages.to_vec());
            Ok(self.complete_response.clone())
        }

        fn complete_stream<'a>(
            &'a self,
            _model: &'a str,
            messages: &'a [ChatMessage],
            _tools: Option<&'a [ToolDescriptor]>,
            _config: &'a CompletionConfig,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>> {
            self.seen_messages.lock().unwrap().push(messages.to_vec());
            Box::pin(stream::iter(
                self.stream_chunks.clone().into_iter().map(Ok).collect::<Vec<_>>(),
            ))
        }
    }

    struct MockInvoker {
        result: Result<ToolCallResult>,
        calls: Mutex<Vec<(String, HashMap<String, Value>)>>,
    }

    impl MockInvoker {
        fn text(text: &str) -> Self {
            Self {
                result: Ok(ToolCallResult {
                    content: vec![ToolContent::Text {
                        text: text.to_string(),
                    }],
                    is_error: None,
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn image(data: &str) -> Self {
            Self {
                result: Ok(ToolCallResult {
                    content: vec![ToolContent::Image {
                        data: data.to_string(),
                        mime_type: "image/png".to_string(),
                    }],
                    is_error: None,
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(crate::error::ToolchatError::McpError(
                    "connection refused".to_string(),
                )),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolInvoker for MockInvoker {
        async fn invoke(
            &self,
            name: &str,
            arguments: &HashMap<String, Value>,
        ) -> Result<ToolCallResult> {
            self.calls.lock().unwrap().push((name.to_string(), arguments.clone()));
            match &self.result {
                Ok(r) => Ok(r.clone()),
                Err(_) => Err(crate::error::ToolchatError::McpError(
                    "connection refused".to_string(),
                )),
            }
        }
    }

    fn tool_call(name: &str, args: Value) -> ToolCall {
        let arguments: HashMap<String, Value> =
            serde_json::from_value(args).unwrap();
        ToolCall {
            id: Some("call_1".to_string()),
            name: name.to_string(),
            arguments,
        }
    }

    async fn collect_updates(
        orchestrator: &Orchestrator,
        message: &str,
    ) -> Vec<ChatUpdate> {
        let mut stream = orchestrator.process_message(message, &[], None);
        let mut updates = Vec::new();
        while let Some(update) = stream.next().await {
            updates.push(update.unwrap());
        }
        updates
    }

    #[tokio::test]
    async fn test_conversational_turn_streams_growing_content() {
        let gateway = Arc::new(MockGateway::conversational(&["Hello", ", ", "world"]));
        let invoker = Arc::new(MockInvoker::text("unused"));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker.clone(), "test-model");

        let updates = collect_updates(&orchestrator, "Hi there").await;

        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].entries.last().unwrap().content, "Hello");
        assert_eq!(updates[2].entries.last().unwrap().content, "Hello, world");
        assert!(updates[2].image.is_none());
        // No tool was dispatched
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conversational_turn_has_system_prompt() {
        let gateway = Arc::new(MockGateway::conversational(&["ok"]));
        let invoker = Arc::new(MockInvoker::text("unused"));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        collect_updates(&orchestrator, "Hi").await;

        let seen = gateway.seen_messages.lock().unwrap();
        // Classify call then streaming call, both starting with the system prompt
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0].role, MessageRole::System);
        assert!(seen[0][0].content.as_ref().unwrap().contains("chatbot assistant"));
        assert_eq!(seen[0].last().unwrap().content, Some("Hi".to_string()));
    }

    #[tokio::test]
    async fn test_multiply_turn_extracts_message_field() {
        let call = tool_call("get_multiply", json!({"first_number": 2, "second_number": 3}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["The answer is 6."]));
        let invoker = Arc::new(MockInvoker::text(
            r#"{"status": "ok", "message": "the mutiplication is 6"}"#,
        ));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker.clone(), "test-model");

        let updates = collect_updates(&orchestrator, "what is 2 times 3?").await;

        // Pending announcement first
        let first = &updates[0].entries;
        assert_eq!(first[0].metadata.as_ref().unwrap().id, "tool_call_get_multiply");
        assert_eq!(first[0].metadata.as_ref().unwrap().status, Some(EntryStatus::Pending));
        assert_eq!(first[1].metadata.as_ref().unwrap().title, "Tool Parameters");

        // After dispatch: announcement done, header and extracted message
        let second = &updates[1].entries;
        assert_eq!(second[0].metadata.as_ref().unwrap().status, Some(EntryStatus::Done));
        assert_eq!(second[2].content, "Here are the results from the tool:");
        assert_eq!(second[3].content, "```\nthe mutiplication is 6\n```");

        // Final streamed answer appended
        let last = updates.last().unwrap();
        assert_eq!(last.entries.last().unwrap().content, "The answer is 6.");

        // The invoker saw the right arguments
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "get_multiply");
        assert_eq!(calls[0].1["first_number"], json!(2));
    }

    #[tokio::test]
    async fn test_tool_turn_folds_synthetic_tool_response() {
        let call = tool_call("get_alerts", json!({"state": "CA"}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["Stay safe."]));
        let invoker = Arc::new(MockInvoker::text("No active alerts for this state."));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        collect_updates(&orchestrator, "alerts for CA?").await;

        let seen = gateway.seen_messages.lock().unwrap();
        let final_messages = seen.last().unwrap();

        // history gains assistant tool-call + tool response before the final call
        let assistant_call = final_messages
            .iter()
            .find(|m| m.tool_calls.is_some())
            .expect("assistant tool-call message");
        assert_eq!(assistant_call.tool_calls.as_ref().unwrap()[0].name, "get_alerts");

        let tool_msg = final_messages
            .iter()
            .find(|m| m.role == MessageRole::Tool)
            .expect("tool response message");
        assert_eq!(tool_msg.tool_call_id, Some("call_1".to_string()));
        assert_eq!(tool_msg.content, Some("No active alerts for this state.".to_string()));
    }

    #[tokio::test]
    async fn test_generate_image_turn_yields_bytes() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");
        let call = tool_call("generate_image", json!({"prompt": "a red fox", "width": 512}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["Here you go!"]));
        let invoker = Arc::new(MockInvoker::image(&encoded));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        let updates = collect_updates(&orchestrator, "draw a red fox").await;

        let after_dispatch = &updates[1];
        assert_eq!(after_dispatch.image, Some(b"png-bytes".to_vec()));
        let image_entry = after_dispatch
            .entries
            .iter()
            .find(|e| {
                e.metadata.as_ref().is_some_and(|m| m.id == "image_generate_image")
            })
            .expect("generated image entry");
        assert_eq!(image_entry.metadata.as_ref().unwrap().title, "Generated Image");

        // Image persists through the streamed answer
        assert_eq!(updates.last().unwrap().image, Some(b"png-bytes".to_vec()));

        // The model is told generation succeeded, not handed the bytes
        let seen = gateway.seen_messages.lock().unwrap();
        let tool_msg = seen
            .last()
            .unwrap()
            .iter()
            .find(|m| m.role == MessageRole::Tool)
            .unwrap();
        assert_eq!(
            tool_msg.content,
            Some("Image generated successfully with prompt a red fox".to_string())
        );
    }

    #[tokio::test]
    async fn test_generate_image_invalid_base64() {
        let call = tool_call("generate_image", json!({"prompt": "a fox"}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["Sorry."]));
        let invoker = Arc::new(MockInvoker::image("!!! not base64 !!!"));
        let orchestrator = Orchestrator::new(gateway, invoker, "test-model");

        let updates = collect_updates(&orchestrator, "draw a fox").await;

        let after_dispatch = &updates[1];
        assert!(after_dispatch.image.is_none());
        assert!(after_dispatch
            .entries
            .iter()
            .any(|e| e.content.contains("Failed to get the generated image.")));
    }

    #[tokio::test]
    async fn test_dispatch_failure_reported() {
        let call = tool_call("get_forecast", json!({"latitude": "37.7", "longtitude": "-122.4"}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["Could not reach the tool."]));
        let invoker = Arc::new(MockInvoker::failing());
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        let updates = collect_updates(&orchestrator, "forecast please").await;

        let after_dispatch = &updates[1];
        assert!(after_dispatch
            .entries
            .iter()
            .any(|e| e.content == "```\nFail to get the server response\n```"));

        // The synthetic tool response still lands, so the final call can explain
        let seen = gateway.seen_messages.lock().unwrap();
        let tool_msg = seen
            .last()
            .unwrap()
            .iter()
            .find(|m| m.role == MessageRole::Tool)
            .unwrap();
        assert_eq!(tool_msg.content, Some("Fail to get the server response".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_dispatched() {
        let call = tool_call("rm_rf_slash", json!({}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["I can't do that."]));
        let invoker = Arc::new(MockInvoker::text("unused"));
        let orchestrator = Orchestrator::new(gateway, invoker.clone(), "test-model");

        let updates = collect_updates(&orchestrator, "do something weird").await;

        assert!(invoker.calls.lock().unwrap().is_empty());
        assert!(updates[1]
            .entries
            .iter()
            .any(|e| e.content == "```\nFail to get the server response\n```"));
    }

    #[tokio::test]
    async fn test_only_first_tool_call_dispatched() {
        let gateway = Arc::new(MockGateway::new(
            GatewayResponse {
                content: None,
                tool_calls: vec![
                    tool_call("get_multiply", json!({"first_number": 2, "second_number": 3})),
                    tool_call("get_alerts", json!({"state": "CA"})),
                ],
            },
            vec![StreamChunk::Content("done".to_string())],
        ));
        let invoker = Arc::new(MockInvoker::text(r#"{"message": "the mutiplication is 6"}"#));
        let orchestrator = Orchestrator::new(gateway, invoker.clone(), "test-model");

        collect_updates(&orchestrator, "multiply and alerts").await;

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "get_multiply");
    }

    #[tokio::test]
    async fn test_tool_error_result_surfaces_text() {
        let call = tool_call("describe_image", json!({"prompt": "details"}));
        let gateway = Arc::new(MockGateway::tool_then(call, &["Something went wrong."]));
        let invoker = Arc::new(MockInvoker {
            result: Ok(ToolCallResult {
                content: vec![ToolContent::Text {
                    text: "Invalid response format from image generation service".to_string(),
                }],
                is_error: Some(true),
            }),
            calls: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(gateway, invoker, "test-model");

        let updates = collect_updates(&orchestrator, "describe my image").await;

        assert!(updates[1].entries.iter().any(|e| {
            e.content.contains("Invalid response format from image generation service")
        }));
    }

    #[tokio::test]
    async fn test_image_path_attached_to_user_message() {
        let gateway = Arc::new(MockGateway::conversational(&["ok"]));
        let invoker = Arc::new(MockInvoker::text("unused"));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        let mut stream = orchestrator.process_message("describe this", &[], Some("/tmp/input.jpg"));
        while let Some(update) = stream.next().await {
            update.unwrap();
        }

        let seen = gateway.seen_messages.lock().unwrap();
        let user_msg = seen[0].last().unwrap();
        assert_eq!(user_msg.image_paths, Some(vec!["/tmp/input.jpg".to_string()]));
    }

    #[tokio::test]
    async fn test_history_is_folded_in() {
        let gateway = Arc::new(MockGateway::conversational(&["ok"]));
        let invoker = Arc::new(MockInvoker::text("unused"));
        let orchestrator = Orchestrator::new(gateway.clone(), invoker, "test-model");

        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];

        let mut stream = orchestrator.process_message("follow-up", &history, None);
        while let Some(update) = stream.next().await {
            update.unwrap();
        }

        let seen = gateway.seen_messages.lock().unwrap();
        let classify = &seen[0];
        assert_eq!(classify.len(), 4); // system + 2 history + user
        assert_eq!(classify[1].content, Some("earlier question".to_string()));
        assert_eq!(classify[2].content, Some("earlier answer".to_string()));
    }

    #[test]
    fn test_failure_response_per_tool() {
        assert_eq!(failure_response("generate_image"), "Image generated Failed.");
        assert_eq!(failure_response("get_alerts"), "Fail to get the server response");
    }
}
