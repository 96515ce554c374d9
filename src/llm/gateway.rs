use crate::catalog::ToolDescriptor;
use crate::error::Result;
use crate::llm::models::{ChatMessage, GatewayResponse, ToolCall};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Configuration for LLM completion
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: Option<f32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 16384,
            top_p: None,
        }
    }
}

/// A chunk yielded by a streaming completion
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Incremental assistant text
    Content(String),
    /// Tool calls assembled from the stream
    ToolCalls(Vec<ToolCall>),
}

/// Abstract interface for LLM providers
///
/// Tools are passed as declarative descriptors only; execution happens
/// elsewhere (the orchestrator dispatches them over MCP).
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete an LLM request, letting the model pick a tool from the catalog
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDescriptor]>,
        config: &CompletionConfig,
    ) -> Result<GatewayResponse>;

    /// Complete an LLM request as a stream of chunks
    fn complete_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [ChatMessage],
        tools: Option<&'a [ToolDescriptor]>,
        config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_config_default() {
        let config = CompletionConfig::default();

        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.max_tokens, 16384);
        assert_eq!(config.top_p, None);
    }

    #[test]
    fn test_completion_config_custom() {
        let config = CompletionConfig {
            temperature: 0.5,
            max_tokens: 1024,
            top_p: Some(0.9),
        };

        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.top_p, Some(0.9));
    }

    #[test]
    fn test_completion_config_clone() {
        let config1 = CompletionConfig {
            temperature: 0.7,
            max_tokens: 2048,
            top_p: None,
        };

        let config2 = config1.clone();

        assert_eq!(config1.temperature, config2.temperature);
        assert_eq!(config1.max_tokens, config2.max_tokens);
    }
}
