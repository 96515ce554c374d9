//! Environment-driven configuration.
//!
//! Mirrors the deployment layout: an MCP tool server, an OpenAI-compatible
//! inference endpoint (llama.cpp or Ollama `/v1`), and an image service the
//! tool server proxies to. All three are read from the environment, with an
//! optional dotenv file for development.

use std::path::Path;

/// Default model served by the local llama.cpp endpoint.
pub const DEFAULT_MODEL: &str = "bartowski/Qwen2.5-3B-Instruct-GGUF:Q5_K_S";

/// API key sent to the inference endpoint. Required by the wire format,
/// unused by llama.cpp.
pub const DEFAULT_API_KEY: &str = "llama.cpp";

/// Connection settings for the chat assistant and tool server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the MCP tool server. The client appends `/mcp`.
    pub mcp_server_url: String,
    /// Base URL of the OpenAI-compatible inference service. The gateway
    /// appends `/v1`.
    pub llm_url: String,
    /// Base URL of the image generation/description service.
    pub image_gen_url: String,
    /// Model name passed on every completion request.
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mcp_server_url: std::env::var("MCP_SERVER_URL").unwrap_or_default(),
            llm_url: std::env::var("OLLAMA_LLM_URL").unwrap_or_default(),
            image_gen_url: std::env::var("IMAGE_GEN_URL").unwrap_or_default(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load a dotenv file before reading the environment.
    pub fn from_dotenv(path: impl AsRef<Path>) -> Self {
        let _ = dotenv::from_path(path.as_ref());
        Self::default()
    }

    /// URL of the MCP endpoint the client should talk to.
    pub fn mcp_endpoint(&self) -> String {
        format!("{}/mcp", self.mcp_server_url.trim_end_matches('/'))
    }

    /// Base URL of the OpenAI-compatible API.
    pub fn llm_endpoint(&self) -> String {
        format!("{}/v1", self.llm_url.trim_end_matches('/'))
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
