pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod orchestrator;
pub mod server;
pub mod transcript;
pub mod weather;

pub use error::{Result, ToolchatError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::catalog::{FunctionDescriptor, ToolDescriptor};
    pub use crate::config::AppConfig;
    pub use crate::error::{Result, ToolchatError};
    pub use crate::llm::gateways::OpenAiGateway;
    pub use crate::llm::{ChatMessage, CompletionConfig, LlmGateway, MessageRole, StreamChunk};
    pub use crate::mcp::{McpClient, ToolCallResult};
    pub use crate::orchestrator::{ChatUpdate, Orchestrator, ToolInvoker};
    pub use crate::transcript::TranscriptEntry;
}
