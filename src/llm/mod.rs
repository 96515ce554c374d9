pub mod gateway;
pub mod gateways;
pub mod models;

pub use gateway::{CompletionConfig, LlmGateway, StreamChunk};
pub use models::{ChatMessage, GatewayResponse, MessageRole, ToolCall};
