pub mod client;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use transport::HttpTransport;
pub use types::{ToolCallResult, ToolContent, ToolInfo};
