//! Error types and result aliases for the toolchat library.
//!
//! This module defines the core error type [`ToolchatError`] and the [`Result`] type
//! alias used throughout the library. All public APIs that can fail return `Result<T>`
//! for consistent error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolchatError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("MCP error: {0}")]
    McpError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToolchatError>;
