//! JSON-RPC tool server demo
//!
//! Serves the tool catalog (weather, multiplication, image generation and
//! description) over MCP-style JSON-RPC at `POST /mcp`.
//!
//! Run with: cargo run --example tool_server

use std::sync::Arc;
use toolchat::server::{self, ServerState};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up logging
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenv::from_filename("env.dev").ok();

    let state = Arc::new(ServerState::new());
    server::serve("0.0.0.0:5001", state).await?;

    Ok(())
}
