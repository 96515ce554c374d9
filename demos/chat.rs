//! Interactive chat demo with tool dispatch
//!
//! Connects to an OpenAI-compatible LLM endpoint and a JSON-RPC tool server,
//! then runs a read-eval-print chat loop. Tool activity is printed as it
//! happens and the final answer streams token by token. Generated images are
//! written to `generated.png`.
//!
//! Run with: cargo run --example chat

use futures::stream::StreamExt;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use toolchat::config::AppConfig;
use toolchat::llm::gateways::OpenAiGateway;
use toolchat::llm::models::ChatMessage;
use toolchat::mcp::McpClient;
use toolchat::orchestrator::Orchestrator;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up logging
    let subscriber = FmtSubscriber::builder().with_max_level(Level::WARN).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_dotenv("env.dev");

    let gateway = Arc::new(OpenAiGateway::with_base_url(config.llm_endpoint()));
    let client = Arc::new(McpClient::new(config.mcp_endpoint())?);

    client.initialize().await?;
    let tools = client.list_tools().await?;
    println!("Connected. Available tools:");
    for tool in &tools {
        println!("  - {}", tool.name);
    }
    println!("\nType a message, or 'quit' to exit.\n");

    let orchestrator = Orchestrator::new(gateway, client, config.model.clone());
    let mut history: Vec<ChatMessage> = Vec::new();

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        let mut stream = orchestrator.process_message(message, &history, None);

        let mut seen_entries: HashSet<String> = HashSet::new();
        let mut printed_len = 0;
        let mut final_answer = String::new();
        let mut image: Option<Vec<u8>> = None;

        while let Some(update) = stream.next().await {
            let update = match update {
                Ok(u) => u,
                Err(e) => {
                    eprintln!("\nError: {}", e);
                    break;
                }
            };

            for entry in &update.entries {
                match &entry.metadata {
                    Some(meta) => {
                        // Announce each tool step once
                        if seen_entries.insert(meta.id.clone()) {
                            println!("[{}]", meta.title);
                        }
                    }
                    None => {
                        // The streamed answer, printed as a delta
                        if entry.content.len() > printed_len {
                            print!("{}", &entry.content[printed_len..]);
                            io::stdout().flush()?;
                            printed_len = entry.content.len();
                        }
                        final_answer = entry.content.clone();
                    }
                }
            }

            if update.image.is_some() {
                image = update.image;
            }
        }
        println!("\n");

        if let Some(bytes) = image {
            std::fs::write("generated.png", &bytes)?;
            println!("(image saved to generated.png)\n");
        }

        history.push(ChatMessage::user(message));
        if !final_answer.is_empty() {
            history.push(ChatMessage::assistant(final_answer));
        }
    }

    println!("Goodbye!");
    Ok(())
}
