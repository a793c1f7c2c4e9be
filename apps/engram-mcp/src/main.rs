//! # Engram MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) bridge to the Engram
//! knowledge-graph store.
//!
//! Reads configuration from environment variables:
//! - `MEMORY_FILE_PATH` — path of the persisted graph document
//!   (default: `memory.json` in the working directory)
//!
//! Communicates with AI clients over MCP stdio and serves the graph
//! store in-process.

mod server;

use engram_core::GraphStore;
use rmcp::{ServiceExt, transport::stdio};
use server::EngramMcp;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging to stderr only — stdout is reserved for MCP stdio transport.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let path = std::env::var("MEMORY_FILE_PATH").unwrap_or_else(|_| "memory.json".into());
    tracing::info!("Engram MCP server starting, document: {}", path);

    let store = Arc::new(GraphStore::open(path)?);
    let mcp = EngramMcp::new(store);

    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
