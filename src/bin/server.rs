//! Broadcast TCP Chat Server - Entry Point
//!
//! Loads the address settings, binds the listener, and serves forever.

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tcp_chat::{ChatServer, Settings};

/// Default settings file path
const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=info")),
        )
        .init();

    // Settings file path from the command line, or the default
    let settings_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let settings = Settings::load_or_default(&settings_path)?;
    info!(addr = %settings.addr(), "chat server starting");

    let server = ChatServer::bind(&settings.addr()).await?;
    server.run().await?;
    Ok(())
}
