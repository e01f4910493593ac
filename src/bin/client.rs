//! Broadcast TCP Chat Client - Entry Point
//!
//! Connects, runs the name handshake against the console, then runs two
//! loops: printing incoming notifications and sending typed lines until
//! the user enters `exit`.

use std::env;
use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

use tcp_chat::{ChatEvent, Client, Settings};

/// Default settings file path
const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Ask the console for a name. Called again whenever the server
/// re-prompts (empty or already-taken name).
fn prompt_name() -> String {
    print!("Enter your name: ");
    let _ = std::io::stdout().flush();
    let mut name = String::new();
    if std::io::stdin().read_line(&mut name).is_err() {
        return String::new();
    }
    name.trim().to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep library logging out of the chat display unless asked for.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=warn")),
        )
        .init();

    let settings_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let settings = Settings::load_or_default(&settings_path)?;

    let client = match Client::connect(&settings.addr()).await {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("Could not connect to {}: {err}", settings.addr());
            return Err(err.into());
        }
    };
    println!("Connected to the server.");

    let mut prompt = prompt_name;
    let name = match client.handshake(&mut prompt).await {
        Ok(name) => name,
        Err(err) => {
            eprintln!("An error occurred while joining the chat.");
            let _ = client.close().await;
            return Err(err.into());
        }
    };
    println!("You joined the chat as '{name}'. Type 'exit' to quit.");

    // Incoming notifications, printed as they arrive.
    let events = Arc::clone(&client);
    let mut event_task = tokio::spawn(async move {
        loop {
            match events.next_event().await {
                Ok(ChatEvent::Text(text)) => println!("{text}"),
                Ok(ChatEvent::MemberJoined(name)) => println!("'{name}' joined the chat."),
                Ok(ChatEvent::MemberLeft(name)) => println!("'{name}' left the chat."),
                Err(err) => {
                    error!(%err, "session failed");
                    eprintln!("Connection to the server was lost.");
                    break;
                }
            }
        }
    });

    // Outgoing lines from the console.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut event_task => break,
            line = lines.next_line() => match line? {
                Some(line) if line.eq_ignore_ascii_case("exit") => break,
                Some(line) => {
                    if client.send_text(&line).await.is_err() {
                        eprintln!("Failed to send message");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    let _ = client.close().await;
    Ok(())
}
