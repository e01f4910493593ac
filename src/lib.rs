//! Broadcast TCP Chat Library
//!
//! A text chat service over plain TCP: the server registers each
//! connection under a unique user name and broadcasts chat text to all
//! registered members; the client performs the name handshake and then
//! exchanges text lines.
//!
//! # Architecture
//! One spawned task per accepted connection, plus the accept loop. The
//! only shared state is the [`Registry`], a concurrent name-to-connection
//! map with atomic insert-if-absent registration. Each [`Connection`]
//! locks its read and write halves independently, so other sessions'
//! broadcast sends interleave safely with this session's own receive
//! loop.
//!
//! # Example
//! ```ignore
//! use tcp_chat::{ChatServer, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tcp_chat::ChatError> {
//!     let server = ChatServer::bind("127.0.0.1:4444").await?;
//!     tokio::spawn(server.run());
//!
//!     let client = Client::connect("127.0.0.1:4444").await?;
//!     let name = client.handshake(&mut || "alice".to_string()).await?;
//!     client.send_text("hello").await?;
//!     println!("{name}: {:?}", client.next_event().await?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod settings;

// Re-export main types for convenience
pub use client::{ChatEvent, Client, NamePrompt};
pub use connection::Connection;
pub use error::{ChatError, SettingsError};
pub use message::{Message, MessageKind};
pub use registry::Registry;
pub use server::ChatServer;
pub use settings::Settings;
