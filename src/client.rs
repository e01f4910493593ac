//! Chat client: connection, handshake, and event surface
//!
//! The client mirrors the server's handshake from the other side, then
//! exposes incoming traffic as typed [`ChatEvent`]s. How names are
//! obtained and how events are displayed is left to the caller; the
//! console binary supplies both.

use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::ChatError;
use crate::message::Message;

/// Supplies proposed user names during the handshake.
///
/// Called once per NAME_REQUEST, so a rejected name leads to another
/// call. Implementations may block (e.g. reading the console).
pub trait NamePrompt {
    fn next_name(&mut self) -> String;
}

impl<F> NamePrompt for F
where
    F: FnMut() -> String,
{
    fn next_name(&mut self) -> String {
        self()
    }
}

/// A notification delivered to a joined client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Chat text, already prefixed with the sender's name by the server.
    Text(String),
    /// A member joined (or a roster entry received just after joining).
    MemberJoined(String),
    /// A member left.
    MemberLeft(String),
}

/// A connected chat client.
pub struct Client {
    connection: Arc<Connection>,
}

impl Client {
    /// Connect to the server at `addr`.
    pub async fn connect(addr: &str) -> Result<Self, ChatError> {
        let stream = TcpStream::connect(addr).await?;
        let connection = Arc::new(Connection::new(stream)?);
        info!(peer = %connection.peer_addr(), "connected to server");
        Ok(Self { connection })
    }

    /// Run the registration handshake; returns the accepted name.
    ///
    /// Answers each NAME_REQUEST with a name from `names` until the
    /// server sends NAME_ACCEPTED. Any other kind is a terminal protocol
    /// violation and the connection must be closed.
    pub async fn handshake(&self, names: &mut dyn NamePrompt) -> Result<String, ChatError> {
        let mut offered = None;
        loop {
            let message = self.connection.receive().await?;
            match message {
                Message::NameRequest => {
                    let name = names.next_name();
                    debug!(%name, "offering name");
                    self.connection.send(&Message::UserName(name.clone())).await?;
                    offered = Some(name);
                }
                Message::NameAccepted => {
                    // NAME_ACCEPTED can only follow an offer we made.
                    let name = offered.ok_or(ChatError::Protocol {
                        state: "awaiting name request",
                        kind: Message::NameAccepted.kind(),
                    })?;
                    info!(%name, "name accepted");
                    return Ok(name);
                }
                other => {
                    return Err(ChatError::Protocol {
                        state: "handshaking",
                        kind: other.kind(),
                    });
                }
            }
        }
    }

    /// Send one line of chat text.
    pub async fn send_text(&self, text: &str) -> Result<(), ChatError> {
        self.connection.send(&Message::Text(text.to_string())).await
    }

    /// Await the next server notification.
    ///
    /// Only TEXT, USER_ADDED and USER_REMOVED are valid after the
    /// handshake; anything else is a terminal protocol violation.
    pub async fn next_event(&self) -> Result<ChatEvent, ChatError> {
        let message = self.connection.receive().await?;
        match message {
            Message::Text(text) => Ok(ChatEvent::Text(text)),
            Message::UserAdded(name) => Ok(ChatEvent::MemberJoined(name)),
            Message::UserRemoved(name) => Ok(ChatEvent::MemberLeft(name)),
            other => Err(ChatError::Protocol {
                state: "receiving events",
                kind: other.kind(),
            }),
        }
    }

    /// Close the underlying connection.
    pub async fn close(&self) -> Result<(), ChatError> {
        self.connection.close().await
    }
}
