//! Server-side per-connection session
//!
//! One task per accepted connection: run the registration handshake,
//! announce the join, forward chat text, and clean up on the way out.
//! Lifecycle: Connecting -> Handshaking -> Joined -> Serving -> Leaving
//! -> Closed. The session that registered a name is the only one that
//! unregisters it, and it does so exactly once.

use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::codec::{MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::connection::Connection;
use crate::error::ChatError;
use crate::message::Message;
use crate::registry::Registry;

/// Drive one accepted connection from handshake to cleanup.
///
/// Never returns an error to the caller: every terminal condition is
/// logged here and ends only this session, leaving other sessions
/// untouched.
pub async fn run_session(registry: Arc<Registry>, stream: TcpStream) {
    let connection = match Connection::new(stream) {
        Ok(connection) => Arc::new(connection),
        Err(err) => {
            warn!(%err, "failed to set up connection");
            return;
        }
    };
    let peer = connection.peer_addr();
    info!(%peer, "connection established");

    let mut registered_name = None;
    if let Err(err) = serve(&registry, &connection, &mut registered_name).await {
        warn!(%peer, %err, "session ended with error");
    }

    // Leaving: the owning session unregisters and announces, exactly once.
    if let Some(name) = registered_name {
        registry.unregister(&name);
        info!(%peer, %name, "member removed");
        registry.broadcast(&Message::UserRemoved(name), None).await;
    }

    if let Err(err) = connection.close().await {
        warn!(%peer, %err, "error while closing connection");
    }
    info!(%peer, "connection closed");
}

/// Handshake, join announcements, then the serving loop.
///
/// `registered_name` is set as soon as the registry insert succeeds, so
/// the caller's cleanup runs even when a later step fails.
async fn serve(
    registry: &Registry,
    connection: &Arc<Connection>,
    registered_name: &mut Option<String>,
) -> Result<(), ChatError> {
    let name = handshake(registry, connection, registered_name).await?;
    info!(peer = %connection.peer_addr(), %name, "member added");

    registry
        .broadcast(&Message::UserAdded(name.clone()), Some(name.as_str()))
        .await;
    registry
        .notify_of_existing_members(connection, &name)
        .await?;

    serving_loop(registry, connection, &name).await
}

/// The registration handshake, server side.
///
/// Re-prompts the same client on an empty, overlong, or already-taken
/// name; any
/// message other than USER_NAME is a terminal protocol violation. The
/// uniqueness check and the insert are one atomic step in the registry.
async fn handshake(
    registry: &Registry,
    connection: &Arc<Connection>,
    registered_name: &mut Option<String>,
) -> Result<String, ChatError> {
    let peer = connection.peer_addr();
    loop {
        connection.send(&Message::NameRequest).await?;
        info!(%peer, "name requested");

        let message = connection.receive().await?;
        let Message::UserName(name) = message else {
            return Err(ChatError::Protocol {
                state: "awaiting user name",
                kind: message.kind(),
            });
        };

        if name.is_empty() {
            warn!(%peer, "empty name proposed, re-prompting");
            continue;
        }
        if name.len() > MAX_NAME_LEN {
            warn!(%peer, len = name.len(), "name too long, re-prompting");
            continue;
        }
        if !registry.try_register(&name, Arc::clone(connection)) {
            warn!(%peer, %name, "name already taken, re-prompting");
            continue;
        }

        // Registered before NAME_ACCEPTED goes out, so cleanup covers a
        // failed send.
        *registered_name = Some(name.clone());
        connection.send(&Message::NameAccepted).await?;
        info!(%peer, %name, "name accepted");
        return Ok(name);
    }
}

/// Steady state: receive TEXT, rebroadcast it to everyone (sender
/// included) prefixed with the sender's name. Any other kind means the
/// stream is desynchronized and the session ends.
async fn serving_loop(
    registry: &Registry,
    connection: &Arc<Connection>,
    name: &str,
) -> Result<(), ChatError> {
    loop {
        let message = connection.receive().await?;
        match message {
            Message::Text(text) => {
                // With the name bounded at the handshake, this keeps the
                // prefixed rebroadcast within the frame limit.
                if text.len() > MAX_TEXT_LEN {
                    warn!(name, len = text.len(), "text too long, dropped");
                    continue;
                }
                info!(name, %text, "incoming message");
                registry
                    .broadcast(&Message::Text(format!("{name}: {text}")), None)
                    .await;
            }
            other => {
                return Err(ChatError::Protocol {
                    state: "serving",
                    kind: other.kind(),
                });
            }
        }
    }
}
