//! Member registry and broadcast engine
//!
//! The only state shared across session tasks: a concurrent map from user
//! name to connection. Registration is an atomic insert-if-absent, so two
//! clients racing for one name cannot both claim it.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::ChatError;
use crate::message::Message;

/// Shared mapping from user name to connection.
///
/// A name present here denotes an active session that completed the
/// handshake. Entries are inserted only by the handshake and removed
/// exactly once by the owning session's cleanup.
#[derive(Debug, Default)]
pub struct Registry {
    members: DashMap<String, Arc<Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically insert `name` iff it is non-empty and not yet taken.
    ///
    /// Returns whether the insert happened. Linearizable across all
    /// concurrent callers: for any one name, at most one wins.
    pub fn try_register(&self, name: &str, connection: Arc<Connection>) -> bool {
        if name.is_empty() {
            return false;
        }
        match self.members.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(connection);
                true
            }
        }
    }

    /// Remove `name` if present. A no-op otherwise, so error-path cleanup
    /// can call it unconditionally.
    pub fn unregister(&self, name: &str) {
        self.members.remove(name);
    }

    /// Whether `name` currently denotes a registered member.
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Number of registered members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Deliver `message` to every registered member except `exclude`.
    ///
    /// Snapshots the membership first, then sends; a member joining or
    /// leaving mid-pass may or may not be included. A failed send is
    /// logged and skipped: it neither aborts the pass nor unregisters the
    /// recipient, whose own session will detect the dead connection.
    pub async fn broadcast(&self, message: &Message, exclude: Option<&str>) {
        let recipients: Vec<(String, Arc<Connection>)> = self
            .members
            .iter()
            .filter(|entry| exclude != Some(entry.key().as_str()))
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        for (name, connection) in recipients {
            match connection.send(message).await {
                Ok(()) => debug!(member = %name, kind = %message.kind(), "broadcast delivered"),
                Err(err) => warn!(member = %name, %err, "broadcast delivery failed"),
            }
        }
    }

    /// Send one USER_ADDED per already-registered member to `target`, so a
    /// new client learns the current roster. Iteration order is whatever
    /// the map yields. A send failure here is terminal for the joining
    /// session only.
    pub async fn notify_of_existing_members(
        &self,
        target: &Connection,
        excluding: &str,
    ) -> Result<(), ChatError> {
        let roster: Vec<String> = self
            .members
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| name != excluding)
            .collect();

        for name in roster {
            target.send(&Message::UserAdded(name)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn connection_pair() -> (Arc<Connection>, Arc<Connection>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (
            Arc::new(Connection::new(client).unwrap()),
            Arc::new(Connection::new(server).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_empty_names() {
        let registry = Registry::new();
        let (conn_a, _peer_a) = connection_pair().await;
        let (conn_b, _peer_b) = connection_pair().await;

        assert!(registry.try_register("alice", Arc::clone(&conn_a)));
        assert!(!registry.try_register("alice", Arc::clone(&conn_b)));
        assert!(!registry.try_register("", conn_b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_one_winner() {
        let registry = Arc::new(Registry::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let (conn, _peer) = connection_pair().await;
                registry.try_register("alice", conn)
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = Registry::new();
        let (conn, _peer) = connection_pair().await;

        registry.unregister("ghost");
        assert!(registry.try_register("alice", conn));
        registry.unregister("alice");
        registry.unregister("alice");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_named_member() {
        let registry = Registry::new();
        let (alice_server, alice_client) = connection_pair().await;
        let (bob_server, bob_client) = connection_pair().await;
        registry.try_register("alice", alice_server);
        registry.try_register("bob", bob_server);

        let message = Message::UserAdded("bob".into());
        registry.broadcast(&message, Some("bob")).await;

        assert_eq!(alice_client.receive().await.unwrap(), message);
        // Bob was excluded; the next thing on his wire is a later broadcast.
        registry.broadcast(&Message::Text("x".into()), None).await;
        assert_eq!(
            bob_client.receive().await.unwrap(),
            Message::Text("x".into())
        );
    }

    #[tokio::test]
    async fn test_broadcast_survives_dead_recipient() {
        let registry = Registry::new();
        let (alice_server, _alice_client) = connection_pair().await;
        let (bob_server, bob_client) = connection_pair().await;
        registry.try_register("alice", Arc::clone(&alice_server));
        registry.try_register("bob", bob_server);

        // Kill alice's outbound path so sends to her fail.
        alice_server.close().await.unwrap();

        let message = Message::Text("carol: hi".into());
        registry.broadcast(&message, None).await;

        // Bob still gets the message, and alice stays registered until her
        // own session notices the dead connection.
        assert_eq!(bob_client.receive().await.unwrap(), message);
        assert!(registry.contains("alice"));
    }

    #[tokio::test]
    async fn test_roster_notification_skips_the_joiner() {
        let registry = Registry::new();
        let (alice_server, _alice_client) = connection_pair().await;
        let (bob_server, _bob_client) = connection_pair().await;
        let (carol_server, carol_client) = connection_pair().await;
        registry.try_register("alice", alice_server);
        registry.try_register("bob", bob_server);
        registry.try_register("carol", Arc::clone(&carol_server));

        registry
            .notify_of_existing_members(&carol_server, "carol")
            .await
            .unwrap();

        let mut names = Vec::new();
        for _ in 0..2 {
            match carol_client.receive().await.unwrap() {
                Message::UserAdded(name) => names.push(name),
                other => panic!("expected USER_ADDED, got {:?}", other),
            }
        }
        names.sort();
        assert_eq!(names, ["alice", "bob"]);
    }
}
