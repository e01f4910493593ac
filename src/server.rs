//! Chat server: listener and accept loop
//!
//! Binds a TCP listener and spawns one session task per accepted
//! connection. The registry is the only state the sessions share.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::error::ChatError;
use crate::registry::Registry;
use crate::session;

/// The listening chat server.
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl ChatServer {
    /// Bind the listener. Pass port 0 to let the OS pick one.
    pub async fn bind(addr: &str) -> Result<Self, ChatError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
        })
    }

    /// The bound address, useful when the port was OS-assigned.
    pub fn local_addr(&self) -> Result<SocketAddr, ChatError> {
        Ok(self.listener.local_addr()?)
    }

    /// The shared member registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections forever, one spawned session per connection.
    ///
    /// A failed accept is fatal to the whole server; individual session
    /// failures are contained within their own tasks.
    pub async fn run(self) -> Result<(), ChatError> {
        info!(addr = %self.local_addr()?, "chat server listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!(%peer, "accepted connection");
            tokio::spawn(session::run_session(Arc::clone(&self.registry), stream));
        }
    }
}
