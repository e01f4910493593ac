//! Message-framed TCP connection
//!
//! Wraps one socket and sends/receives whole [`Message`] units. The read
//! and write halves sit behind independent locks, so one task can stream
//! outbound broadcasts while another blocks awaiting inbound data. On the
//! server, broadcast sends arrive from *other* sessions' tasks while this
//! connection's own session sits in `receive`.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::codec::{self, MAX_FRAME_LEN};
use crate::error::ChatError;
use crate::message::Message;

/// A bidirectional, message-framed channel over one TCP socket.
///
/// At most one `send` and one `receive` proceed at a time, but a send and
/// a receive may run concurrently with each other. Any failed `send` or
/// `receive` is terminal: the caller must stop using the connection and
/// call [`close`](Connection::close).
#[derive(Debug)]
pub struct Connection {
    peer_addr: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection {
    /// Wrap an established stream, capturing the peer address up front.
    pub fn new(stream: TcpStream) -> Result<Self, ChatError> {
        let peer_addr = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            peer_addr,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    /// Frame and write one whole message, serialized against other senders.
    ///
    /// A message too large to frame is refused before anything is
    /// written, so a failed size check never leaves a torn frame on the
    /// wire.
    pub async fn send(&self, message: &Message) -> Result<(), ChatError> {
        let frame = codec::encode(message)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        Ok(())
    }

    /// Block until one whole message arrives, then decode it.
    ///
    /// EOF surfaces as an `Io` error (`UnexpectedEof` from the partial
    /// header read); a frame that decodes badly is `MalformedMessage`.
    /// Either way the connection is done.
    pub async fn receive(&self) -> Result<Message, ChatError> {
        let mut reader = self.reader.lock().await;

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let body_len = u32::from_be_bytes(len_buf) as usize;
        if body_len > MAX_FRAME_LEN {
            return Err(ChatError::MalformedMessage(format!(
                "frame body of {body_len} bytes exceeds limit of {MAX_FRAME_LEN}"
            )));
        }

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).await?;
        codec::decode_frame(&body)
    }

    /// Shut down the write half, signalling EOF to the peer.
    ///
    /// Reachable from every error path; calling it again after a failed
    /// send or receive is safe, though the OS may report an error for a
    /// socket that is already gone.
    pub async fn close(&self) -> Result<(), ChatError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }

    /// The peer's network address, captured at construction.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn socket_pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (
            Connection::new(client).unwrap(),
            Connection::new(server).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_send_receive_round_trip() {
        let (client, server) = socket_pair().await;

        client.send(&Message::UserName("alice".into())).await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, Message::UserName("alice".into()));

        server.send(&Message::NameAccepted).await.unwrap();
        let received = client.receive().await.unwrap();
        assert_eq!(received, Message::NameAccepted);
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (client, server) = socket_pair().await;

        for i in 0..10 {
            client.send(&Message::Text(format!("msg {i}"))).await.unwrap();
        }
        for i in 0..10 {
            assert_eq!(
                server.receive().await.unwrap(),
                Message::Text(format!("msg {i}"))
            );
        }
    }

    #[tokio::test]
    async fn test_receive_after_peer_close_is_io_error() {
        let (client, server) = socket_pair().await;

        client.close().await.unwrap();
        drop(client);
        assert!(matches!(server.receive().await, Err(ChatError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_malformed() {
        let (client, server) = socket_pair().await;

        // A length header far beyond the frame limit, written raw.
        {
            let mut writer = client.writer.lock().await;
            writer
                .write_all(&(u32::MAX).to_be_bytes())
                .await
                .unwrap();
        }
        assert!(matches!(
            server.receive().await,
            Err(ChatError::MalformedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_double_close_is_safe() {
        let (client, _server) = socket_pair().await;

        client.close().await.unwrap();
        assert!(client.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_reachable_from_error_path() {
        let (client, server) = socket_pair().await;

        client.close().await.unwrap();
        drop(client);
        let _ = server.receive().await;
        // May report an error for a dead socket, but must not corrupt state.
        let _ = server.close().await;
        let _ = server.close().await;
    }
}
