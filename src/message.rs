//! Wire message definitions
//!
//! The protocol exchanges a single sum type, `Message`, with six kinds.
//! Each variant carries only the data its kind needs; the payloadless
//! kinds (NAME_REQUEST, NAME_ACCEPTED) carry nothing.

use std::fmt;

/// A single protocol unit, sent whole over a [`Connection`](crate::Connection).
///
/// The set of kinds is closed: both endpoints must agree on exactly these
/// six, and any other tag on the wire is a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Server asks the client to supply a name.
    NameRequest,
    /// Client's proposed user name.
    UserName(String),
    /// Server accepted the proposed name; the handshake is complete.
    NameAccepted,
    /// Chat text. The server rebroadcasts it prefixed with the sender name.
    Text(String),
    /// A member joined, or a roster enumeration entry sent to a new member.
    UserAdded(String),
    /// A member left.
    UserRemoved(String),
}

impl Message {
    /// The kind discriminant, without the payload.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::NameRequest => MessageKind::NameRequest,
            Message::UserName(_) => MessageKind::UserName,
            Message::NameAccepted => MessageKind::NameAccepted,
            Message::Text(_) => MessageKind::Text,
            Message::UserAdded(_) => MessageKind::UserAdded,
            Message::UserRemoved(_) => MessageKind::UserRemoved,
        }
    }
}

/// Discriminant-only view of a [`Message`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NameRequest,
    UserName,
    NameAccepted,
    Text,
    UserAdded,
    UserRemoved,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::NameRequest => "NAME_REQUEST",
            MessageKind::UserName => "USER_NAME",
            MessageKind::NameAccepted => "NAME_ACCEPTED",
            MessageKind::Text => "TEXT",
            MessageKind::UserAdded => "USER_ADDED",
            MessageKind::UserRemoved => "USER_REMOVED",
        };
        f.write_str(name)
    }
}
