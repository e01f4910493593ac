//! Error types for the chat protocol
//!
//! Defines the protocol error taxonomy and the settings loading errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::message::MessageKind;

/// Protocol-level errors.
///
/// Every variant is terminal for the connection it occurred on: the caller
/// must leave its receive/send loop and close the connection. Errors are
/// never propagated across sessions.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure (broken pipe, reset, closed socket, EOF).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame that could not be decoded into a known message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A well-formed message of an unexpected kind for the current state.
    #[error("protocol violation: unexpected {kind} message while {state}")]
    Protocol {
        state: &'static str,
        kind: MessageKind,
    },
}

/// Errors raised while loading the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON or is missing required fields.
    #[error("failed to parse settings file: {0}")]
    Json(#[from] serde_json::Error),
}
