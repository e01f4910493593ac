//! Binary message framing
//!
//! A frame is a `u32` big-endian body length followed by the body: one tag
//! byte and, for the kinds that carry data, the payload as UTF-8 bytes.
//! Encoding and decoding are pure transforms; all socket I/O lives in
//! [`Connection`](crate::Connection).

use crate::error::ChatError;
use crate::message::Message;

/// Upper bound on a frame body. Anything larger is rejected before the
/// body is read, so a corrupt length header cannot exhaust memory.
pub const MAX_FRAME_LEN: usize = 16 * 1024;

/// Upper bound on a user name, enforced during the handshake.
pub const MAX_NAME_LEN: usize = 256;

/// Upper bound on inbound chat text, enforced by the serving loop.
///
/// Sized so that the rebroadcast frame body — tag byte, a name of up to
/// [`MAX_NAME_LEN`], the `": "` separator, and the text — always fits in
/// [`MAX_FRAME_LEN`]. A message the server accepts is therefore always
/// decodable by every recipient.
pub const MAX_TEXT_LEN: usize = MAX_FRAME_LEN - MAX_NAME_LEN - ": ".len() - 1;

const TAG_NAME_REQUEST: u8 = 0;
const TAG_USER_NAME: u8 = 1;
const TAG_NAME_ACCEPTED: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_USER_ADDED: u8 = 4;
const TAG_USER_REMOVED: u8 = 5;

/// Encode a message into a complete frame, length header included.
///
/// A payload that would push the body past [`MAX_FRAME_LEN`] is refused
/// as [`ChatError::MalformedMessage`], mirroring the decode-side limit;
/// no frame the encoder produces is ever rejected by a peer's decoder,
/// and the length header cast can never truncate.
pub fn encode(message: &Message) -> Result<Vec<u8>, ChatError> {
    let (tag, payload) = match message {
        Message::NameRequest => (TAG_NAME_REQUEST, None),
        Message::UserName(name) => (TAG_USER_NAME, Some(name)),
        Message::NameAccepted => (TAG_NAME_ACCEPTED, None),
        Message::Text(text) => (TAG_TEXT, Some(text)),
        Message::UserAdded(name) => (TAG_USER_ADDED, Some(name)),
        Message::UserRemoved(name) => (TAG_USER_REMOVED, Some(name)),
    };

    let body_len = 1 + payload.map_or(0, |p| p.len());
    if body_len > MAX_FRAME_LEN {
        return Err(ChatError::MalformedMessage(format!(
            "{} body of {body_len} bytes exceeds limit of {MAX_FRAME_LEN}",
            message.kind()
        )));
    }

    let mut frame = Vec::with_capacity(4 + body_len);
    frame.extend_from_slice(&(body_len as u32).to_be_bytes());
    frame.push(tag);
    if let Some(payload) = payload {
        frame.extend_from_slice(payload.as_bytes());
    }
    Ok(frame)
}

/// Decode a frame body (the bytes after the length header) into a message.
///
/// Fails with [`ChatError::MalformedMessage`] on an empty body, an
/// unrecognized tag, invalid UTF-8, or trailing bytes after a payloadless
/// kind.
pub fn decode_frame(body: &[u8]) -> Result<Message, ChatError> {
    let (&tag, payload) = body
        .split_first()
        .ok_or_else(|| ChatError::MalformedMessage("empty frame body".into()))?;

    match tag {
        TAG_NAME_REQUEST => expect_no_payload(payload, Message::NameRequest),
        TAG_USER_NAME => Ok(Message::UserName(decode_payload(payload)?)),
        TAG_NAME_ACCEPTED => expect_no_payload(payload, Message::NameAccepted),
        TAG_TEXT => Ok(Message::Text(decode_payload(payload)?)),
        TAG_USER_ADDED => Ok(Message::UserAdded(decode_payload(payload)?)),
        TAG_USER_REMOVED => Ok(Message::UserRemoved(decode_payload(payload)?)),
        other => Err(ChatError::MalformedMessage(format!(
            "unrecognized message tag {other}"
        ))),
    }
}

fn expect_no_payload(payload: &[u8], message: Message) -> Result<Message, ChatError> {
    if payload.is_empty() {
        Ok(message)
    } else {
        Err(ChatError::MalformedMessage(format!(
            "unexpected payload on {} message",
            message.kind()
        )))
    }
}

fn decode_payload(payload: &[u8]) -> Result<String, ChatError> {
    String::from_utf8(payload.to_vec())
        .map_err(|_| ChatError::MalformedMessage("payload is not valid UTF-8".into()))
}
