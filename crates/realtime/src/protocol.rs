//! JSON hub protocol framing.
//!
//! Every frame is a JSON object terminated by the ASCII record separator
//! (`0x1E`); one WebSocket text message may carry several frames. The
//! connection opens with a handshake frame from the client, answered by
//! an empty object (or one carrying `error`) from the server.

use serde::Deserialize;
use serde_json::{json, Value};

/// Frame terminator.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Hub frame `type` codes the channel handles.
pub const TYPE_INVOCATION: u8 = 1;
pub const TYPE_PING: u8 = 6;
pub const TYPE_CLOSE: u8 = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Call `target` with positional `arguments`.
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    /// The server is closing the connection, optionally with a reason.
    Close { error: Option<String> },
    /// Any other frame type (stream items, completions, acks).
    Other(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed hub frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invocation frame has no target")]
    MissingTarget,

    #[error("Hub rejected handshake: {0}")]
    HandshakeRejected(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HandshakeResponse {
    #[serde(default)]
    error: Option<String>,
}

/// The client's opening frame.
pub fn handshake_request() -> String {
    terminate(json!({ "protocol": "json", "version": 1 }))
}

/// Check the server's handshake answer.
pub fn parse_handshake_response(frame: &str) -> Result<(), ProtocolError> {
    let response: HandshakeResponse = serde_json::from_str(frame)?;
    match response.error {
        Some(error) => Err(ProtocolError::HandshakeRejected(error)),
        None => Ok(()),
    }
}

/// Split a text message into its frames, dropping the empty tail after
/// the final separator.
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .filter(|frame| !frame.trim().is_empty())
}

pub fn decode_frame(frame: &str) -> Result<HubMessage, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(frame)?;
    let message = match raw.kind {
        TYPE_INVOCATION => HubMessage::Invocation {
            target: raw.target.ok_or(ProtocolError::MissingTarget)?,
            arguments: raw.arguments,
        },
        TYPE_PING => HubMessage::Ping,
        TYPE_CLOSE => HubMessage::Close { error: raw.error },
        other => HubMessage::Other(other),
    };
    Ok(message)
}

/// Serialize `message` as one terminated frame.
pub fn encode(message: &HubMessage) -> String {
    let value = match message {
        HubMessage::Invocation { target, arguments } => json!({
            "type": TYPE_INVOCATION,
            "target": target,
            "arguments": arguments,
        }),
        HubMessage::Ping => json!({ "type": TYPE_PING }),
        HubMessage::Close { error } => match error {
            Some(error) => json!({ "type": TYPE_CLOSE, "error": error }),
            None => json!({ "type": TYPE_CLOSE }),
        },
        HubMessage::Other(kind) => json!({ "type": kind }),
    };
    terminate(value)
}

/// A terminated invocation frame for `target` with no arguments.
pub fn invocation(target: &str) -> String {
    encode(&HubMessage::Invocation {
        target: target.to_string(),
        arguments: Vec::new(),
    })
}

fn terminate(value: Value) -> String {
    let mut frame = value.to_string();
    frame.push(RECORD_SEPARATOR);
    frame
}
