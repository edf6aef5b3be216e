//! Messages and close codes exchanged with the transport.

use bytes::Bytes;

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001).
    GoingAway,
    /// Protocol error (1002).
    ProtocolError,
    /// Abnormal closure (1006). Reported locally when the peer vanished without a close frame.
    Abnormal,
    /// Internal error (1011).
    InternalError,
    /// Any other code.
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1006 => CloseCode::Abnormal,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::Abnormal => 1006,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Returns `true` for a clean, intentional closure.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, CloseCode::Normal | CloseCode::GoingAway)
    }
}

/// Close event payload: status code and reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason for closing.
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// A normal (1000) close with an empty reason.
    #[must_use]
    pub fn normal() -> Self {
        Self::new(CloseCode::Normal, "")
    }
}

/// A data message as delivered by the transport.
///
/// Streams treat payloads as opaque bytes; text frames are converted with
/// [`into_bytes`](Self::into_bytes) when they enter the inbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message.
    Binary(Bytes),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the payload as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    /// Consume the message and return its payload bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Message::Text(s) => Bytes::from(s),
            Message::Binary(data) => data,
        }
    }
}

impl From<Bytes> for Message {
    fn from(data: Bytes) -> Self {
        Message::Binary(data)
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(Bytes::from(data))
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_owned())
    }
}
