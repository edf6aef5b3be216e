//! Error types for WebSocket streams.
//!
//! Every failure a transport reports is captured once per connection and
//! handed, as a clone of the same [`Error`], to every source pull and sink
//! write made against that connection.

use std::fmt;

use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported by the underlying transport.
///
/// Some transports report a connection attempt as a single error, others as
/// an aggregate of several attempts (one per resolved address, for example).
/// Aggregates keep every nested cause in [`causes`](Self::causes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
    causes: Vec<TransportError>,
}

impl TransportError {
    /// Create a single-cause transport error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Create an error grouping several underlying failures.
    #[must_use]
    pub fn aggregate(message: impl Into<String>, causes: Vec<TransportError>) -> Self {
        Self {
            message: message.into(),
            causes,
        }
    }

    /// The top-level message, without nested causes.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Nested causes. Empty for single-cause errors.
    #[must_use]
    pub fn causes(&self) -> &[TransportError] {
        &self.causes
    }

    /// Returns `true` if this is an aggregate of several failures.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        !self.causes.is_empty()
    }

    /// Returns `true` if this error or any nested cause reports a refused connection.
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        let lower = self.message.to_ascii_lowercase();
        lower.contains("connection refused")
            || lower.contains("econnrefused")
            || self.causes.iter().any(TransportError::is_connection_refused)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for (i, cause) in self.causes.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::new(err.to_string())
    }
}

/// Errors surfaced by sources, sinks and connection readiness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The connection failed before it ever opened.
    #[error("Connection failed: {0}")]
    Connect(TransportError),

    /// The transport failed after the connection opened.
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The connection closed before it ever opened.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Another source is already pulling from this connection.
    #[error("Connection source already claimed")]
    SourceAlreadyClaimed,
}

impl Error {
    /// The transport failure behind this error, if any.
    #[must_use]
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Error::Connect(e) | Error::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// Nested transport causes. Empty unless the transport reported an aggregate.
    #[must_use]
    pub fn causes(&self) -> &[TransportError] {
        match self.transport_error() {
            Some(err) => err.causes(),
            None => &[],
        }
    }

    /// Returns `true` if the transport refused the connection.
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        self.transport_error()
            .is_some_and(TransportError::is_connection_refused)
    }
}
