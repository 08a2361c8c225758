//! Error types for the connection handler.

use socket_resilience_core::TransportError;

/// Errors surfaced by a [`ConnectionHandler`](crate::ConnectionHandler).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Dialing gave up after exhausting the retry budget, or on the first
    /// failure when reconnection is disabled.
    #[error("dial failed after {attempts} attempt(s): {source}")]
    Dial {
        /// Failed attempts made by the last dial call.
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The transport went away.
    #[error("transport failed: {0}")]
    Transport(#[source] TransportError),

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The handler has been closed.
    #[error("connection handler is closed")]
    Closed,

    /// The outbound queue is full.
    #[error("outbound queue is full")]
    QueueFull,
}

impl ConnectionError {
    /// The underlying transport error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            ConnectionError::Dial { source, .. } => Some(source),
            ConnectionError::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if this is a dial failure.
    pub fn is_dial(&self) -> bool {
        matches!(self, ConnectionError::Dial { .. })
    }

    /// Returns `true` if the handler (or its context) is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionError::Closed | ConnectionError::Cancelled)
    }
}
