//! Transport error taxonomy.
//!
//! The handler never interprets transport-specific failures beyond two
//! classifications: [`TransportError::CannotConnect`], which is retried quickly
//! without backoff, and the closed/terminated pair, which triggers the
//! healthy-duration evaluation after a transport goes away.

use std::sync::Arc;

/// Errors reported by a transport connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The remote end could not be reached. Assumed to clear quickly.
    #[error("cannot connect: {0}")]
    CannotConnect(String),

    /// The connection was closed, gracefully or by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection was terminated underneath the transport.
    #[error("connection terminated")]
    Terminated,

    /// An I/O failure in the transport.
    #[error("transport I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps an arbitrary error as [`TransportError::Other`].
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Other(Arc::from(error.into()))
    }

    /// Returns `true` if this is a "cannot connect" failure.
    pub fn is_cannot_connect(&self) -> bool {
        matches!(self, TransportError::CannotConnect(_))
    }

    /// Returns `true` if the connection was closed or terminated.
    pub fn is_closed_or_terminated(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionClosed | TransportError::Terminated
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        TransportError::Io(Arc::new(error))
    }
}
