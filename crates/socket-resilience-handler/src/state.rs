//! Observable connection state.

use tokio::time::Instant;

/// Where a handler is in its lifecycle.
///
/// Published through a [`tokio::sync::watch`] channel; see
/// [`ConnectionHandler::state_receiver`](crate::ConnectionHandler::state_receiver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Built but not yet connected.
    Idle,
    /// Performing the initial dial.
    Connecting,
    /// A transport is open.
    Running {
        /// When the current transport was opened.
        since: Instant,
    },
    /// Replacing a transport that closed.
    Reconnecting {
        /// Consecutive unhealthy closes feeding the backoff.
        round: u32,
    },
    /// Shut down. Terminal.
    Closed,
}

impl ConnectionState {
    pub fn is_running(&self) -> bool {
        matches!(self, ConnectionState::Running { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    /// Returns `true` while a dial is in flight.
    pub fn is_dialing(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}
