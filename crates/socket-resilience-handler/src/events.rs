//! Lifecycle events emitted by the connection handler.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use socket_resilience_core::{EventEmitter, SocketEvent};

/// The lifecycle transitions a handler announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The initial dial succeeded.
    Connect,
    /// A transport was replaced after it closed.
    Reconnect,
    /// The handler shut down.
    Close,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Reconnect => "reconnect",
            EventKind::Close => "close",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event as delivered to listeners.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    kind: EventKind,
    handler: Arc<str>,
    timestamp: Instant,
}

impl ConnectionEvent {
    pub(crate) fn new(kind: EventKind, handler: Arc<str>) -> Self {
        Self {
            kind,
            handler,
            timestamp: Instant::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl SocketEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.as_str()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn handler_name(&self) -> &str {
        &self.handler
    }
}

/// Emitter type shared between a handler and its observers.
pub type ConnectionEmitter = EventEmitter<EventKind, ConnectionEvent>;
