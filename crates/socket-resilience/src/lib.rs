//! Resilient socket connections for async Rust.
//!
//! Re-exports the pieces of the socket-resilience workspace:
//!
//! - [`core`]: messages, the transport contract, and the event emitter
//! - [`policy`]: reconnect, reopen, and heartbeat policies plus backoff
//! - [`handler`]: the [`ConnectionHandler`] loop and the [`Client`] façade
//!
//! The most common types are also available at the crate root.
//!
//! # Features
//!
//! - `tracing` (on through the handler crate defaults): structured logging
//! - `metrics`: Prometheus-style counters and gauges via the `metrics` crate

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use socket_resilience_core as core;
pub use socket_resilience_handler as handler;
pub use socket_resilience_policy as policy;

pub use socket_resilience_core::{
    CloseSignal, Connection, ConnectionFactory, EventEmitter, InboundSender, Message,
    MessageKind, TransportError,
};
pub use socket_resilience_handler::{
    Client, ClientHandle, ConnectionError, ConnectionEvent, ConnectionHandler, ConnectionState,
    EventKind, EventSink, HandlerConfig, MessageSink,
};
pub use socket_resilience_policy::{
    ExponentialBackoff, HeartbeatPolicy, ReconnectPolicy, ReopenPolicy,
};
