//! Resilient connection handling over any message transport.
//!
//! A [`ConnectionHandler`] keeps one logical connection alive on top of a
//! [`ConnectionFactory`](socket_resilience_core::ConnectionFactory):
//!
//! - **Reconnect**: redials when the transport closes, with exponential
//!   backoff that escalates while connections flap and resets once one stays
//!   up past the healthy threshold
//! - **Reopen**: rotates the transport on a fixed schedule, opening the
//!   replacement before closing the old one
//! - **Heartbeat**: sends pings on an interval and/or answers the peer's pings
//!
//! [`Client`] wires a handler to application callbacks, routing control
//! frames back into the handler and forwarding lifecycle events.
//!
//! # Features
//!
//! - `tracing` (default): structured logs, every record tagged with the
//!   handler name
//! - `metrics`: counters for dials, reconnects, reopens, and messages, plus
//!   a `socket_connected` gauge
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use socket_resilience_handler::HandlerConfig;
//! use socket_resilience_policy::{HeartbeatPolicy, ReconnectPolicy, ReopenPolicy};
//!
//! let config = HandlerConfig::builder()
//!     .name("market-data")
//!     .reconnect(
//!         ReconnectPolicy::builder()
//!             .unlimited_retries()
//!             .healthy_duration(Duration::from_secs(10))
//!             .build(),
//!     )
//!     .reopen(ReopenPolicy::every(Duration::from_secs(3600)))
//!     .heartbeat(HeartbeatPolicy::builder().active(Duration::from_secs(15)).passive().build())
//!     .build();
//!
//! assert_eq!(config.name(), "market-data");
//! ```

#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

mod client;
mod config;
mod error;
mod events;
mod handler;
mod sink;
mod state;

pub use client::Client;
pub use config::{
    HandlerConfig, HandlerConfigBuilder, CANNOT_CONNECT_RETRY_DELAY, CONTROL_QUEUE_CAPACITY,
    DEFAULT_QUEUE_CAPACITY,
};
pub use error::ConnectionError;
pub use events::{ConnectionEmitter, ConnectionEvent, EventKind};
pub use handler::ConnectionHandler;
pub use sink::{ClientHandle, EventSink, MessageSink};
pub use state::ConnectionState;
