//! Core infrastructure for socket-resilience.
//!
//! This crate provides the pieces shared by the policy and handler crates:
//! - Event emission keyed by event kind, for lifecycle observers
//! - The [`Message`] model and its data/control classification
//! - The transport collaborator contract ([`Connection`], [`ConnectionFactory`])
//! - The [`TransportError`] taxonomy the handler knows how to classify

pub mod error;
pub mod events;
pub mod message;
pub mod transport;

pub use error::TransportError;
pub use events::{EventEmitter, EventListener, FnListener, SocketEvent};
pub use message::{Message, MessageKind};
pub use transport::{CloseSignal, Connection, ConnectionFactory, InboundSender};
