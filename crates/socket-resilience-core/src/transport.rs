//! Transport collaborator contract.
//!
//! A transport is supplied by the caller as a [`ConnectionFactory`]. The
//! handler asks the factory for a fresh [`Connection`] every time it dials,
//! opens it, and from then on only writes to it, watches its
//! [`close_signal`](Connection::close_signal), and reads its
//! [`close_reason`](Connection::close_reason) once that signal fires.
//!
//! Inbound traffic flows the other way: each connection is handed an
//! [`InboundSender`] at creation and pushes everything it reads into it.
//!
//! # Examples
//!
//! Using a closure as the factory (via blanket impl):
//!
//! ```rust
//! use socket_resilience_core::{
//!     CloseSignal, Connection, ConnectionFactory, InboundSender, Message, TransportError,
//! };
//!
//! struct Loopback {
//!     inbound: InboundSender,
//!     closed: CloseSignal,
//! }
//!
//! impl Connection for Loopback {
//!     async fn open(&mut self, _ctx: &CloseSignal) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!
//!     async fn write(&mut self, message: Message) -> Result<(), TransportError> {
//!         self.inbound.deliver(message).await
//!     }
//!
//!     fn close(&mut self) {
//!         self.closed.cancel();
//!     }
//!
//!     fn close_signal(&self) -> CloseSignal {
//!         self.closed.clone()
//!     }
//!
//!     fn close_reason(&self) -> Option<TransportError> {
//!         None
//!     }
//! }
//!
//! let factory = |_ctx: &CloseSignal, inbound: InboundSender| Loopback {
//!     inbound,
//!     closed: CloseSignal::new(),
//! };
//! # fn assert_factory<F: ConnectionFactory>(_: &F) {}
//! # assert_factory(&factory);
//! ```

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::message::Message;

/// Broadcast-once signal. Once cancelled it stays cancelled.
///
/// Also used as the dial "context": cancelling it aborts pending dials.
pub type CloseSignal = CancellationToken;

/// Handle through which a transport delivers inbound messages to the handler.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<Message>,
}

impl InboundSender {
    /// Delivers a message, waiting for queue capacity.
    ///
    /// Fails with [`TransportError::ConnectionClosed`] once the handler has
    /// stopped receiving.
    pub async fn deliver(&self, message: Message) -> Result<(), TransportError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Returns `true` once the handler has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl From<mpsc::Sender<Message>> for InboundSender {
    fn from(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }
}

/// A single transport connection.
pub trait Connection: Send + Sync + 'static {
    /// Establishes the connection. `ctx` is cancelled when the dial should be abandoned.
    fn open(
        &mut self,
        ctx: &CloseSignal,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Writes one message to the peer.
    fn write(&mut self, message: Message)
    -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the connection. Must be idempotent.
    fn close(&mut self);

    /// Signal fired when the connection goes away for any reason.
    fn close_signal(&self) -> CloseSignal;

    /// Why the connection went away, or `None` if it closed without error.
    fn close_reason(&self) -> Option<TransportError>;
}

/// Creates transport connections on demand.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The connection type produced by this factory.
    type Connection: Connection;

    /// Builds a new, not yet opened, connection.
    fn create(&self, ctx: &CloseSignal, inbound: InboundSender) -> Self::Connection;
}

// Blanket implementation for closures
impl<F, C> ConnectionFactory for F
where
    F: Fn(&CloseSignal, InboundSender) -> C + Send + Sync + 'static,
    C: Connection,
{
    type Connection = C;

    fn create(&self, ctx: &CloseSignal, inbound: InboundSender) -> Self::Connection {
        self(ctx, inbound)
    }
}
