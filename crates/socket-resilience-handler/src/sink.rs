//! Application-facing callbacks and the handle passed to them.

use socket_resilience_core::{CloseSignal, Message};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::ConnectionError;
use crate::events::EventKind;

/// Cheap, cloneable handle to a running handler.
///
/// Passed to [`MessageSink`] and [`EventSink`] callbacks so they can reply,
/// route control frames, or shut the handler down without owning it.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    outbound: mpsc::Sender<Message>,
    control: mpsc::Sender<Message>,
    close: CloseSignal,
}

impl ClientHandle {
    pub(crate) fn new(
        outbound: mpsc::Sender<Message>,
        control: mpsc::Sender<Message>,
        close: CloseSignal,
    ) -> Self {
        Self {
            outbound,
            control,
            close,
        }
    }

    /// Queues a message for the transport, waiting for queue capacity.
    ///
    /// Returns [`ConnectionError::Closed`] once the handler has been closed,
    /// including while waiting.
    pub async fn send(&self, message: Message) -> Result<(), ConnectionError> {
        if self.close.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        tokio::select! {
            biased;
            () = self.close.cancelled() => Err(ConnectionError::Closed),
            sent = self.outbound.send(message) => sent.map_err(|_| ConnectionError::Closed),
        }
    }

    /// Queues a message without waiting.
    pub fn try_send(&self, message: Message) -> Result<(), ConnectionError> {
        if self.close.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        self.outbound.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => ConnectionError::QueueFull,
            TrySendError::Closed(_) => ConnectionError::Closed,
        })
    }

    /// Hands a control frame (ping, pong, close) back to the handler's loop.
    ///
    /// Never waits. When the control queue is full the frame is dropped and
    /// [`ConnectionError::QueueFull`] is returned.
    pub fn route_control(&self, message: Message) -> Result<(), ConnectionError> {
        if self.close.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        self.control.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => ConnectionError::QueueFull,
            TrySendError::Closed(_) => ConnectionError::Closed,
        })
    }

    /// Closes the handler. Idempotent.
    pub fn close(&self) {
        self.close.cancel();
    }

    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }
}

/// Receives every inbound message the handler dispatches.
///
/// Called from the handler's loop; keep it fast.
pub trait MessageSink: Send + Sync + 'static {
    fn on_message(&self, client: &ClientHandle, message: Message);
}

impl<F> MessageSink for F
where
    F: Fn(&ClientHandle, Message) + Send + Sync + 'static,
{
    fn on_message(&self, client: &ClientHandle, message: Message) {
        self(client, message)
    }
}

/// Receives lifecycle events.
pub trait EventSink: Send + Sync + 'static {
    fn on_event(&self, client: &ClientHandle, event: EventKind);
}

impl<F> EventSink for F
where
    F: Fn(&ClientHandle, EventKind) + Send + Sync + 'static,
{
    fn on_event(&self, client: &ClientHandle, event: EventKind) {
        self(client, event)
    }
}
