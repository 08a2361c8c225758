//! Application-facing façade over [`ConnectionHandler`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use socket_resilience_core::{CloseSignal, ConnectionFactory, Message};
#[cfg(feature = "tracing")]
use tracing::warn;

use crate::config::HandlerConfig;
use crate::error::ConnectionError;
use crate::events::{ConnectionEmitter, ConnectionEvent, EventKind};
use crate::handler::ConnectionHandler;
use crate::sink::{ClientHandle, EventSink, MessageSink};
use crate::state::ConnectionState;

/// A handler wired to an application message sink and event sink.
///
/// Data messages go to the message sink. Control frames (ping, pong, close)
/// are routed back into the handler so passive heartbeats can answer them.
///
/// # Examples
///
/// ```rust,no_run
/// use socket_resilience_core::{CloseSignal, ConnectionFactory, Message};
/// use socket_resilience_handler::{Client, ClientHandle, EventKind, HandlerConfig};
///
/// # async fn example<F: ConnectionFactory>(factory: F) -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(
///     factory,
///     |_client: &ClientHandle, message: Message| println!("data: {:?}", message.payload()),
///     |_client: &ClientHandle, event: EventKind| println!("event: {event}"),
///     HandlerConfig::default(),
/// );
///
/// client.open(CloseSignal::new()).await?;
/// client.send(Message::data("hello")).await?;
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct Client<F: ConnectionFactory> {
    handler: ConnectionHandler<F>,
    events: Arc<dyn EventSink>,
    subscribed: AtomicBool,
}

impl<F: ConnectionFactory> Client<F> {
    pub fn new<M, E>(factory: F, messages: M, events: E, config: HandlerConfig) -> Self
    where
        M: MessageSink,
        E: EventSink,
    {
        let emitter = Arc::new(ConnectionEmitter::new());
        let split = SplitSink {
            handler: Arc::clone(&config.name),
            data: Box::new(messages),
        };
        Self {
            handler: ConnectionHandler::new(factory, split, emitter, config),
            events: Arc::new(events),
            subscribed: AtomicBool::new(false),
        }
    }

    /// Subscribes the event sink and connects.
    pub async fn open(&self, ctx: CloseSignal) -> Result<(), ConnectionError> {
        if !self.subscribed.swap(true, Ordering::AcqRel) {
            for kind in [EventKind::Connect, EventKind::Reconnect, EventKind::Close] {
                let events = Arc::clone(&self.events);
                let client = self.handler.client().clone();
                self.handler
                    .events()
                    .on_fn(kind, move |event: &ConnectionEvent| {
                        events.on_event(&client, event.kind())
                    });
            }
        }
        self.handler.connect(ctx).await
    }

    pub async fn send(&self, message: Message) -> Result<(), ConnectionError> {
        self.handler.send(message).await
    }

    pub fn try_send(&self, message: Message) -> Result<(), ConnectionError> {
        self.handler.try_send(message)
    }

    /// Closes the handler. The event sink still receives [`EventKind::Close`].
    pub fn close(&self) {
        self.handler.close();
    }

    pub fn close_signal(&self) -> CloseSignal {
        self.handler.close_signal()
    }

    pub fn close_reason(&self) -> Option<ConnectionError> {
        self.handler.close_reason()
    }

    pub fn state(&self) -> ConnectionState {
        self.handler.state()
    }

    /// The underlying handler.
    pub fn handler(&self) -> &ConnectionHandler<F> {
        &self.handler
    }
}

impl<F: ConnectionFactory> fmt::Debug for Client<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

/// Sends data to the application and control frames back to the handler.
struct SplitSink {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    handler: Arc<str>,
    data: Box<dyn MessageSink>,
}

impl MessageSink for SplitSink {
    fn on_message(&self, client: &ClientHandle, message: Message) {
        if message.kind().is_data() {
            self.data.on_message(client, message);
            return;
        }
        if let Err(err) = client.route_control(message) {
            #[cfg(feature = "tracing")]
            warn!(handler = %self.handler, error = %err, "dropping control frame");
        }
    }
}
