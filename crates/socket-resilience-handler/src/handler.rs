//! The connection handler and its event loop.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
use socket_resilience_core::{
    CloseSignal, Connection, ConnectionFactory, InboundSender, Message, MessageKind,
    TransportError,
};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
#[cfg(feature = "tracing")]
use tracing::{debug, info, trace, warn};

use crate::config::{HandlerConfig, CANNOT_CONNECT_RETRY_DELAY, CONTROL_QUEUE_CAPACITY};
use crate::error::ConnectionError;
use crate::events::{ConnectionEmitter, ConnectionEvent, EventKind};
use crate::sink::{ClientHandle, MessageSink};
use crate::state::ConnectionState;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Keeps one logical connection alive over a sequence of transports.
///
/// The handler dials through a [`ConnectionFactory`], pumps outbound and
/// inbound messages, and reacts to transport closure, reopen ticks, and
/// heartbeat ticks from a single background loop. Cloning is cheap and every
/// clone drives the same connection.
///
/// Reopening dials the replacement before closing the current transport, so
/// two transports are briefly open at once during a rotation. Transports
/// with a per-peer connection quota need room for one extra connection.
///
/// The loop runs until [`close`](Self::close) is called, the `ctx` passed to
/// [`connect`](Self::connect) is cancelled, or recovery fails. Dropping the
/// handles does not stop it.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use socket_resilience_core::{CloseSignal, ConnectionFactory, Message};
/// use socket_resilience_handler::{ClientHandle, ConnectionHandler, HandlerConfig};
///
/// # async fn example<F: ConnectionFactory>(factory: F) -> Result<(), Box<dyn std::error::Error>> {
/// let handler = ConnectionHandler::new(
///     factory,
///     |_client: &ClientHandle, message: Message| println!("{:?}", message.payload()),
///     Arc::default(),
///     HandlerConfig::builder().name("feed").build(),
/// );
///
/// handler.connect(CloseSignal::new()).await?;
/// handler.send(Message::data("subscribe")).await?;
/// handler.close();
/// # Ok(())
/// # }
/// ```
pub struct ConnectionHandler<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

struct Shared<F: ConnectionFactory> {
    config: HandlerConfig,
    factory: F,
    sink: Box<dyn MessageSink>,
    emitter: Arc<ConnectionEmitter>,
    transport: RwLock<Option<F::Connection>>,
    inbound: mpsc::Sender<Message>,
    client: ClientHandle,
    queues: Mutex<Option<Queues>>,
    started: AtomicBool,
    close: CloseSignal,
    close_reason: Mutex<Option<ConnectionError>>,
    state: watch::Sender<ConnectionState>,
}

/// Receiving ends of the handler's queues, owned by the loop once it starts.
struct Queues {
    inbound: mpsc::Receiver<Message>,
    outbound: mpsc::Receiver<Message>,
    control: mpsc::Receiver<Message>,
}

impl<F: ConnectionFactory> ConnectionHandler<F> {
    /// Builds a handler. Nothing is dialed until [`connect`](Self::connect).
    ///
    /// Lifecycle events go to `emitter`, which the handler closes after it
    /// emits [`EventKind::Close`].
    pub fn new<S>(factory: F, sink: S, emitter: Arc<ConnectionEmitter>, config: HandlerConfig) -> Self
    where
        S: MessageSink,
    {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "socket_dial_attempts_total",
                "Total number of transport dial attempts"
            );
            describe_counter!(
                "socket_reconnects_total",
                "Total number of transports replaced after closing"
            );
            describe_counter!(
                "socket_reopens_total",
                "Total number of proactive transport rotations"
            );
            describe_counter!(
                "socket_messages_sent_total",
                "Total number of messages written to a transport"
            );
            describe_counter!(
                "socket_messages_dropped_total",
                "Total number of messages dropped by the handler"
            );
            describe_counter!(
                "socket_heartbeats_sent_total",
                "Total number of heartbeat pings sent"
            );
            describe_gauge!(
                "socket_connected",
                "Whether the handler currently holds an open transport"
            );
        });

        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);
        let close = CloseSignal::new();
        let (state, _) = watch::channel(ConnectionState::Idle);

        let shared = Shared {
            client: ClientHandle::new(outbound_tx, control_tx, close.clone()),
            config,
            factory,
            sink: Box::new(sink),
            emitter,
            transport: RwLock::new(None),
            inbound: inbound_tx,
            queues: Mutex::new(Some(Queues {
                inbound: inbound_rx,
                outbound: outbound_rx,
                control: control_rx,
            })),
            started: AtomicBool::new(false),
            close,
            close_reason: Mutex::new(None),
            state,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Dials the first transport and starts the background loop.
    ///
    /// Only the first call does anything; later calls return `Ok(())`.
    /// Cancelling `ctx` aborts a pending dial, and once connected it closes
    /// the handler. On failure the handler is closed and the error is kept
    /// as the close reason.
    pub async fn connect(&self, ctx: CloseSignal) -> Result<(), ConnectionError> {
        let shared = &self.shared;
        if shared.started.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            debug!(handler = %shared.config.name, "connect called again, ignoring");
            return Ok(());
        }
        let Some(queues) = shared.take_queues() else {
            return Ok(());
        };
        if shared.close.is_cancelled() {
            shared.set_state(ConnectionState::Closed);
            return Err(ConnectionError::Closed);
        }

        shared.set_state(ConnectionState::Connecting);
        #[cfg(feature = "tracing")]
        info!(handler = %shared.config.name, "connecting");

        if let Err(err) = shared.open_transport(&ctx, 0).await {
            #[cfg(feature = "tracing")]
            warn!(handler = %shared.config.name, error = %err, "initial connect failed");
            shared.fail(err.clone());
            shared.set_state(ConnectionState::Closed);
            return Err(err);
        }

        let since = Instant::now();
        shared.set_state(ConnectionState::Running { since });
        #[cfg(feature = "tracing")]
        info!(handler = %shared.config.name, "connected");

        shared.emit(EventKind::Connect);
        tokio::spawn(Arc::clone(shared).run(ctx, queues, since));
        Ok(())
    }

    /// Queues a message for the transport, waiting for queue capacity.
    pub async fn send(&self, message: Message) -> Result<(), ConnectionError> {
        self.shared.client.send(message).await
    }

    /// Queues a message without waiting.
    pub fn try_send(&self, message: Message) -> Result<(), ConnectionError> {
        self.shared.client.try_send(message)
    }

    /// Pushes a message onto the inbound queue as if the transport had
    /// received it.
    pub async fn recv(&self, message: Message) -> Result<(), ConnectionError> {
        let shared = &self.shared;
        if shared.close.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        tokio::select! {
            biased;
            () = shared.close.cancelled() => Err(ConnectionError::Closed),
            sent = shared.inbound.send(message) => sent.map_err(|_| ConnectionError::Closed),
        }
    }

    /// Closes the handler. Safe to call any number of times, from any task.
    pub fn close(&self) {
        let shared = &self.shared;
        if shared.close.is_cancelled() {
            return;
        }
        #[cfg(feature = "tracing")]
        debug!(handler = %shared.config.name, "close requested");
        shared.close.cancel();
        if !shared.started.load(Ordering::Acquire) {
            shared.set_state(ConnectionState::Closed);
        }
    }

    /// Signal fired once the handler is closing.
    pub fn close_signal(&self) -> CloseSignal {
        self.shared.close.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.close.is_cancelled()
    }

    /// The last recorded reason the handler or one of its transports closed.
    pub fn close_reason(&self) -> Option<ConnectionError> {
        self.shared
            .close_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.shared.config
    }

    /// Handle passed to sinks; usable to send or close from elsewhere too.
    pub fn client(&self) -> &ClientHandle {
        &self.shared.client
    }

    /// The emitter lifecycle events are published on.
    pub fn events(&self) -> &Arc<ConnectionEmitter> {
        &self.shared.emitter
    }
}

impl<F: ConnectionFactory> Clone for ConnectionHandler<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for ConnectionHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<F: ConnectionFactory> Shared<F> {
    async fn run(self: Arc<Self>, ctx: CloseSignal, mut queues: Queues, mut since: Instant) {
        let mut transport_closed = self.transport_close_signal().await;
        let mut round: u32 = 0;
        let mut heartbeat = self.config.heartbeat.active_interval().map(ticker);
        let mut reopen = self.config.reopen.interval().map(ticker);

        loop {
            if self.close.is_cancelled() {
                break;
            }

            tokio::select! {
                () = self.close.cancelled() => break,
                () = ctx.cancelled() => {
                    #[cfg(feature = "tracing")]
                    info!(handler = %self.config.name, "context cancelled, closing");
                    self.record_close_reason(ConnectionError::Cancelled);
                    self.close.cancel();
                    break;
                }
                () = transport_closed.cancelled() => {
                    match self.recover(&ctx, &mut round, since).await {
                        Some(signal) => {
                            transport_closed = signal;
                            since = Instant::now();
                        }
                        None => break,
                    }
                }
                Some(message) = queues.control.recv() => self.handle_control(message).await,
                Some(message) = queues.inbound.recv() => self.dispatch(message).await,
                Some(message) = queues.outbound.recv() => self.write(message).await,
                () = tick(&mut heartbeat) => {
                    #[cfg(feature = "tracing")]
                    trace!(handler = %self.config.name, "sending heartbeat ping");
                    #[cfg(feature = "metrics")]
                    counter!("socket_heartbeats_sent_total", "handler" => self.config.name.to_string()).increment(1);
                    self.write(Message::ping()).await;
                }
                () = tick(&mut reopen) => {
                    match self.rotate(&ctx).await {
                        Some(signal) => {
                            transport_closed = signal;
                            since = Instant::now();
                        }
                        None => break,
                    }
                }
            }
        }

        self.shutdown().await;
    }

    /// Dials a fresh transport and swaps it in, closing the previous one only
    /// after the new one is open.
    ///
    /// `round` offsets the backoff so redials after repeated flapping wait
    /// longer from their first retry.
    async fn open_transport(&self, ctx: &CloseSignal, round: u32) -> Result<(), ConnectionError> {
        let policy = &self.config.reconnect;
        let mut current = self.transport.write().await;
        let mut failures: u32 = 0;

        loop {
            let mut candidate = self
                .factory
                .create(ctx, InboundSender::from(self.inbound.clone()));

            let opened = tokio::select! {
                biased;
                () = self.close.cancelled() => return Err(ConnectionError::Closed),
                () = ctx.cancelled() => return Err(ConnectionError::Cancelled),
                opened = candidate.open(ctx) => opened,
            };

            let err = match opened {
                Ok(()) => {
                    #[cfg(feature = "metrics")]
                    {
                        counter!("socket_dial_attempts_total", "handler" => self.config.name.to_string(), "result" => "success").increment(1);
                        gauge!("socket_connected", "handler" => self.config.name.to_string()).set(1.0);
                    }
                    if let Some(mut previous) = current.replace(candidate) {
                        previous.close();
                    }
                    return Ok(());
                }
                Err(err) => err,
            };

            candidate.close();
            failures = failures.saturating_add(1);
            #[cfg(feature = "metrics")]
            counter!("socket_dial_attempts_total", "handler" => self.config.name.to_string(), "result" => "failure").increment(1);

            if !policy.is_enabled() || policy.retries_exhausted(failures) {
                return Err(ConnectionError::Dial {
                    attempts: failures,
                    source: err,
                });
            }

            let wait = if err.is_cannot_connect() {
                CANNOT_CONNECT_RETRY_DELAY
            } else {
                policy.backoff(round.saturating_add(failures))
            };
            #[cfg(feature = "tracing")]
            info!(
                handler = %self.config.name,
                attempt = failures,
                error = %err,
                wait = ?wait,
                "dial failed, retrying"
            );
            self.pause(ctx, wait).await?;
        }
    }

    /// Handles a transport that went away. Returns the new transport's close
    /// signal, or `None` if the handler must shut down.
    async fn recover(&self, ctx: &CloseSignal, round: &mut u32, since: Instant) -> Option<CloseSignal> {
        let reason = {
            let mut transport = self.transport.write().await;
            transport.as_mut().and_then(|conn| {
                let reason = conn.close_reason();
                conn.close();
                reason
            })
        };
        #[cfg(feature = "metrics")]
        gauge!("socket_connected", "handler" => self.config.name.to_string()).set(0.0);

        // a clean close clears any reason left by an earlier transport
        self.store_close_reason(reason.clone().map(ConnectionError::Transport));

        let policy = &self.config.reconnect;
        if !policy.is_enabled() {
            #[cfg(feature = "tracing")]
            info!(handler = %self.config.name, reason = ?reason, "transport closed, reconnect disabled");
            self.close.cancel();
            return None;
        }

        if reason
            .as_ref()
            .is_some_and(TransportError::is_closed_or_terminated)
        {
            *round = if since.elapsed() > policy.healthy_duration() {
                0
            } else {
                round.saturating_add(1)
            };
        }

        self.set_state(ConnectionState::Reconnecting { round: *round });
        let wait = if *round > 0 {
            policy.backoff(*round)
        } else {
            Duration::ZERO
        };
        #[cfg(feature = "tracing")]
        info!(
            handler = %self.config.name,
            round = *round,
            wait = ?wait,
            "transport closed, reconnecting"
        );

        let result = match self.pause(ctx, wait).await {
            Ok(()) => self.open_transport(ctx, *round).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                let signal = self.transport_close_signal().await;
                self.set_state(ConnectionState::Running {
                    since: Instant::now(),
                });
                #[cfg(feature = "metrics")]
                counter!("socket_reconnects_total", "handler" => self.config.name.to_string()).increment(1);
                #[cfg(feature = "tracing")]
                info!(handler = %self.config.name, round = *round, "reconnected");
                self.emit_detached(EventKind::Reconnect);
                Some(signal)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(handler = %self.config.name, error = %err, "reconnect failed, closing");
                self.fail(err);
                None
            }
        }
    }

    /// Replaces a healthy transport on the reopen schedule.
    async fn rotate(&self, ctx: &CloseSignal) -> Option<CloseSignal> {
        #[cfg(feature = "tracing")]
        info!(handler = %self.config.name, "reopening transport");

        match self.open_transport(ctx, 0).await {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!("socket_reopens_total", "handler" => self.config.name.to_string()).increment(1);
                self.set_state(ConnectionState::Running {
                    since: Instant::now(),
                });
                Some(self.transport_close_signal().await)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(handler = %self.config.name, error = %err, "reopen failed, closing");
                self.fail(err);
                None
            }
        }
    }

    async fn handle_control(&self, message: Message) {
        match message.kind() {
            MessageKind::Ping if self.config.heartbeat.is_passive() => {
                #[cfg(feature = "tracing")]
                trace!(handler = %self.config.name, "answering ping");
                self.write(Message::pong(message.into_payload())).await;
            }
            MessageKind::Ping => {
                #[cfg(feature = "tracing")]
                trace!(handler = %self.config.name, "ping ignored, passive heartbeat off");
            }
            MessageKind::Pong => {
                #[cfg(feature = "tracing")]
                trace!(handler = %self.config.name, "pong received");
            }
            MessageKind::Close => {
                #[cfg(feature = "tracing")]
                debug!(handler = %self.config.name, "close frame received");
            }
            MessageKind::Data => self.dispatch(message).await,
        }
    }

    async fn dispatch(&self, message: Message) {
        if self.transport.read().await.is_none() {
            #[cfg(feature = "tracing")]
            warn!(handler = %self.config.name, "transport not ready, dropping inbound message");
            #[cfg(feature = "metrics")]
            counter!("socket_messages_dropped_total", "handler" => self.config.name.to_string(), "reason" => "not_ready").increment(1);
            return;
        }

        let delivered = catch_unwind(AssertUnwindSafe(|| {
            self.sink.on_message(&self.client, message);
        }));
        if delivered.is_err() {
            #[cfg(feature = "tracing")]
            warn!(handler = %self.config.name, "message sink panicked");
        }
    }

    async fn write(&self, message: Message) {
        let mut transport = self.transport.write().await;
        let Some(conn) = transport.as_mut() else {
            #[cfg(feature = "tracing")]
            warn!(handler = %self.config.name, "transport not ready, dropping outbound message");
            #[cfg(feature = "metrics")]
            counter!("socket_messages_dropped_total", "handler" => self.config.name.to_string(), "reason" => "not_ready").increment(1);
            return;
        };

        let written = tokio::select! {
            biased;
            () = self.close.cancelled() => return,
            written = conn.write(message) => written,
        };

        match written {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!("socket_messages_sent_total", "handler" => self.config.name.to_string()).increment(1);
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(handler = %self.config.name, error = %err, "write failed, dropping message");
                #[cfg(feature = "metrics")]
                counter!("socket_messages_dropped_total", "handler" => self.config.name.to_string(), "reason" => "write_error").increment(1);
            }
        }
    }

    /// Sleeps for `wait` unless the handler closes or `ctx` is cancelled first.
    async fn pause(&self, ctx: &CloseSignal, wait: Duration) -> Result<(), ConnectionError> {
        if wait.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            () = self.close.cancelled() => Err(ConnectionError::Closed),
            () = ctx.cancelled() => Err(ConnectionError::Cancelled),
            () = time::sleep(wait) => Ok(()),
        }
    }

    async fn shutdown(&self) {
        if let Some(mut conn) = self.transport.write().await.take() {
            conn.close();
        }
        #[cfg(feature = "metrics")]
        gauge!("socket_connected", "handler" => self.config.name.to_string()).set(0.0);

        self.set_state(ConnectionState::Closed);
        #[cfg(feature = "tracing")]
        info!(handler = %self.config.name, reason = ?self.current_close_reason(), "connection handler closed");

        self.emit(EventKind::Close);
        self.emitter.close();
    }

    async fn transport_close_signal(&self) -> CloseSignal {
        match self.transport.read().await.as_ref() {
            Some(conn) => conn.close_signal(),
            // never fires
            None => CloseSignal::new(),
        }
    }

    fn take_queues(&self) -> Option<Queues> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Records `err` and closes the handler.
    fn fail(&self, err: ConnectionError) {
        if !matches!(err, ConnectionError::Closed) {
            self.record_close_reason(err);
        }
        self.close.cancel();
    }

    fn record_close_reason(&self, err: ConnectionError) {
        self.store_close_reason(Some(err));
    }

    fn store_close_reason(&self, reason: Option<ConnectionError>) {
        *self
            .close_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = reason;
    }

    #[cfg(feature = "tracing")]
    fn current_close_reason(&self) -> Option<ConnectionError> {
        self.close_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn event(&self, kind: EventKind) -> ConnectionEvent {
        ConnectionEvent::new(kind, Arc::clone(&self.config.name))
    }

    fn emit(&self, kind: EventKind) {
        self.emitter.emit(&kind, &self.event(kind));
    }

    /// Emits from a separate task so slow listeners cannot stall the loop.
    fn emit_detached(&self, kind: EventKind) {
        let emitter = Arc::clone(&self.emitter);
        let event = self.event(kind);
        tokio::task::spawn_blocking(move || emitter.emit(&kind, &event));
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Resolves on the next tick, or never when the timer is off.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
