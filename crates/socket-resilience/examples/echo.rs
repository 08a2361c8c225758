//! Resilient client over an in-process echo transport.
//!
//! The echo peer drops every connection after two seconds. The handler
//! reconnects, rotates the transport every five seconds, and answers the
//! peer's pings.
//!
//! Run with: RUST_LOG=info cargo run -p socket-resilience --example echo

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket_resilience::{
    Client, ClientHandle, CloseSignal, Connection, EventKind, HandlerConfig, HeartbeatPolicy,
    InboundSender, Message, MessageKind, ReconnectPolicy, ReopenPolicy, TransportError,
};
use tokio::sync::mpsc;

/// One connection to a peer that echoes data and pings every 500ms.
struct EchoConnection {
    id: u64,
    inbound: InboundSender,
    peer: Option<mpsc::Sender<Message>>,
    close: CloseSignal,
    reason: Arc<Mutex<Option<TransportError>>>,
}

impl Connection for EchoConnection {
    async fn open(&mut self, _ctx: &CloseSignal) -> Result<(), TransportError> {
        let (tx, mut rx) = mpsc::channel::<Message>(16);
        let inbound = self.inbound.clone();
        let close = self.close.clone();
        let reason = Arc::clone(&self.reason);

        tokio::spawn(async move {
            let lifetime = tokio::time::sleep(Duration::from_secs(2));
            tokio::pin!(lifetime);
            let mut ping = tokio::time::interval(Duration::from_millis(500));
            loop {
                tokio::select! {
                    () = close.cancelled() => break,
                    () = &mut lifetime => {
                        *reason.lock().unwrap() = Some(TransportError::ConnectionClosed);
                        close.cancel();
                        break;
                    }
                    _ = ping.tick() => {
                        let _ = inbound.deliver(Message::ping()).await;
                    }
                    Some(message) = rx.recv() => {
                        if message.kind() == MessageKind::Data {
                            let _ = inbound.deliver(message).await;
                        }
                    }
                }
            }
        });

        self.peer = Some(tx);
        println!("transport #{} open", self.id);
        Ok(())
    }

    async fn write(&mut self, message: Message) -> Result<(), TransportError> {
        match &self.peer {
            Some(peer) => peer
                .send(message)
                .await
                .map_err(|_| TransportError::ConnectionClosed),
            None => Err(TransportError::ConnectionClosed),
        }
    }

    fn close(&mut self) {
        self.peer = None;
        self.close.cancel();
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    fn close_reason(&self) -> Option<TransportError> {
        self.reason.lock().unwrap().clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ids = AtomicU64::new(0);
    let factory = move |_: &CloseSignal, inbound: InboundSender| EchoConnection {
        id: ids.fetch_add(1, Ordering::Relaxed),
        inbound,
        peer: None,
        close: CloseSignal::new(),
        reason: Arc::new(Mutex::new(None)),
    };

    let config = HandlerConfig::builder()
        .name("echo")
        .reconnect(
            ReconnectPolicy::builder()
                .unlimited_retries()
                .healthy_duration(Duration::from_secs(1))
                .build(),
        )
        .reopen(ReopenPolicy::every(Duration::from_secs(5)))
        .heartbeat(HeartbeatPolicy::builder().passive().build())
        .build();

    let client = Client::new(
        factory,
        |_: &ClientHandle, message: Message| {
            println!("echoed: {}", String::from_utf8_lossy(message.payload()));
        },
        |_: &ClientHandle, event: EventKind| println!("event: {event}"),
        config,
    );

    client.open(CloseSignal::new()).await?;
    for n in 0..12 {
        client.send(Message::data(format!("message {n}"))).await?;
        tokio::time::sleep(Duration::from_millis(700)).await;
    }
    client.close();
    client.close_signal().cancelled().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
