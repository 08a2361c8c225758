use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket_resilience_core::{CloseSignal, Message, MessageKind, TransportError};
use socket_resilience_handler::{Client, ClientHandle, EventKind};
use socket_resilience_policy::{HeartbeatPolicy, ReconnectPolicy};

use super::{config, WAIT};
use crate::common::{eventually, mock, MockFactory};

struct Recorded {
    client: Client<MockFactory>,
    messages: Arc<Mutex<Vec<Message>>>,
    events: Arc<Mutex<Vec<EventKind>>>,
}

fn client(factory: MockFactory, config: socket_resilience_handler::HandlerConfig) -> Recorded {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let on_message = {
        let messages = Arc::clone(&messages);
        move |_: &ClientHandle, message: Message| messages.lock().unwrap().push(message)
    };
    let on_event = {
        let events = Arc::clone(&events);
        move |_: &ClientHandle, event: EventKind| events.lock().unwrap().push(event)
    };
    Recorded {
        client: Client::new(factory, on_message, on_event, config),
        messages,
        events,
    }
}

#[tokio::test]
async fn data_goes_to_the_app_and_pings_are_answered() {
    let (factory, script) = mock();
    let heartbeat = HeartbeatPolicy::builder().passive().build();
    let recorded = client(factory, config().heartbeat(heartbeat).build());

    recorded.client.open(CloseSignal::new()).await.unwrap();
    script.deliver(Message::data("quote")).await.unwrap();
    script
        .deliver(Message::new(MessageKind::Ping, "hb"))
        .await
        .unwrap();
    script.deliver(Message::close()).await.unwrap();

    eventually(WAIT, || !script.writes_of(MessageKind::Pong).is_empty()).await;
    assert_eq!(script.writes(), vec![Message::pong("hb")]);
    assert_eq!(
        recorded.messages.lock().unwrap().as_slice(),
        &[Message::data("quote")]
    );
    recorded.client.close();
}

#[tokio::test]
async fn lifecycle_events_reach_the_event_sink() {
    let (factory, script) = mock();
    let policy = ReconnectPolicy::builder().unlimited_retries().build();
    let recorded = client(factory, config().reconnect(policy).build());

    recorded.client.open(CloseSignal::new()).await.unwrap();
    assert_eq!(recorded.events.lock().unwrap().as_slice(), &[EventKind::Connect]);

    script.sever(TransportError::ConnectionClosed);
    eventually(WAIT, || {
        recorded.events.lock().unwrap().contains(&EventKind::Reconnect)
    })
    .await;

    recorded.client.close();
    eventually(WAIT, || recorded.events.lock().unwrap().contains(&EventKind::Close)).await;
    assert_eq!(
        recorded.events.lock().unwrap().as_slice(),
        &[EventKind::Connect, EventKind::Reconnect, EventKind::Close]
    );
    assert_eq!(script.dial_count(), 2);
}

#[tokio::test]
async fn opening_twice_does_not_duplicate_events() {
    let (factory, script) = mock();
    let recorded = client(factory, config().build());

    recorded.client.open(CloseSignal::new()).await.unwrap();
    recorded.client.open(CloseSignal::new()).await.unwrap();
    recorded.client.close();
    eventually(WAIT, || recorded.client.state().is_closed()).await;

    assert_eq!(
        recorded.events.lock().unwrap().as_slice(),
        &[EventKind::Connect, EventKind::Close]
    );
    assert_eq!(script.dial_count(), 1);
}

#[tokio::test]
async fn event_sink_can_reply_through_the_handle() {
    let (factory, script) = mock();
    let on_event = |client: &ClientHandle, event: EventKind| {
        if event == EventKind::Connect {
            client.try_send(Message::data("subscribe")).unwrap();
        }
    };
    let client = Client::new(
        factory,
        |_: &ClientHandle, _: Message| {},
        on_event,
        config().build(),
    );

    client.open(CloseSignal::new()).await.unwrap();

    eventually(WAIT, || script.writes() == vec![Message::data("subscribe")]).await;
    client.close();
}

#[tokio::test]
async fn message_sink_can_close_the_client() {
    let (factory, script) = mock();
    let client = Client::new(
        factory,
        |client: &ClientHandle, message: Message| {
            if message.payload() == b"bye" {
                client.close();
            }
        },
        |_: &ClientHandle, _: EventKind| {},
        config().build(),
    );

    client.open(CloseSignal::new()).await.unwrap();
    script.deliver(Message::data("bye")).await.unwrap();

    tokio::time::timeout(WAIT, client.close_signal().cancelled())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.close_reason().is_none());
}
