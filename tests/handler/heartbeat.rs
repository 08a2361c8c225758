use std::time::Duration;

use socket_resilience_core::{CloseSignal, Message, MessageKind};
use socket_resilience_policy::HeartbeatPolicy;

use super::{config, handler, WAIT};
use crate::common::{eventually, mock};

#[tokio::test(start_paused = true)]
async fn active_heartbeat_sends_pings() {
    let (factory, script) = mock();
    let heartbeat = HeartbeatPolicy::builder()
        .active(Duration::from_secs(5))
        .build();
    let (handler, _) = handler(factory, config().heartbeat(heartbeat).build());

    handler.connect(CloseSignal::new()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;

    assert_eq!(script.writes_of(MessageKind::Ping).len(), 3);
    handler.close();
}

#[tokio::test(start_paused = true)]
async fn disabled_heartbeat_sends_nothing() {
    let (factory, script) = mock();
    let heartbeat = HeartbeatPolicy::builder()
        .active(Duration::from_secs(5))
        .enabled(false)
        .build();
    let (handler, _) = handler(factory, config().heartbeat(heartbeat).build());

    handler.connect(CloseSignal::new()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(script.writes().is_empty());
    handler.close();
}

#[tokio::test]
async fn passive_heartbeat_answers_routed_pings() {
    let (factory, script) = mock();
    let heartbeat = HeartbeatPolicy::builder().passive().build();
    let (handler, received) = handler(factory, config().heartbeat(heartbeat).build());

    handler.connect(CloseSignal::new()).await.unwrap();
    handler
        .client()
        .route_control(Message::new(MessageKind::Ping, "probe"))
        .unwrap();

    eventually(WAIT, || !script.writes_of(MessageKind::Pong).is_empty()).await;
    assert_eq!(
        script.writes_of(MessageKind::Pong),
        vec![Message::pong("probe")]
    );
    assert!(received.lock().unwrap().is_empty());
    handler.close();
}

#[tokio::test]
async fn pings_are_ignored_without_passive_mode() {
    let (factory, script) = mock();
    let (handler, _) = handler(factory, config().build());

    handler.connect(CloseSignal::new()).await.unwrap();
    handler.client().route_control(Message::ping()).unwrap();
    handler.send(Message::data("marker")).await.unwrap();

    eventually(WAIT, || !script.writes().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(script.writes(), vec![Message::data("marker")]);
    handler.close();
}
