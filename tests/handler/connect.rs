use std::time::Duration;

use socket_resilience_core::{CloseSignal, TransportError};
use socket_resilience_handler::{ConnectionError, ConnectionState, EventKind};
use socket_resilience_policy::{FixedInterval, ReconnectPolicy};

use super::{config, handler, record_events};
use crate::common::{mock, Dial};

#[tokio::test]
async fn connect_opens_transport_and_emits_connect() {
    let (factory, script) = mock();
    let (handler, _) = handler(factory, config().build());
    let events = record_events(handler.events());

    handler.connect(CloseSignal::new()).await.unwrap();

    assert_eq!(script.dial_count(), 1);
    assert!(handler.state().is_running());
    // emitted before connect returns
    assert_eq!(events.lock().unwrap().as_slice(), &[EventKind::Connect]);
    handler.close();
}

#[tokio::test]
async fn connect_without_reconnect_fails_after_one_attempt() {
    let (factory, script) = mock();
    script.fallback(Dial::Fail(TransportError::ConnectionClosed));
    let (handler, _) = handler(factory, config().build());
    let events = record_events(handler.events());

    let err = handler.connect(CloseSignal::new()).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Dial { attempts: 1, .. }));
    assert_eq!(script.dial_count(), 1);
    assert!(handler.is_closed());
    assert_eq!(handler.state(), ConnectionState::Closed);
    assert!(handler.close_reason().is_some_and(|reason| reason.is_dial()));
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connect_gives_up_once_retries_are_exhausted() {
    let (factory, script) = mock();
    script.fallback(Dial::Fail(TransportError::ConnectionClosed));
    let policy = ReconnectPolicy::builder().max_retries(2).build();
    let (handler, _) = handler(factory, config().reconnect(policy).build());

    let err = handler.connect(CloseSignal::new()).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Dial { attempts: 3, .. }));
    assert_eq!(script.dial_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn connect_succeeds_within_retry_budget() {
    let (factory, script) = mock();
    script.push([
        Dial::Fail(TransportError::Terminated),
        Dial::Fail(TransportError::Terminated),
    ]);
    let policy = ReconnectPolicy::builder().max_retries(2).build();
    let (handler, _) = handler(factory, config().reconnect(policy).build());

    handler.connect(CloseSignal::new()).await.unwrap();

    assert_eq!(script.dial_count(), 3);
    // exponential backoff: attempt 1 waits 0s, attempt 2 waits 1s
    let offsets = script.dial_offsets();
    assert_eq!(offsets[1], Duration::ZERO);
    assert!(offsets[2] >= Duration::from_secs(1));
    assert!(offsets[2] < Duration::from_millis(1100));
    handler.close();
}

#[tokio::test(start_paused = true)]
async fn cannot_connect_retries_after_fixed_delay() {
    let (factory, script) = mock();
    script.push([
        Dial::Fail(TransportError::CannotConnect("refused".into())),
        Dial::Fail(TransportError::CannotConnect("refused".into())),
    ]);
    let policy = ReconnectPolicy::builder()
        .unlimited_retries()
        .backoff(FixedInterval::new(Duration::from_secs(60)))
        .build();
    let (handler, _) = handler(factory, config().reconnect(policy).build());

    handler.connect(CloseSignal::new()).await.unwrap();

    // the configured 60s backoff is bypassed for refused dials
    let offsets = script.dial_offsets();
    assert_eq!(offsets.len(), 3);
    assert!(offsets[1] >= Duration::from_secs(1) && offsets[1] < Duration::from_millis(1100));
    assert!(offsets[2] >= Duration::from_secs(2) && offsets[2] < Duration::from_millis(2100));
    handler.close();
}

#[tokio::test]
async fn second_connect_is_a_no_op() {
    let (factory, script) = mock();
    let (handler, _) = handler(factory, config().build());

    handler.connect(CloseSignal::new()).await.unwrap();
    handler.connect(CloseSignal::new()).await.unwrap();

    assert_eq!(script.dial_count(), 1);
    handler.close();
}

#[tokio::test(start_paused = true)]
async fn cancelling_ctx_aborts_pending_dial() {
    let (factory, script) = mock();
    script.fallback(Dial::Fail(TransportError::ConnectionClosed));
    let policy = ReconnectPolicy::builder()
        .unlimited_retries()
        .fixed_backoff(Duration::from_secs(5))
        .build();
    let (handler, _) = handler(factory, config().reconnect(policy).build());

    let ctx = CloseSignal::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        canceller.cancel();
    });

    let err = handler.connect(ctx).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Cancelled));
    // dials at 0s, 5s, 10s
    assert_eq!(script.dial_count(), 3);
    assert!(handler.is_closed());
}

#[tokio::test]
async fn connect_after_close_is_rejected() {
    let (factory, script) = mock();
    let (handler, _) = handler(factory, config().build());

    handler.close();
    assert_eq!(handler.state(), ConnectionState::Closed);

    let err = handler.connect(CloseSignal::new()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Closed));
    assert_eq!(script.dial_count(), 0);
}
