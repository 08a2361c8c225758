//! Property tests for reconnect accounting.
//!
//! Invariants tested:
//! - The retry budget is exhausted exactly when failures exceed max_retries
//! - Unlimited policies are never exhausted
//! - Dialing makes exactly max_retries + 1 attempts before giving up

use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::Builder;

use socket_resilience_core::{CloseSignal, Connection, InboundSender, Message, TransportError};
use socket_resilience_handler::{ClientHandle, ConnectionError, ConnectionHandler, HandlerConfig};
use socket_resilience_policy::ReconnectPolicy;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: exhausted iff failures > max_retries
    #[test]
    fn budget_boundary(max in 0u32..1_000, failures in 0u32..2_000) {
        let policy = ReconnectPolicy::builder().max_retries(max).build();
        prop_assert_eq!(policy.retries_exhausted(failures), failures > max);
    }

    /// Property: an unlimited policy never runs out
    #[test]
    fn unlimited_never_exhausted(failures in any::<u32>()) {
        let policy = ReconnectPolicy::builder().unlimited_retries().build();
        prop_assert!(!policy.retries_exhausted(failures));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: a dial that always fails makes max_retries + 1 attempts
    #[test]
    fn dial_attempts_match_budget(max in 0u32..6) {
        let rt = Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        rt.block_on(async {
            let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
            let factory = {
                let attempts = std::sync::Arc::clone(&attempts);
                move |_: &CloseSignal, _: InboundSender| {
                    attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    AlwaysRefused
                }
            };
            let policy = ReconnectPolicy::builder()
                .max_retries(max)
                .fixed_backoff(Duration::from_millis(1))
                .build();
            let handler = ConnectionHandler::new(
                factory,
                |_: &ClientHandle, _: Message| {},
                Default::default(),
                HandlerConfig::builder().reconnect(policy).build(),
            );

            let err = handler.connect(CloseSignal::new()).await.unwrap_err();
            let expected = max + 1;
            assert!(matches!(err, ConnectionError::Dial { attempts, .. } if attempts == expected));
            assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), expected);
        });
    }
}

/// Transport whose dial always fails with a terminated connection.
struct AlwaysRefused;

impl Connection for AlwaysRefused {
    async fn open(&mut self, _ctx: &CloseSignal) -> Result<(), TransportError> {
        Err(TransportError::Terminated)
    }

    async fn write(&mut self, _message: Message) -> Result<(), TransportError> {
        Err(TransportError::ConnectionClosed)
    }

    fn close(&mut self) {}

    fn close_signal(&self) -> CloseSignal {
        CloseSignal::new()
    }

    fn close_reason(&self) -> Option<TransportError> {
        None
    }
}
