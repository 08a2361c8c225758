//! Resilience policies for a socket connection handler.
//!
//! Every policy is an immutable snapshot built before the handler connects:
//!
//! - [`ReconnectPolicy`]: redial on failure, with a retry budget, a
//!   healthy-duration threshold, and a pluggable backoff
//! - [`ReopenPolicy`]: rotate the transport on a fixed interval
//! - [`HeartbeatPolicy`]: active pings and/or passive pong replies
//!
//! All three default to disabled.
//!
//! # Examples
//!
//! ```rust
//! use socket_resilience_policy::{
//!     ExponentialBackoff, HeartbeatPolicy, ReconnectPolicy, ReopenPolicy,
//! };
//! use std::time::Duration;
//!
//! let reconnect = ReconnectPolicy::builder()
//!     .max_retries(10)
//!     .healthy_duration(Duration::from_secs(1))
//!     .backoff(ExponentialBackoff::new())
//!     .build();
//!
//! let reopen = ReopenPolicy::every(Duration::from_secs(60));
//!
//! let heartbeat = HeartbeatPolicy::builder()
//!     .active(Duration::from_secs(15))
//!     .build();
//!
//! assert!(reconnect.is_enabled() && reopen.is_enabled() && heartbeat.is_active());
//! ```

mod backoff;
mod heartbeat;
mod reconnect;
mod reopen;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use heartbeat::{
    ActiveHeartbeat, HeartbeatPolicy, HeartbeatPolicyBuilder, KeepAlive, PassiveHeartbeat,
};
pub use reconnect::{ReconnectPolicy, ReconnectPolicyBuilder};
pub use reopen::ReopenPolicy;
