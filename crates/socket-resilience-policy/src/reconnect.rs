//! Reconnection policy: whether to redial, how often, and how patiently.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};

/// Configuration read by the handler whenever a dial fails or a transport closes.
///
/// `max_retries` bounds the failed dial attempts tolerated within one dial
/// call: with `Some(2)` a third consecutive failure is returned to the caller.
/// `Some(0)` fails on the first error. `None` retries forever.
#[derive(Clone)]
pub struct ReconnectPolicy {
    enabled: bool,
    max_retries: Option<u32>,
    healthy_duration: Duration,
    backoff: Arc<dyn IntervalFunction>,
}

impl ReconnectPolicy {
    /// Creates a new builder. The built policy is enabled unless told otherwise.
    pub fn builder() -> ReconnectPolicyBuilder {
        ReconnectPolicyBuilder::new()
    }

    /// A policy that never redials.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retries: Some(0),
            healthy_duration: Duration::ZERO,
            backoff: Arc::new(ExponentialBackoff::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Minimum uptime after which a closed connection counts as healthy.
    pub fn healthy_duration(&self) -> Duration {
        self.healthy_duration
    }

    /// Returns `true` once `failures` failed attempts exceed the retry budget.
    pub fn retries_exhausted(&self, failures: u32) -> bool {
        self.max_retries.is_some_and(|max| failures > max)
    }

    /// Wait before dial attempt number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff.next_interval(attempt)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for ReconnectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectPolicy")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("healthy_duration", &self.healthy_duration)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`ReconnectPolicy`].
pub struct ReconnectPolicyBuilder {
    enabled: bool,
    max_retries: Option<u32>,
    healthy_duration: Duration,
    backoff: Option<Arc<dyn IntervalFunction>>,
}

impl ReconnectPolicyBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - enabled: true
    /// - max_retries: 0
    /// - healthy_duration: zero
    /// - backoff: [`ExponentialBackoff`] in seconds
    pub fn new() -> Self {
        Self {
            enabled: true,
            max_retries: Some(0),
            healthy_duration: Duration::ZERO,
            backoff: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets how many failed attempts one dial call tolerates before giving up.
    ///
    /// # Examples
    ///
    /// ```
    /// use socket_resilience_policy::ReconnectPolicy;
    ///
    /// let policy = ReconnectPolicy::builder().max_retries(10).build();
    /// assert!(!policy.retries_exhausted(10));
    /// assert!(policy.retries_exhausted(11));
    /// ```
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Retries forever.
    pub fn unlimited_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the uptime after which a closed connection resets backoff escalation.
    pub fn healthy_duration(mut self, threshold: Duration) -> Self {
        self.healthy_duration = threshold;
        self
    }

    /// Sets a custom backoff.
    pub fn backoff<I>(mut self, backoff: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Waits `interval` before every retry.
    pub fn fixed_backoff(self, interval: Duration) -> Self {
        self.backoff(FixedInterval::new(interval))
    }

    pub fn build(self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.enabled,
            max_retries: self.max_retries,
            healthy_duration: self.healthy_duration,
            backoff: self
                .backoff
                .unwrap_or_else(|| Arc::new(ExponentialBackoff::new())),
        }
    }
}

impl Default for ReconnectPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReconnectPolicyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectPolicyBuilder")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("healthy_duration", &self.healthy_duration)
            .field("custom_backoff", &self.backoff.is_some())
            .finish()
    }
}
