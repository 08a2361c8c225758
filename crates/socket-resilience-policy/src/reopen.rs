//! Proactive connection rotation.

use std::time::Duration;

/// Rotates the transport every `interval`, whether or not it is healthy.
///
/// The policy only stores the period. The handler's loop owns the running
/// timer, so one policy value can configure any number of handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReopenPolicy {
    enabled: bool,
    interval: Duration,
}

impl ReopenPolicy {
    /// Rotates every `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            enabled: true,
            interval,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            interval: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The rotation period, or `None` when reopening is off.
    ///
    /// A zero period is treated as off.
    pub fn interval(&self) -> Option<Duration> {
        (self.enabled && !self.interval.is_zero()).then_some(self.interval)
    }
}

impl Default for ReopenPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
