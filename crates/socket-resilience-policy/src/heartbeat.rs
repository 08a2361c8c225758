//! Keep-alive configuration.
//!
//! Active mode writes a ping on a fixed interval. Passive mode answers pings
//! from the peer with a pong. Either can be engaged independently, and
//! neither does anything unless the policy as a whole is enabled.

use std::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// Keep-alive modes engaged on a [`HeartbeatPolicy`].
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeepAlive: u8 {
        /// Send pings on an interval.
        const ACTIVE = 1;

        /// Reply to pings with pongs.
        const PASSIVE = 1 << 1;
    }
}

/// Active-mode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHeartbeat {
    interval: Duration,
}

impl ActiveHeartbeat {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Marker for passive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassiveHeartbeat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    enabled: bool,
    modes: KeepAlive,
    active: Option<ActiveHeartbeat>,
    passive: Option<PassiveHeartbeat>,
}

impl HeartbeatPolicy {
    pub fn builder() -> HeartbeatPolicyBuilder {
        HeartbeatPolicyBuilder::new()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            modes: KeepAlive::empty(),
            active: None,
            passive: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn modes(&self) -> KeepAlive {
        self.modes
    }

    /// Returns `true` if the handler should send pings on its own.
    pub fn is_active(&self) -> bool {
        self.active_interval().is_some()
    }

    /// Returns `true` if pings from the peer should be answered.
    pub fn is_passive(&self) -> bool {
        self.enabled && self.modes.contains(KeepAlive::PASSIVE) && self.passive.is_some()
    }

    /// The ping period when active mode is engaged with a non-zero interval.
    pub fn active_interval(&self) -> Option<Duration> {
        if !self.enabled || !self.modes.contains(KeepAlive::ACTIVE) {
            return None;
        }
        self.active
            .map(|active| active.interval())
            .filter(|interval| !interval.is_zero())
    }
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Builder for [`HeartbeatPolicy`].
#[derive(Debug, Clone)]
pub struct HeartbeatPolicyBuilder {
    policy: HeartbeatPolicy,
}

impl HeartbeatPolicyBuilder {
    /// Starts from an enabled policy with no mode engaged.
    pub fn new() -> Self {
        Self {
            policy: HeartbeatPolicy {
                enabled: true,
                ..HeartbeatPolicy::disabled()
            },
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.policy.enabled = enabled;
        self
    }

    /// Engages active mode, pinging every `interval`.
    pub fn active(mut self, interval: Duration) -> Self {
        self.policy.modes |= KeepAlive::ACTIVE;
        self.policy.active = Some(ActiveHeartbeat::new(interval));
        self
    }

    /// Engages passive mode.
    pub fn passive(mut self) -> Self {
        self.policy.modes |= KeepAlive::PASSIVE;
        self.policy.passive = Some(PassiveHeartbeat);
        self
    }

    pub fn build(self) -> HeartbeatPolicy {
        self.policy
    }
}

impl Default for HeartbeatPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
