use std::sync::Arc;
use std::time::Duration;

use socket_resilience_policy::{HeartbeatPolicy, ReconnectPolicy, ReopenPolicy};

/// Default capacity of the inbound and outbound message queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Capacity of the queue carrying control frames back into the loop.
pub const CONTROL_QUEUE_CAPACITY: usize = 16;

/// Wait between retries when the peer refuses the dial outright.
pub const CANNOT_CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration for a [`ConnectionHandler`](crate::ConnectionHandler).
///
/// Immutable once the handler is built.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub(crate) name: Arc<str>,
    pub(crate) inbound_capacity: usize,
    pub(crate) outbound_capacity: usize,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) reopen: ReopenPolicy,
    pub(crate) heartbeat: HeartbeatPolicy,
}

impl HandlerConfig {
    /// Creates a new builder.
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::default()
    }

    /// Name used in logs, metrics labels, and events.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inbound_capacity(&self) -> usize {
        self.inbound_capacity
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    pub fn reconnect(&self) -> &ReconnectPolicy {
        &self.reconnect
    }

    pub fn reopen(&self) -> &ReopenPolicy {
        &self.reopen
    }

    pub fn heartbeat(&self) -> &HeartbeatPolicy {
        &self.heartbeat
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfigBuilder::default().build()
    }
}

/// Builder for [`HandlerConfig`].
#[derive(Debug, Clone)]
pub struct HandlerConfigBuilder {
    name: String,
    inbound_capacity: usize,
    outbound_capacity: usize,
    reconnect: ReconnectPolicy,
    reopen: ReopenPolicy,
    heartbeat: HeartbeatPolicy,
}

impl Default for HandlerConfigBuilder {
    fn default() -> Self {
        Self {
            name: String::from("<unnamed>"),
            inbound_capacity: DEFAULT_QUEUE_CAPACITY,
            outbound_capacity: DEFAULT_QUEUE_CAPACITY,
            reconnect: ReconnectPolicy::disabled(),
            reopen: ReopenPolicy::disabled(),
            heartbeat: HeartbeatPolicy::disabled(),
        }
    }
}

impl HandlerConfigBuilder {
    /// Sets the handler name.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the inbound queue capacity. Values below one are raised to one.
    ///
    /// Default: 32
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity.max(1);
        self
    }

    /// Sets the outbound queue capacity. Values below one are raised to one.
    ///
    /// Default: 32
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Default: disabled
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Default: disabled
    pub fn reopen(mut self, policy: ReopenPolicy) -> Self {
        self.reopen = policy;
        self
    }

    /// Default: disabled
    pub fn heartbeat(mut self, policy: HeartbeatPolicy) -> Self {
        self.heartbeat = policy;
        self
    }

    pub fn build(self) -> HandlerConfig {
        HandlerConfig {
            name: Arc::from(self.name),
            inbound_capacity: self.inbound_capacity,
            outbound_capacity: self.outbound_capacity,
            reconnect: self.reconnect,
            reopen: self.reopen,
            heartbeat: self.heartbeat,
        }
    }
}
