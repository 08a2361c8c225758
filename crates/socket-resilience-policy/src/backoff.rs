//! Backoff strategies mapping a dial attempt number to a wait duration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng as _;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Computes how long to wait before a dial attempt.
///
/// Implementations must be pure and must tolerate `attempt == 0`.
pub trait IntervalFunction: Send + Sync {
    /// Returns the wait before attempt number `attempt`.
    fn next_interval(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: `floor((2^attempt - 1) / 2)` units.
///
/// With the default unit of one second this yields 0s, 0s, 1s, 3s, 7s, ...
/// for attempts 0, 1, 2, 3, 4 and grows without bound unless
/// [`max_interval`](Self::max_interval) is set.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    unit: Duration,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates the default backoff, counted in seconds.
    pub fn new() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_interval: None,
        }
    }

    /// Scales every interval by `unit` instead of one second.
    pub fn unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Caps every interval at `max`.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max_interval = Some(max);
        self
    }

    /// Number of units to wait before `attempt`, saturating for huge attempts.
    pub fn units_for(attempt: u32) -> u64 {
        if attempt >= u64::BITS {
            u64::MAX >> 1
        } else {
            ((1u64 << attempt) - 1) >> 1
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: u32) -> Duration {
        let nanos = self
            .unit
            .as_nanos()
            .saturating_mul(u128::from(Self::units_for(attempt)));
        let interval = match u64::try_from(nanos / NANOS_PER_SEC) {
            // remainder is always below one second
            Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        };

        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

/// The same wait before every attempt.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Exponential backoff with random jitter around each interval.
///
/// Each interval is drawn uniformly from
/// `[base * (1 - factor), base * (1 + factor)]`, where `base` comes from
/// [`ExponentialBackoff`].
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// `randomization_factor` is clamped to `0.0..=1.0`.
    pub fn new(base: ExponentialBackoff, randomization_factor: f64) -> Self {
        Self {
            base,
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: u32) -> Duration {
        let base = self.base.next_interval(attempt);
        if base.is_zero() || self.randomization_factor == 0.0 {
            return base;
        }

        let secs = base.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::try_from_secs_f64(jittered).unwrap_or(Duration::MAX)
    }
}

/// Backoff computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: u32) -> Duration {
        (self.f)(attempt)
    }
}

impl<F> fmt::Debug for FnInterval<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnInterval")
    }
}

impl<T> IntervalFunction for Arc<T>
where
    T: IntervalFunction + ?Sized,
{
    fn next_interval(&self, attempt: u32) -> Duration {
        (**self).next_interval(attempt)
    }
}
