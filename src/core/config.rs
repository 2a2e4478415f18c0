//! # Engine configuration.
//!
//! Provides [`EngineConfig`], the centralized timing settings of the engine.
//!
//! Config is used in two places:
//! 1. **Supervisor loop**: poll interval and stop grace
//! 2. **Retriever**: poll interval and default timeout
//!
//! ## Sentinel values
//! - `poll_interval = 0s` → clamped to 1ms (the loop never spins)
//! - `retrieve_poll = 0s` → clamped to 1ms
//! - `grace = 0s` → `stop()` does not wait for in-flight attempts
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

const MIN_POLL: Duration = Duration::from_millis(1);

/// Timing and capacity settings for an [`Engine`](crate::Engine).
///
/// ## Field semantics
/// - `poll_interval`: sleep between supervisor checks of the source text
/// - `retrieve_poll`: longest sleep between retriever checks of the result slot
/// - `retrieve_timeout`: default wall-clock deadline of [`Engine::retrieve`](crate::Engine::retrieve)
/// - `grace`: how long `stop()` waits for in-flight attempts
/// - `bus_capacity`: event bus ring buffer size
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Supervisor poll interval.
    ///
    /// The source provider has no change notification, so the supervisor
    /// re-reads it once per interval.
    pub poll_interval: Duration,

    /// Retriever poll interval.
    ///
    /// Publishing also wakes waiting retrievers, so this only bounds the
    /// latency when a wakeup is missed.
    pub retrieve_poll: Duration,

    /// Default retrieval deadline.
    ///
    /// A retrieval that sees no matching artifact within this window reports a
    /// timeout diagnostic and fails.
    pub retrieve_timeout: Duration,

    /// Maximum time `stop()` waits for in-flight attempts.
    ///
    /// Attempts still running afterwards are cancelled (they can no longer
    /// publish) and abandoned to the blocking pool.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Supervisor poll interval, at least 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(MIN_POLL)
    }

    /// Retriever poll interval, at least 1ms.
    #[inline]
    pub fn retrieve_poll_clamped(&self) -> Duration {
        self.retrieve_poll.max(MIN_POLL)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `poll_interval = 1ms`
    /// - `retrieve_poll = 10ms`
    /// - `retrieve_timeout = 2s`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            retrieve_poll: Duration::from_millis(10),
            retrieve_timeout: Duration::from_secs(2),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
