//! # Events emitted by the engine, its supervisor loop and compile attempts.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: engine start/stop and grace handling
//! - **Attempt events**: source change detection and attempt outcomes
//! - **Retrieval events**: outcome of each retrieval call
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, run id,
//! attempt generation, source text and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use livecompile::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::AttemptStarting)
//!     .with_run(1)
//!     .with_generation(3)
//!     .with_source("1+1");
//!
//! assert_eq!(ev.kind, EventKind::AttemptStarting);
//! assert_eq!(ev.generation, Some(3));
//! assert_eq!(ev.source.as_deref(), Some("1+1"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// Supervisor loop spawned.
    ///
    /// Sets:
    /// - `run`: run id
    EngineStarted,

    /// Supervisor loop exited and in-flight attempts were drained.
    ///
    /// Sets:
    /// - `run`: run id
    EngineStopped,

    /// In-flight attempts outlived the stop grace period and were abandoned.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `elapsed_ms`: configured grace (ms)
    /// - `reason`: number of abandoned attempts
    GraceExceeded,

    // === Attempt events ===
    /// Supervisor observed new, non-empty source text.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `source`: new text
    SourceChanged,

    /// A compile attempt is about to run.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `generation`: attempt generation
    /// - `source`: snapshot compiled by the attempt
    AttemptStarting,

    /// A running attempt was cancelled because newer source arrived.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `generation`: superseded attempt generation
    AttemptSuperseded,

    /// Attempt result was stored in the result slot.
    ///
    /// Sets:
    /// - `generation`, `source`
    /// - `elapsed_ms`: time spent inside the compiler
    /// - `reason`: `"ok"` or `"diagnostics"`
    AttemptPublished,

    /// Attempt finished but its result was dropped (cancelled or superseded).
    ///
    /// Sets:
    /// - `generation`, `source`
    /// - `elapsed_ms`: time spent inside the compiler
    /// - `reason`: why it was dropped
    AttemptDiscarded,

    /// The compiler panicked; the panic was converted into a diagnostic.
    ///
    /// Sets:
    /// - `generation`, `source`
    /// - `reason`: panic payload
    CompilerPanicked,

    // === Retrieval events ===
    /// Retrieval found a successful artifact.
    ///
    /// Sets:
    /// - `source`, `generation`
    /// - `elapsed_ms`: time spent waiting
    RetrieveMatched,

    /// Retrieval found an artifact carrying diagnostics.
    ///
    /// Sets:
    /// - `source`, `generation`
    /// - `elapsed_ms`: time spent waiting
    /// - `reason`: first diagnostic message
    RetrieveFailed,

    /// Retrieval deadline elapsed without a match.
    ///
    /// Sets:
    /// - `source`
    /// - `elapsed_ms`: time spent waiting
    RetrieveTimedOut,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Supervisor run the event belongs to.
    pub run: Option<u64>,
    /// Compile attempt generation.
    pub generation: Option<u64>,
    /// Source text involved (snapshot or requested code).
    pub source: Option<Arc<str>>,
    /// Duration in milliseconds (compile time, wait time, grace).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the subscriber for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            run: None,
            generation: None,
            source: None,
            elapsed_ms: None,
            reason: None,
            subscriber: None,
        }
    }

    #[inline]
    pub fn with_run(mut self, run: u64) -> Self {
        self.run = Some(run);
        self
    }

    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }
}
