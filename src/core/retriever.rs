//! # Bounded-wait lookup of a compiled artifact.
//!
//! [`Retriever`] waits until the result slot holds an artifact compiled from
//! exactly the requested code, or until a deadline passes.
//!
//! ## Flow
//! ```text
//! retrieve_within(code, timeout)
//! loop {
//!   ├─► arm publish wakeup
//!   ├─► slot.try_match(code)
//!   │     ├─ success artifact     → RetrieveMatched, Ok(artifact)
//!   │     └─ diagnostics artifact → sink.extend(diagnostics), RetrieveFailed,
//!   │                               Err(Diagnostics)
//!   ├─► deadline passed → sink.push(timeout diagnostic), RetrieveTimedOut,
//!   │                     Err(Timeout)
//!   └─► wait for publish wakeup or min(retrieve_poll, time left)
//! }
//! ```
//!
//! ## Rules
//! - Never returns an artifact whose source differs from `code`.
//! - Returns within `timeout + retrieve_poll` in the worst case.
//! - A timeout too large for the clock waits without a deadline.
//! - Each failing call appends exactly one batch of diagnostics to the sink.
//! - Any number of retrievals may run concurrently; they only read the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::compile::{CompiledArtifact, Diagnostic};
use crate::core::slot::ResultSlot;
use crate::error::RetrieveError;
use crate::events::{Bus, Event, EventKind};
use crate::host::MessageSink;

/// Cloneable handle for waiting on compile results.
///
/// Obtained from [`Engine::retriever`](crate::Engine::retriever). It does not
/// keep the supervisor alive; it only shares the result slot, the message
/// sink and the event bus.
pub struct Retriever<T> {
    slot: Arc<ResultSlot<T>>,
    sink: Arc<dyn MessageSink>,
    bus: Bus,
    poll: Duration,
    timeout: Duration,
}

impl<T> Clone for Retriever<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            sink: Arc::clone(&self.sink),
            bus: self.bus.clone(),
            poll: self.poll,
            timeout: self.timeout,
        }
    }
}

impl<T> Retriever<T> {
    pub(crate) fn new(
        slot: Arc<ResultSlot<T>>,
        sink: Arc<dyn MessageSink>,
        bus: Bus,
        poll: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            slot,
            sink,
            bus,
            poll,
            timeout,
        }
    }

    /// Default deadline used by [`retrieve`](Self::retrieve).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits up to the configured timeout for an artifact compiled from `code`.
    pub async fn retrieve(&self, code: &str) -> Result<Arc<CompiledArtifact<T>>, RetrieveError> {
        self.retrieve_within(code, self.timeout).await
    }

    /// Waits up to `timeout` for an artifact compiled from `code`.
    ///
    /// On failure the diagnostics (or a timeout message) have already been
    /// appended to the message sink when this returns.
    pub async fn retrieve_within(
        &self,
        code: &str,
        timeout: Duration,
    ) -> Result<Arc<CompiledArtifact<T>>, RetrieveError> {
        let started = Instant::now();
        // `None` when the timeout overflows the clock: wait without a deadline.
        let deadline = started.checked_add(timeout);

        loop {
            let published = self.slot.published();
            tokio::pin!(published);
            published.as_mut().enable();

            if let Some(artifact) = self.slot.try_match(code) {
                return self.settle(artifact, started.elapsed());
            }

            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                let err = RetrieveError::Timeout {
                    code: code.to_string(),
                    timeout,
                };
                self.sink.push(Diagnostic::error(err.as_message()));
                self.bus.publish(
                    Event::new(EventKind::RetrieveTimedOut)
                        .with_source(code)
                        .with_elapsed(now - started),
                );
                return Err(err);
            }

            let nap = match deadline {
                Some(d) => self.poll.min(d - now),
                None => self.poll,
            };
            tokio::select! {
                _ = &mut published => {}
                _ = time::sleep(nap) => {}
            }
        }
    }

    /// Turns a matched artifact into the caller-visible outcome.
    fn settle(
        &self,
        artifact: Arc<CompiledArtifact<T>>,
        waited: Duration,
    ) -> Result<Arc<CompiledArtifact<T>>, RetrieveError> {
        let ev = |kind| {
            Event::new(kind)
                .with_source(artifact.source())
                .with_generation(artifact.generation())
                .with_elapsed(waited)
        };

        if artifact.is_success() {
            self.bus.publish(ev(EventKind::RetrieveMatched));
            return Ok(artifact);
        }

        let diagnostics = artifact.diagnostics();
        self.sink.extend(diagnostics);
        self.bus.publish(
            ev(EventKind::RetrieveFailed).with_reason(diagnostics[0].message.as_str()),
        );
        Err(RetrieveError::Diagnostics {
            count: diagnostics.len(),
        })
    }
}
