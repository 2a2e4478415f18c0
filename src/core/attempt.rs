//! # One compile of one source snapshot.
//!
//! A [`CompileAttempt`] runs the black-box compiler on a fixed snapshot from a
//! blocking thread and tries to publish exactly once.
//!
//! ## Flow
//! ```text
//! run()
//!   ├─► catch_unwind { parse(snapshot) → compile(parsed) }
//!   │       ├─ Ok(output)            → artifact (success)
//!   │       ├─ Err(Diagnostics)      → artifact (diagnostics)
//!   │       ├─ Err(Canceled)         → AttemptDiscarded, return
//!   │       └─ panic                 → CompilerPanicked, artifact (diagnostic)
//!   └─► slot.publish(artifact, token)   (guard checked under the slot lock)
//!           ├─ Published             → AttemptPublished
//!           └─ Cancelled/Superseded  → AttemptDiscarded
//! ```
//!
//! ## Cancellation
//! Two prongs, both driven by the supervisor through [`AttemptHandle`]:
//! - the attempt's token is cancelled; compilers that poll it stop early, and
//!   the publish guard refuses the write either way;
//! - the blocking task is aborted, which only has an effect if it has not
//!   started yet. A compile already running is abandoned, never killed: it
//!   keeps its thread until the compiler returns.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::compile::{CompileError, CompiledArtifact, Compiler, Diagnostic};
use crate::core::slot::{PublishOutcome, ResultSlot};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;

/// A single cancellable compile of `source`.
pub(crate) struct CompileAttempt {
    generation: u64,
    source: Arc<str>,
    token: CancellationToken,
}

impl CompileAttempt {
    pub(crate) fn new(generation: u64, source: Arc<str>) -> Self {
        Self {
            generation,
            source,
            token: CancellationToken::new(),
        }
    }

    /// Token the supervisor keeps to cancel this attempt later.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs the compiler and publishes the artifact unless cancelled.
    ///
    /// Blocking: call it from `spawn_blocking`.
    pub(crate) fn run<C: Compiler>(
        self,
        compiler: &C,
        slot: &ResultSlot<C::Output>,
        bus: &Bus,
    ) -> PublishOutcome {
        let started = Instant::now();
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let parsed = compiler.parse(&self.source, &self.token)?;
            compiler.compile(parsed, &self.token)
        }));
        let elapsed = started.elapsed();

        let artifact = match res {
            Ok(Ok(output)) => {
                CompiledArtifact::compiled(self.source.clone(), self.generation, output)
            }
            Ok(Err(CompileError::Diagnostics(diagnostics))) => {
                CompiledArtifact::failed(self.source.clone(), self.generation, diagnostics)
            }
            Ok(Err(CompileError::Canceled)) => {
                bus.publish(
                    self.event(EventKind::AttemptDiscarded)
                        .with_elapsed(elapsed)
                        .with_reason("compiler_cancelled"),
                );
                return PublishOutcome::Cancelled;
            }
            Err(payload) => {
                let info = panic_message(&*payload);
                bus.publish(self.event(EventKind::CompilerPanicked).with_reason(info.as_str()));
                CompiledArtifact::failed(
                    self.source.clone(),
                    self.generation,
                    vec![Diagnostic::error(format!("compiler panicked: {info}"))],
                )
            }
        };

        let outcome_label = if artifact.is_success() {
            "ok"
        } else {
            "diagnostics"
        };
        let outcome = slot.publish(artifact, &self.token);
        let ev = match outcome {
            PublishOutcome::Published => self
                .event(EventKind::AttemptPublished)
                .with_reason(outcome_label),
            PublishOutcome::Cancelled | PublishOutcome::Superseded => self
                .event(EventKind::AttemptDiscarded)
                .with_reason(outcome.as_str()),
        };
        bus.publish(ev.with_elapsed(elapsed));
        outcome
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_generation(self.generation)
            .with_source(self.source.clone())
    }
}

/// Supervisor-side reference to a spawned attempt.
pub(crate) struct AttemptHandle {
    pub(crate) generation: u64,
    pub(crate) token: CancellationToken,
    pub(crate) abort: AbortHandle,
}

impl AttemptHandle {
    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Cancels the attempt: flag first, then abort if it never started.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
        self.abort.abort();
    }
}
