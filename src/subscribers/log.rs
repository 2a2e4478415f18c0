//! # LogWriter: renders engine events through `tracing`
//!
//! A minimal subscriber for development and demos. Install any `tracing`
//! subscriber (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output
//! ```text
//! INFO  engine started run=1
//! DEBUG source changed run=1 source="1+"
//! DEBUG attempt starting run=1 generation=2 source="1+"
//! DEBUG attempt superseded run=1 generation=1
//! INFO  attempt published generation=2 compile_ms=3 outcome="diagnostics"
//! WARN  retrieve failed source="1+" reason="unexpected end of expression"
//! WARN  retrieve timed out source="1+1" waited_ms=2000
//! INFO  engine stopped run=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let source = e.source.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::EngineStarted => tracing::info!(run = ?e.run, "engine started"),
            EventKind::EngineStopped => tracing::info!(run = ?e.run, "engine stopped"),
            EventKind::GraceExceeded => tracing::warn!(
                run = ?e.run,
                grace_ms = ?e.elapsed_ms,
                abandoned = reason,
                "stop grace exceeded"
            ),
            EventKind::SourceChanged => {
                tracing::debug!(run = ?e.run, source, "source changed")
            }
            EventKind::AttemptStarting => tracing::debug!(
                run = ?e.run,
                generation = ?e.generation,
                source,
                "attempt starting"
            ),
            EventKind::AttemptSuperseded => tracing::debug!(
                run = ?e.run,
                generation = ?e.generation,
                "attempt superseded"
            ),
            EventKind::AttemptPublished => tracing::info!(
                generation = ?e.generation,
                compile_ms = ?e.elapsed_ms,
                outcome = reason,
                "attempt published"
            ),
            EventKind::AttemptDiscarded => tracing::debug!(
                generation = ?e.generation,
                compile_ms = ?e.elapsed_ms,
                reason,
                "attempt discarded"
            ),
            EventKind::CompilerPanicked => tracing::error!(
                generation = ?e.generation,
                source,
                reason,
                "compiler panicked"
            ),
            EventKind::RetrieveMatched => tracing::debug!(
                source,
                generation = ?e.generation,
                waited_ms = ?e.elapsed_ms,
                "retrieve matched"
            ),
            EventKind::RetrieveFailed => tracing::warn!(source, reason, "retrieve failed"),
            EventKind::RetrieveTimedOut => {
                tracing::warn!(source, waited_ms = ?e.elapsed_ms, "retrieve timed out")
            }
            EventKind::SubscriberOverflow => tracing::warn!(
                subscriber = e.subscriber.unwrap_or("unknown"),
                reason,
                "subscriber overflow"
            ),
            EventKind::SubscriberPanicked => tracing::error!(
                subscriber = e.subscriber.unwrap_or("unknown"),
                reason,
                "subscriber panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
