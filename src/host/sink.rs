//! # Message sinks.
//!
//! Retrieval failures are reported out-of-band: the retriever appends
//! diagnostics to a [`MessageSink`] and returns a failure outcome. The sink is
//! append-only from the engine's point of view and must be thread-safe.

use std::sync::{Mutex, PoisonError};

use crate::compile::{Diagnostic, Severity};

/// Append-only channel for human-readable diagnostics.
pub trait MessageSink: Send + Sync + 'static {
    /// Appends a single diagnostic.
    fn push(&self, diagnostic: Diagnostic);

    /// Appends a batch of diagnostics as one unit.
    ///
    /// The default pushes them one by one; implementations that can append
    /// atomically should override it.
    fn extend(&self, diagnostics: &[Diagnostic]) {
        for d in diagnostics {
            self.push(d.clone());
        }
    }
}

/// In-memory [`MessageSink`] that keeps every diagnostic in arrival order.
///
/// ## Example
/// ```rust
/// use livecompile::{Diagnostic, MessageLog, MessageSink, Severity};
///
/// let log = MessageLog::new();
/// log.push(Diagnostic::error("boom"));
/// log.push(Diagnostic::warning("hmm"));
/// assert_eq!(log.messages(Severity::Error), vec!["boom".to_string()]);
/// assert_eq!(log.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of the given severity, oldest first.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageSink for MessageLog {
    fn push(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }

    fn extend(&self, diagnostics: &[Diagnostic]) {
        self.lock().extend_from_slice(diagnostics);
    }
}
