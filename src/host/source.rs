//! # Source-text providers.
//!
//! The supervisor polls [`SourceProvider::current`] once per poll interval.
//! An empty string means "nothing to compile"; any other value that differs
//! from the last compiled text starts a new attempt.

use std::sync::Arc;

use tokio::sync::watch;

/// Read access to a continuously edited source string.
pub trait SourceProvider: Send + Sync + 'static {
    /// Returns the current source text (`""` when nothing is available).
    fn current(&self) -> Arc<str>;
}

/// Editable source text shared between a host and the engine.
///
/// Writers call [`LiveSource::set`]; the engine only reads. Cloning is cheap
/// and every clone observes the same text.
///
/// ## Example
/// ```rust
/// use livecompile::{LiveSource, SourceProvider};
///
/// let src = LiveSource::new();
/// assert_eq!(&*src.current(), "");
/// src.set("1+1");
/// assert_eq!(&*src.current(), "1+1");
/// ```
#[derive(Clone, Debug)]
pub struct LiveSource {
    tx: Arc<watch::Sender<Arc<str>>>,
}

impl LiveSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::with_text("")
    }

    /// Creates a source holding `text`.
    pub fn with_text(text: impl Into<Arc<str>>) -> Self {
        let (tx, _rx) = watch::channel(text.into());
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the current text.
    pub fn set(&self, text: impl Into<Arc<str>>) {
        self.tx.send_replace(text.into());
    }

    /// Clears the text (the engine treats this as "nothing to compile").
    pub fn clear(&self) {
        self.set("");
    }

    /// Returns a receiver that is notified on every `set`.
    pub fn watch(&self) -> watch::Receiver<Arc<str>> {
        self.tx.subscribe()
    }
}

impl Default for LiveSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for LiveSource {
    fn current(&self) -> Arc<str> {
        self.tx.borrow().clone()
    }
}
