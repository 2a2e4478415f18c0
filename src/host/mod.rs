//! # Host-side collaborators.
//!
//! The engine reads source text from a [`SourceProvider`] and reports
//! human-readable failures to a [`MessageSink`]. Both are owned by the host
//! (editor, REPL window, language server) and only borrowed by the engine.
//!
//! Ready-made implementations:
//! - [`LiveSource`] - editable string backed by `tokio::sync::watch`
//! - [`MessageLog`] - append-only message list keyed by [`Severity`](crate::Severity)

mod sink;
mod source;

pub use sink::{MessageLog, MessageSink};
pub use source::{LiveSource, SourceProvider};
