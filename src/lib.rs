//! # livecompile
//!
//! **livecompile** is a live, incremental, single-slot background compilation
//! service. It watches a continuously edited source string, recompiles it in a
//! worker whenever it changes, cancels compiles made obsolete by newer text,
//! and publishes at most one current result that callers retrieve with a
//! bounded wait.
//!
//! The compiler itself is a black box supplied by the host through the
//! [`Compiler`] trait; so are the source text ([`SourceProvider`]) and the
//! message channel for failures ([`MessageSink`]).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────────┐        polled every poll_interval
//!   │  SourceProvider  │◄───────────────────────────────┐
//!   │ (e.g. LiveSource)│                                │
//!   └──────────────────┘                                │
//! ┌─────────────────────────────────────────────────────┴─────────────┐
//! │  Supervisor (one per RunId)                                       │
//! │  - change detection (text != last started text, non-empty)        │
//! │  - cancels the previous attempt (token + abort-if-not-started)    │
//! │  - raises the slot floor to the new generation                    │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ Attempt g=1  │   │ Attempt g=2  │   │ Attempt g=3  │  spawn_blocking
//!   │ (cancelled)  │   │ (cancelled)  │   │   (live)     │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ✗ rejected         ✗ rejected         │ publish (under lock)
//!                                                ▼
//!                                   ┌─────────────────────────┐
//!                                   │ ResultSlot (Mutex)      │──► notify
//!                                   │ latest: artifact g=3    │     │
//!                                   └────────────▲────────────┘     │
//!                                                │ try_match(code)  │
//!                                   ┌────────────┴────────────┐     │
//!                                   │ Retriever (many callers)│◄────┘
//!                                   │ - success → artifact    │
//!                                   │ - diagnostics → sink    │
//!                                   │ - timeout → sink        │
//!                                   └─────────────────────────┘
//! ```
//!
//! Every transition is also published as an [`Event`] on the engine's bus and
//! fanned out to [`Subscribe`] implementations.
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Engine**        | Start/stop the supervisor, retrieve results.                  | [`Engine`], [`EngineBuilder`], [`RunId`]    |
//! | **Compiler**      | Black-box parse + compile with cooperative cancellation.      | [`Compiler`], [`CompileError`]              |
//! | **Results**       | Immutable artifacts held in a single locked slot.             | [`CompiledArtifact`], [`ResultSlot`]        |
//! | **Host**          | Source text and message sink collaborators.                   | [`LiveSource`], [`MessageLog`]              |
//! | **Subscriber API**| Hook into engine events (logging, metrics, custom).           | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for lifecycle and retrieval.                     | [`EngineError`], [`RetrieveError`]          |
//! | **Configuration** | Poll intervals, retrieval timeout, stop grace.                | [`EngineConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber rendering events through `tracing`.

mod compile;
mod core;
mod error;
mod events;
mod host;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use compile::{CompileError, CompiledArtifact, Compiler, Diagnostic, Severity};
pub use self::core::{Engine, EngineBuilder, EngineConfig, ResultSlot, Retriever, RunId};
pub use error::{EngineError, RetrieveError};
pub use events::{Bus, Event, EventKind};
pub use host::{LiveSource, MessageLog, MessageSink, SourceProvider};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
