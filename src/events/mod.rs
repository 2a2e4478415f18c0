//! Engine events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the engine, its supervisor loop,
//! compile attempts, retrievers and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine` (start/stop, retrieval), the supervisor loop,
//!   `CompileAttempt` (from blocking threads), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the engine's subscriber listener (fans out to
//!   `SubscriberSet`) and anything holding [`Engine::subscribe`](crate::Engine::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
