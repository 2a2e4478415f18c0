//! # Event subscribers for the engine.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Supervisor / Attempt / Retriever ── publish(Event) ──► Bus ──► listener
//!                                                                    │
//!                                                                    ▼
//!                                                           SubscriberSet::emit
//!                                                        ┌─────────┼─────────┐
//!                                                        ▼         ▼         ▼
//!                                                    LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use livecompile::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct SlowCompiles;
//!
//! #[async_trait]
//! impl Subscribe for SlowCompiles {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::AttemptPublished && event.elapsed_ms > Some(500) {
//!             // report slow compile
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "slow-compiles"
//!     }
//! }
//! ```

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod log;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;

#[cfg(feature = "logging")]
pub use log::LogWriter;
