//! Engine core: supervision, attempts, result slot and retrieval.
//!
//! This module contains the embedded implementation of the live compilation
//! service. The public API from this module is [`Engine`] (lifecycle and
//! retrieval), [`EngineBuilder`], [`EngineConfig`], [`Retriever`] and the
//! read side of [`ResultSlot`].
//!
//! Internal modules:
//! - [`supervisor`]: polls the source, supersedes and spawns attempts, drains on stop;
//! - [`attempt`]: runs one compile on a blocking thread and publishes once;
//! - [`slot`]: the locked single-artifact cell with generation ordering;
//! - [`retriever`]: bounded wait for an artifact matching a source text;
//! - [`engine`]: start/stop surface and run identity;
//! - [`builder`]: wiring of bus, subscribers and sink.

mod attempt;
mod builder;
mod config;
mod engine;
mod retriever;
mod slot;
mod supervisor;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::{Engine, RunId};
pub use retriever::Retriever;
pub use slot::ResultSlot;
