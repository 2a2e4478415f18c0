//! Error types used by the engine and its retrieval surface.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`]: errors raised by the engine lifecycle itself.
//! - [`RetrieveError`]: failure outcomes of a single retrieval call.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Compiler-side failures live next to the compiler trait as
//! [`CompileError`](crate::CompileError).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the engine lifecycle.
///
/// None of these are raised while the supervisor is running; they are only
/// reported by [`Engine::stop`](crate::Engine::stop).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// In-flight attempts did not finish within the grace period; they were cancelled and abandoned.
    #[error("stop grace {grace:?} exceeded; abandoned {abandoned} attempt(s)")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of attempts left running in the blocking pool.
        abandoned: usize,
    },

    /// The supervisor loop panicked or was aborted before it could report.
    #[error("supervisor loop terminated abnormally: {reason}")]
    SupervisorPanicked {
        /// Join error rendered as text.
        reason: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use livecompile::EngineError;
    /// use std::time::Duration;
    ///
    /// let err = EngineError::GraceExceeded { grace: Duration::from_secs(5), abandoned: 1 };
    /// assert_eq!(err.as_label(), "engine_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::GraceExceeded { .. } => "engine_grace_exceeded",
            EngineError::SupervisorPanicked { .. } => "engine_supervisor_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::GraceExceeded { grace, abandoned } => {
                format!("grace exceeded after {grace:?}; abandoned attempts={abandoned}")
            }
            EngineError::SupervisorPanicked { reason } => format!("supervisor died: {reason}"),
        }
    }
}

/// # Failure outcome of a retrieval.
///
/// By the time a caller sees one of these, the matching human-readable
/// diagnostics have already been appended to the engine's message sink.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrieveError {
    /// No artifact for `code` was published before the deadline.
    #[error("timed out after {timeout:?} waiting for a compile of {code:?}")]
    Timeout {
        /// The requested source text.
        code: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The matching artifact carries diagnostics instead of a compiled form.
    #[error("compile produced {count} diagnostic(s)")]
    Diagnostics {
        /// Number of diagnostics pushed to the sink.
        count: usize,
    },
}

impl RetrieveError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use livecompile::RetrieveError;
    ///
    /// let err = RetrieveError::Diagnostics { count: 2 };
    /// assert_eq!(err.as_label(), "retrieve_diagnostics");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetrieveError::Timeout { .. } => "retrieve_timeout",
            RetrieveError::Diagnostics { .. } => "retrieve_diagnostics",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RetrieveError::Timeout { code, .. } => {
                format!("Time out on compiling expression, {code}")
            }
            RetrieveError::Diagnostics { count } => format!("diagnostics: {count}"),
        }
    }

    /// Returns `true` when the failure was a deadline rather than a compile problem.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetrieveError::Timeout { .. })
    }
}
