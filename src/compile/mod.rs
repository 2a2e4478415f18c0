//! # Compiler boundary and compile results.
//!
//! This module provides the types that cross the black-box compiler boundary:
//! - [`Compiler`] - trait the host implements (parse, then compile)
//! - [`CompileError`] - diagnostics or cooperative cancellation
//! - [`CompiledArtifact`] - immutable outcome of one attempt
//! - [`Diagnostic`], [`Severity`] - human-readable problem reports

mod artifact;
mod compiler;

pub use artifact::{CompiledArtifact, Diagnostic, Severity};
pub use compiler::{CompileError, Compiler};
