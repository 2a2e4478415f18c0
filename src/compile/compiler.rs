//! # Black-box compiler boundary.
//!
//! The engine never looks inside a compile. It calls [`Compiler::parse`] and
//! then [`Compiler::compile`] from a blocking worker thread and only inspects
//! the outcome.
//!
//! ## Cancellation
//! Each attempt hands the compiler its own [`CancellationToken`]. When the
//! attempt is superseded the token is cancelled. Compilers that can stop early
//! should poll `ctx.is_cancelled()` at safe points and return
//! [`CompileError::Canceled`]. Compilers that ignore the token simply run to
//! completion; their result is then discarded by the attempt's publish guard.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use livecompile::{CompileError, Compiler, Diagnostic};
//!
//! struct Digits;
//!
//! impl Compiler for Digits {
//!     type Parsed = String;
//!     type Output = u64;
//!
//!     fn parse(&self, source: &str, _ctx: &CancellationToken) -> Result<String, CompileError> {
//!         Ok(source.trim().to_string())
//!     }
//!
//!     fn compile(&self, parsed: String, ctx: &CancellationToken) -> Result<u64, CompileError> {
//!         if ctx.is_cancelled() {
//!             return Err(CompileError::Canceled);
//!         }
//!         parsed
//!             .parse()
//!             .map_err(|e| CompileError::from(Diagnostic::error(format!("{e}"))))
//!     }
//! }
//!
//! let ctx = CancellationToken::new();
//! let parsed = Digits.parse(" 42 ", &ctx).unwrap();
//! assert_eq!(Digits.compile(parsed, &ctx).unwrap(), 42);
//! ```

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::artifact::Diagnostic;

/// Outcome of a parse or compile step that did not produce a value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Source was rejected; the diagnostics become part of the artifact.
    #[error("{} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    /// The compiler observed the cancellation token and stopped early.
    #[error("compile cancelled")]
    Canceled,
}

impl From<Diagnostic> for CompileError {
    fn from(d: Diagnostic) -> Self {
        CompileError::Diagnostics(vec![d])
    }
}

impl From<Vec<Diagnostic>> for CompileError {
    fn from(d: Vec<Diagnostic>) -> Self {
        CompileError::Diagnostics(d)
    }
}

/// # Two-phase compiler invoked by compile attempts.
///
/// Both phases run on a blocking thread (`spawn_blocking`), so they may take
/// arbitrarily long and may block. They must be safe to call concurrently:
/// a superseded attempt can still be running while the next one starts.
pub trait Compiler: Send + Sync + 'static {
    /// Intermediate parse result handed from `parse` to `compile`.
    type Parsed: Send;
    /// Compiled form stored in successful artifacts.
    type Output: Send + Sync + 'static;

    /// Parses the full source text.
    fn parse(&self, source: &str, ctx: &CancellationToken) -> Result<Self::Parsed, CompileError>;

    /// Compiles a parse result.
    fn compile(
        &self,
        parsed: Self::Parsed,
        ctx: &CancellationToken,
    ) -> Result<Self::Output, CompileError>;
}
