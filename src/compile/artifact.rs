//! # Compile results.
//!
//! A [`CompiledArtifact`] is produced once per finished attempt and never
//! mutated afterwards. It is shared as `Arc<CompiledArtifact<T>>` between the
//! result slot and every retriever that matched it.
//!
//! ## Matching
//! Artifacts are identified by their exact source text (byte equality,
//! whitespace included). The attempt generation is carried along for
//! ordering inside the slot only.

use std::fmt;
use std::sync::Arc;

/// Severity category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Short lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable message describing a compilation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Creates an error-level diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Creates a warning-level diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Immutable result of one compile attempt.
///
/// Exactly one of the following holds:
/// - `compiled` is `Some` and `diagnostics` is empty (success);
/// - `compiled` is `None` and `diagnostics` is non-empty (failure).
#[derive(Debug)]
pub struct CompiledArtifact<T> {
    source: Arc<str>,
    compiled: Option<T>,
    diagnostics: Vec<Diagnostic>,
    generation: u64,
}

impl<T> CompiledArtifact<T> {
    /// Successful compile of `source`.
    pub fn compiled(source: Arc<str>, generation: u64, compiled: T) -> Self {
        Self {
            source,
            compiled: Some(compiled),
            diagnostics: Vec::new(),
            generation,
        }
    }

    /// Failed compile of `source`.
    ///
    /// An empty `diagnostics` list is replaced by a single generic error so that
    /// the success/failure split above stays intact.
    pub fn failed(source: Arc<str>, generation: u64, mut diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error("compilation failed without diagnostics"));
        }
        Self {
            source,
            compiled: None,
            diagnostics,
            generation,
        }
    }

    /// The exact source text this artifact was compiled from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled form, `None` when compilation produced diagnostics.
    #[inline]
    pub fn compiled_form(&self) -> Option<&T> {
        self.compiled.as_ref()
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Generation of the attempt that produced this artifact.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Exact source match (no trimming, no normalization).
    #[inline]
    pub fn matches(&self, code: &str) -> bool {
        &*self.source == code
    }
}
