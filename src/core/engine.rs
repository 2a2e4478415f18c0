//! # Engine: lifecycle surface of the live compilation service.
//!
//! The [`Engine`] owns the result slot, the event bus and the subscriber set.
//! It starts and stops supervisor runs and answers retrieval requests.
//!
//! ## Lifecycle
//! ```text
//! Engine::builder(compiler, source, cfg).build()
//!   └─► start() ─► RunId(n) + run token ─► tokio::spawn(Supervisor::run(token))
//!        │            (idempotent: a live run returns its existing RunId)
//!        ▼
//!   retrieve(code) / retrieve_within(code, timeout)   (any number, concurrently)
//!        ▼
//!   stop().await ─► cancel run token ─► supervisor drains attempts (grace)
//!        │                              └─ Err(GraceExceeded) when attempts outlive grace
//!        ▼
//!   start() again ─► RunId(n+1)       (generations keep increasing across runs)
//!
//! drop(engine) ─► cancel run token and subscriber listener (no join)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use livecompile::{
//!     CompileError, Compiler, Diagnostic, Engine, EngineConfig, LiveSource, MessageLog,
//! };
//!
//! struct Len;
//!
//! impl Compiler for Len {
//!     type Parsed = usize;
//!     type Output = usize;
//!
//!     fn parse(&self, source: &str, _ctx: &CancellationToken) -> Result<usize, CompileError> {
//!         Ok(source.len())
//!     }
//!
//!     fn compile(&self, n: usize, _ctx: &CancellationToken) -> Result<usize, CompileError> {
//!         if n > 10 {
//!             return Err(Diagnostic::error("too long").into());
//!         }
//!         Ok(n)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = LiveSource::new();
//!     let log = Arc::new(MessageLog::new());
//!     let engine = Engine::builder(Len, source.clone(), EngineConfig::default())
//!         .with_sink(log.clone())
//!         .build();
//!
//!     engine.start();
//!     source.set("hello");
//!     let artifact = engine.retrieve("hello").await?;
//!     assert_eq!(artifact.compiled_form(), Some(&5));
//!
//!     engine.stop().await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::compile::{CompiledArtifact, Compiler};
use crate::core::builder::EngineBuilder;
use crate::core::config::EngineConfig;
use crate::core::retriever::Retriever;
use crate::core::slot::ResultSlot;
use crate::core::supervisor::{Shared, Supervisor};
use crate::error::{EngineError, RetrieveError};
use crate::events::{Event, EventKind};
use crate::host::{MessageSink, SourceProvider};
use crate::subscribers::SubscriberSet;

/// Identity of one supervisor run.
///
/// Each successful `start()` after a stop yields a new, larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl RunId {
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Handle of the live supervisor run.
struct RunHandle {
    id: RunId,
    token: CancellationToken,
    join: JoinHandle<Result<(), EngineError>>,
}

/// Live, single-slot background compilation service.
pub struct Engine<C: Compiler> {
    shared: Arc<Shared<C>>,
    sink: Arc<dyn MessageSink>,
    subs: Arc<SubscriberSet>,
    /// Cancels the subscriber listener when the engine is dropped.
    lifetime: CancellationToken,
    runs: AtomicU64,
    current: Mutex<Option<RunHandle>>,
}

impl<C: Compiler> Engine<C> {
    /// Starts building an engine around `compiler` and `source`.
    pub fn builder(
        compiler: C,
        source: impl SourceProvider,
        cfg: EngineConfig,
    ) -> EngineBuilder<C> {
        EngineBuilder::new(compiler, source, cfg)
    }

    pub(crate) fn new_internal(
        shared: Arc<Shared<C>>,
        sink: Arc<dyn MessageSink>,
        subs: Arc<SubscriberSet>,
        lifetime: CancellationToken,
    ) -> Self {
        Self {
            shared,
            sink,
            subs,
            lifetime,
            runs: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Starts the supervisor loop, or returns the id of the live run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> RunId {
        let mut current = self.lock_current();
        if let Some(run) = current.as_ref() {
            if !run.join.is_finished() && !run.token.is_cancelled() {
                return run.id;
            }
        }

        let id = RunId(self.runs.fetch_add(1, Ordering::Relaxed) + 1);
        let token = CancellationToken::new();
        self.shared
            .bus
            .publish(Event::new(EventKind::EngineStarted).with_run(id.get()));

        let supervisor = Supervisor::new(id.get(), Arc::clone(&self.shared));
        let join = tokio::spawn(supervisor.run(token.clone()));
        *current = Some(RunHandle { id, token, join });
        id
    }

    /// Stops the live run and waits for it to drain.
    ///
    /// Returns `Ok(())` when nothing was running. The supervisor exits within
    /// one poll interval; in-flight attempts get up to `grace` to finish.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let Some(run) = self.lock_current().take() else {
            return Ok(());
        };
        run.token.cancel();
        match run.join.await {
            Ok(res) => res,
            Err(e) => Err(EngineError::SupervisorPanicked {
                reason: e.to_string(),
            }),
        }
    }

    /// Returns `true` while a supervisor run is active.
    pub fn is_running(&self) -> bool {
        self.lock_current()
            .as_ref()
            .is_some_and(|run| !run.join.is_finished() && !run.token.is_cancelled())
    }

    /// Id of the current run, if any.
    pub fn run_id(&self) -> Option<RunId> {
        self.lock_current().as_ref().map(|run| run.id)
    }

    /// Waits up to the configured timeout for an artifact compiled from `code`.
    pub async fn retrieve(
        &self,
        code: &str,
    ) -> Result<Arc<CompiledArtifact<C::Output>>, RetrieveError> {
        self.retriever().retrieve(code).await
    }

    /// Waits up to `timeout` for an artifact compiled from `code`.
    pub async fn retrieve_within(
        &self,
        code: &str,
        timeout: Duration,
    ) -> Result<Arc<CompiledArtifact<C::Output>>, RetrieveError> {
        self.retriever().retrieve_within(code, timeout).await
    }

    /// Cloneable retrieval handle for request-handling code.
    pub fn retriever(&self) -> Retriever<C::Output> {
        Retriever::new(
            Arc::clone(&self.shared.slot),
            Arc::clone(&self.sink),
            self.shared.bus.clone(),
            self.shared.cfg.retrieve_poll_clamped(),
            self.shared.cfg.retrieve_timeout,
        )
    }

    /// Latest published artifact, whatever its source.
    pub fn current(&self) -> Option<Arc<CompiledArtifact<C::Output>>> {
        self.shared.slot.latest()
    }

    /// Read access to the result slot.
    pub fn slot(&self) -> &ResultSlot<C::Output> {
        &self.shared.slot
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.cfg
    }

    /// Raw event receiver (only events published after this call).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Compiler> Drop for Engine<C> {
    fn drop(&mut self) {
        let current = self
            .current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = current.take() {
            run.token.cancel();
        }
        self.lifetime.cancel();
    }
}
