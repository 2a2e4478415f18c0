//! # Supervisor: watches the source text and drives compile attempts.
//!
//! The supervisor loop is the only place where attempts are created or
//! cancelled. One loop runs per engine run (see [`RunId`](crate::RunId)).
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► reap finished attempts
//!   ├─► sleep(poll_interval)  ──or──  run token cancelled → break
//!   ├─► text = source.current()
//!   ├─► text empty or == last started text → continue
//!   ├─► publish SourceChanged
//!   ├─► previous attempt still running → cancel + abort, publish AttemptSuperseded
//!   ├─► generation += 1; slot.advance(generation)
//!   ├─► publish AttemptStarting
//!   └─► spawn_blocking(attempt.run())      (tracked in JoinSet)
//! }
//!
//! drain:
//!   ├─ all attempts joined within grace → EngineStopped, Ok
//!   └─ grace exceeded → cancel the live attempt, detach the rest,
//!                       GraceExceeded + EngineStopped, Err(GraceExceeded)
//! ```
//!
//! ## Rules
//! - At most one attempt is "live" (not cancelled) at a time.
//! - The slot floor is raised before the new attempt is spawned, so no older
//!   attempt can publish once a newer one exists.
//! - Compiler failures never reach the loop; attempts convert them to data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::{task::JoinSet, time};
use tokio_util::sync::CancellationToken;

use crate::compile::Compiler;
use crate::core::attempt::{AttemptHandle, CompileAttempt};
use crate::core::config::EngineConfig;
use crate::core::slot::{PublishOutcome, ResultSlot};
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind};
use crate::host::SourceProvider;

/// State shared by the engine handle, supervisor runs and attempts.
pub(crate) struct Shared<C: Compiler> {
    pub(crate) cfg: EngineConfig,
    pub(crate) compiler: Arc<C>,
    pub(crate) source: Arc<dyn SourceProvider>,
    pub(crate) slot: Arc<ResultSlot<C::Output>>,
    pub(crate) bus: Bus,
    /// Last generation handed out; survives restarts so the slot floor stays valid.
    generation: AtomicU64,
}

impl<C: Compiler> Shared<C> {
    pub(crate) fn new(
        cfg: EngineConfig,
        compiler: Arc<C>,
        source: Arc<dyn SourceProvider>,
        bus: Bus,
    ) -> Self {
        Self {
            cfg,
            compiler,
            source,
            slot: Arc::new(ResultSlot::new()),
            bus,
            generation: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// One run of the supervisor loop.
pub(crate) struct Supervisor<C: Compiler> {
    run: u64,
    shared: Arc<Shared<C>>,
    attempts: JoinSet<PublishOutcome>,
    previous: Option<AttemptHandle>,
    last_source: Option<Arc<str>>,
}

impl<C: Compiler> Supervisor<C> {
    pub(crate) fn new(run: u64, shared: Arc<Shared<C>>) -> Self {
        Self {
            run,
            shared,
            attempts: JoinSet::new(),
            previous: None,
            last_source: None,
        }
    }

    /// Runs until `token` is cancelled, then drains in-flight attempts.
    pub(crate) async fn run(mut self, token: CancellationToken) -> Result<(), EngineError> {
        let poll = self.shared.cfg.poll_interval_clamped();

        loop {
            while self.attempts.try_join_next().is_some() {}

            tokio::select! {
                _ = token.cancelled() => break,
                _ = time::sleep(poll) => {}
            }
            self.poll_source();
        }

        self.drain().await
    }

    /// One iteration: compare the source text and start an attempt on change.
    fn poll_source(&mut self) {
        let text = self.shared.source.current();
        if text.is_empty() || self.last_source.as_deref() == Some(&*text) {
            return;
        }
        self.shared
            .bus
            .publish(self.event(EventKind::SourceChanged).with_source(text.clone()));

        if let Some(prev) = self.previous.take() {
            if !prev.is_finished() {
                prev.cancel();
                self.shared.bus.publish(
                    self.event(EventKind::AttemptSuperseded)
                        .with_generation(prev.generation),
                );
            }
        }

        let generation = self.shared.next_generation();
        self.shared.slot.advance(generation);
        let attempt = CompileAttempt::new(generation, text.clone());
        self.shared.bus.publish(
            self.event(EventKind::AttemptStarting)
                .with_generation(generation)
                .with_source(text.clone()),
        );

        let token = attempt.token();
        let compiler = Arc::clone(&self.shared.compiler);
        let slot = Arc::clone(&self.shared.slot);
        let bus = self.shared.bus.clone();
        let abort = self
            .attempts
            .spawn_blocking(move || attempt.run(compiler.as_ref(), &slot, &bus));

        self.previous = Some(AttemptHandle {
            generation,
            token,
            abort,
        });
        self.last_source = Some(text);
    }

    /// Waits up to `grace` for tracked attempts; abandons the rest.
    async fn drain(mut self) -> Result<(), EngineError> {
        let grace = self.shared.cfg.grace;
        let attempts = &mut self.attempts;
        let joined = time::timeout(grace, async {
            while attempts.join_next().await.is_some() {}
        })
        .await;

        let res = match joined {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                if let Some(prev) = self.previous.take() {
                    prev.cancel();
                }
                let abandoned = self.attempts.len();
                self.attempts.detach_all();
                self.shared.bus.publish(
                    self.event(EventKind::GraceExceeded)
                        .with_elapsed(grace)
                        .with_reason(abandoned.to_string()),
                );
                Err(EngineError::GraceExceeded { grace, abandoned })
            }
        };
        self.shared.bus.publish(self.event(EventKind::EngineStopped));
        res
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_run(self.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::host::LiveSource;
    use crate::testing::Arith;

    fn shared(src: &LiveSource, grace: Duration) -> Arc<Shared<Arith>> {
        let cfg = EngineConfig {
            grace,
            ..EngineConfig::default()
        };
        Arc::new(Shared::new(
            cfg,
            Arc::new(Arith::default()),
            Arc::new(src.clone()),
            Bus::new(256),
        ))
    }

    async fn wait_for(rx: &mut tokio::sync::broadcast::Receiver<Event>, kind: EventKind) -> Event {
        time::timeout(Duration::from_secs(2), async {
            loop {
                let ev = rx.recv().await.unwrap();
                if ev.kind == kind {
                    return ev;
                }
            }
        })
        .await
        .expect("event in time")
    }

    #[tokio::test]
    async fn unchanged_source_starts_one_attempt() {
        let src = LiveSource::with_text("1+1");
        let shared = shared(&src, Duration::from_secs(1));
        let mut rx = shared.bus.subscribe();
        let token = CancellationToken::new();
        let run = tokio::spawn(Supervisor::new(1, shared.clone()).run(token.clone()));

        wait_for(&mut rx, EventKind::AttemptPublished).await;
        time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        run.await.unwrap().unwrap();

        let mut starts = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::AttemptStarting {
                starts += 1;
            }
        }
        assert_eq!(starts, 0, "no further attempts after the first publish");
        assert_eq!(shared.slot.floor(), 1);
    }

    #[tokio::test]
    async fn cancel_interrupts_poll_sleep() {
        let src = LiveSource::new();
        let cfg = EngineConfig {
            poll_interval: Duration::from_secs(30),
            ..EngineConfig::default()
        };
        let shared = Arc::new(Shared::new(
            cfg,
            Arc::new(Arith::default()),
            Arc::new(src.clone()),
            Bus::new(16),
        ));
        let token = CancellationToken::new();
        let run = tokio::spawn(Supervisor::new(1, shared).run(token.clone()));

        time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        let res = time::timeout(Duration::from_millis(200), run).await;
        assert!(res.expect("loop exits without finishing its sleep").unwrap().is_ok());
    }

    #[tokio::test]
    async fn empty_source_is_ignored() {
        let src = LiveSource::new();
        let shared = shared(&src, Duration::from_secs(1));
        let token = CancellationToken::new();
        let run = tokio::spawn(Supervisor::new(1, shared.clone()).run(token.clone()));

        time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        run.await.unwrap().unwrap();
        assert_eq!(shared.slot.floor(), 0);
        assert!(shared.slot.latest().is_none());
    }

    #[tokio::test]
    async fn change_supersedes_running_attempt() {
        let src = LiveSource::with_text("sleep:2000;1+1");
        let shared = shared(&src, Duration::from_secs(1));
        let mut rx = shared.bus.subscribe();
        let token = CancellationToken::new();
        let run = tokio::spawn(Supervisor::new(1, shared.clone()).run(token.clone()));

        wait_for(&mut rx, EventKind::AttemptStarting).await;
        src.set("2+2");
        let ev = wait_for(&mut rx, EventKind::AttemptSuperseded).await;
        assert_eq!(ev.generation, Some(1));
        wait_for(&mut rx, EventKind::AttemptPublished).await;

        token.cancel();
        run.await.unwrap().unwrap();
        let latest = shared.slot.latest().unwrap();
        assert_eq!(latest.source(), "2+2");
        assert_eq!(latest.generation(), 2);
    }

    #[tokio::test]
    async fn stubborn_attempt_is_abandoned_after_grace() {
        let src = LiveSource::with_text("sleep:1000;1");
        let cfg = EngineConfig {
            grace: Duration::from_millis(50),
            ..EngineConfig::default()
        };
        let shared = Arc::new(Shared::new(
            cfg,
            Arc::new(Arith { stubborn: true }),
            Arc::new(src.clone()),
            Bus::new(256),
        ));
        let mut rx = shared.bus.subscribe();
        let token = CancellationToken::new();
        let run = tokio::spawn(Supervisor::new(9, shared.clone()).run(token.clone()));

        wait_for(&mut rx, EventKind::AttemptStarting).await;
        token.cancel();
        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, EngineError::GraceExceeded { abandoned: 1, .. }));
        assert_eq!(wait_for(&mut rx, EventKind::EngineStopped).await.run, Some(9));
        assert!(shared.slot.latest().is_none());
    }
}
