//! End-to-end behaviour of the engine through its public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use livecompile::{
    CompileError, Compiler, Diagnostic, Engine, EngineConfig, EngineError, Event, EventKind,
    LiveSource, MessageLog, RetrieveError, Severity, Subscribe,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Sums `+`-separated integers. `slow(<ms>):<expr>` sleeps first; the sleep
/// honours cancellation unless the compiler is built stubborn.
#[derive(Default)]
struct Adder {
    stubborn: bool,
    compiles: AtomicUsize,
}

impl Compiler for Adder {
    type Parsed = (Duration, Vec<i64>);
    type Output = i64;

    fn parse(&self, source: &str, _ctx: &CancellationToken) -> Result<Self::Parsed, CompileError> {
        let (delay, expr) = match source.strip_prefix("slow(") {
            Some(rest) => {
                let (ms, expr) = rest
                    .split_once("):")
                    .ok_or_else(|| Diagnostic::error("malformed slow() prefix"))?;
                let ms: u64 = ms.parse().map_err(|_| Diagnostic::error("bad delay"))?;
                (Duration::from_millis(ms), expr)
            }
            None => (Duration::ZERO, source),
        };
        let mut terms = Vec::new();
        for part in expr.split('+') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Diagnostic::error("unexpected end of expression").into());
            }
            let n = part
                .parse::<i64>()
                .map_err(|_| Diagnostic::error(format!("not a number: {part}")))?;
            terms.push(n);
        }
        Ok((delay, terms))
    }

    fn compile(
        &self,
        (delay, terms): Self::Parsed,
        ctx: &CancellationToken,
    ) -> Result<i64, CompileError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let until = Instant::now() + delay;
        while Instant::now() < until {
            if !self.stubborn && ctx.is_cancelled() {
                return Err(CompileError::Canceled);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(terms.iter().sum())
    }
}

fn build(
    compiler: Adder,
    cfg: EngineConfig,
) -> (Arc<Engine<Adder>>, LiveSource, Arc<MessageLog>) {
    let source = LiveSource::new();
    let log = Arc::new(MessageLog::new());
    let engine = Engine::builder(compiler, source.clone(), cfg)
        .with_sink(log.clone())
        .build();
    (engine, source, log)
}

async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event in time")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_a_success_within_timeout() {
    let (engine, source, log) = build(Adder::default(), EngineConfig::default());
    engine.start();
    source.set("1+1");

    let started = Instant::now();
    let artifact = engine.retrieve("1+1").await.expect("compiled");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(artifact.compiled_form(), Some(&2));
    assert!(artifact.diagnostics().is_empty());
    assert_eq!(artifact.source(), "1+1");
    assert!(log.is_empty());

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_b_diagnostics_reach_the_sink() {
    let (engine, source, log) = build(Adder::default(), EngineConfig::default());
    engine.start();
    source.set("1+");

    let err = engine.retrieve("1+").await.unwrap_err();
    assert_eq!(err, RetrieveError::Diagnostics { count: 1 });
    assert_eq!(
        log.messages(Severity::Error),
        vec!["unexpected end of expression".to_string()]
    );

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_c_superseded_source_times_out() {
    let cfg = EngineConfig {
        retrieve_timeout: Duration::from_millis(400),
        ..EngineConfig::default()
    };
    let (engine, source, log) = build(Adder::default(), cfg);
    let mut rx = engine.subscribe();
    engine.start();

    source.set("slow(1000):1+1");
    next_of(&mut rx, EventKind::AttemptStarting).await;
    source.set("2+2");

    let newer = engine.retrieve("2+2").await.expect("newer source compiles");
    assert_eq!(newer.compiled_form(), Some(&4));

    let err = engine.retrieve("slow(1000):1+1").await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(
        log.messages(Severity::Error),
        vec!["Time out on compiling expression, slow(1000):1+1".to_string()]
    );

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_d_stop_while_compiling_spawns_nothing_new() {
    let (engine, source, _log) = build(Adder::default(), EngineConfig::default());
    let mut rx = engine.subscribe();
    engine.start();

    source.set("slow(150):5");
    next_of(&mut rx, EventKind::AttemptStarting).await;

    let stop_started = Instant::now();
    engine.stop().await.unwrap();
    // The loop leaves at once; only the running 150ms compile is waited on.
    let stopped_in = stop_started.elapsed();
    assert!(stopped_in < Duration::from_millis(150 + 150), "{stopped_in:?}");
    assert!(!engine.is_running());
    next_of(&mut rx, EventKind::EngineStopped).await;

    source.set("6+6");
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(ev) = rx.try_recv() {
        assert_ne!(ev.kind, EventKind::AttemptStarting, "attempt after stop");
    }
    assert!(engine.slot().try_match("6+6").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_reports_abandoned_attempts_past_grace() {
    let cfg = EngineConfig {
        grace: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let compiler = Adder {
        stubborn: true,
        ..Adder::default()
    };
    let (engine, source, _log) = build(compiler, cfg);
    let mut rx = engine.subscribe();
    engine.start();

    source.set("slow(500):1");
    next_of(&mut rx, EventKind::AttemptStarting).await;

    match engine.stop().await {
        Err(EngineError::GraceExceeded { abandoned, .. }) => assert_eq!(abandoned, 1),
        other => panic!("expected grace exceeded, got {other:?}"),
    }

    // The abandoned compile finishes later but may not publish.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(engine.current().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p1_cancelled_attempts_never_publish() {
    let compiler = Adder {
        stubborn: true,
        ..Adder::default()
    };
    let (engine, source, _log) = build(compiler, EngineConfig::default());
    let mut rx = engine.subscribe();
    engine.start();

    // Older texts are slower than newer ones, so they finish after the newest.
    let texts = ["slow(300):1", "slow(200):2", "slow(100):3", "4"];
    for text in texts {
        source.set(text);
        next_of(&mut rx, EventKind::AttemptStarting).await;
    }

    let last = engine.retrieve("4").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let current = engine.current().unwrap();
    assert_eq!(current.source(), "4");
    assert_eq!(current.generation(), last.generation());
    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p2_never_returns_a_different_source() {
    let cfg = EngineConfig {
        retrieve_timeout: Duration::from_millis(100),
        ..EngineConfig::default()
    };
    let (engine, source, _log) = build(Adder::default(), cfg);
    engine.start();
    source.set("3+3");
    engine.retrieve("3+3").await.unwrap();

    for code in ["3+3 ", " 3+3", "3 + 3", "6"] {
        let err = engine.retrieve(code).await.unwrap_err();
        assert!(err.is_timeout(), "{code:?} must not match 3+3");
    }
    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p3_timeout_is_bounded() {
    let cfg = EngineConfig {
        retrieve_timeout: Duration::from_millis(150),
        retrieve_poll: Duration::from_millis(10),
        ..EngineConfig::default()
    };
    let (engine, _source, log) = build(Adder::default(), cfg);
    engine.start();

    let started = Instant::now();
    let err = engine.retrieve("never").await.unwrap_err();
    let waited = started.elapsed();

    assert!(err.is_timeout());
    assert!(waited >= Duration::from_millis(150));
    // timeout + one poll, plus scheduling slack
    assert!(waited < Duration::from_millis(150 + 10 + 100), "{waited:?}");
    assert_eq!(log.len(), 1);
    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p4_one_batch_of_diagnostics_per_call() {
    let (engine, source, log) = build(Adder::default(), EngineConfig::default());
    engine.start();
    source.set("1+x+");

    engine.retrieve("1+x+").await.unwrap_err();
    assert_eq!(log.messages(Severity::Error), vec!["not a number: x".to_string()]);

    engine.retrieve("1+x+").await.unwrap_err();
    assert_eq!(log.len(), 2);
    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p5_unchanged_source_compiles_once() {
    let source = LiveSource::new();
    let compiler = Arc::new(Adder::default());
    // Compile counter lives behind the engine; read it through a second handle.
    let engine = Engine::builder(
        SharedAdder(compiler.clone()),
        source.clone(),
        EngineConfig::default(),
    )
    .build();
    engine.start();

    source.set("7+7");
    engine.retrieve("7+7").await.unwrap();
    for _ in 0..5 {
        source.set("7+7");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(compiler.compiles.load(Ordering::SeqCst), 1);

    source.set("8+8");
    engine.retrieve("8+8").await.unwrap();
    assert_eq!(compiler.compiles.load(Ordering::SeqCst), 2);
    engine.stop().await.unwrap();
}

struct SharedAdder(Arc<Adder>);

impl Compiler for SharedAdder {
    type Parsed = (Duration, Vec<i64>);
    type Output = i64;

    fn parse(&self, source: &str, ctx: &CancellationToken) -> Result<Self::Parsed, CompileError> {
        self.0.parse(source, ctx)
    }

    fn compile(&self, parsed: Self::Parsed, ctx: &CancellationToken) -> Result<i64, CompileError> {
        self.0.compile(parsed, ctx)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_retrievers_share_one_result() {
    let (engine, source, _log) = build(Adder::default(), EngineConfig::default());
    engine.start();

    let mut waiters = Vec::new();
    for _ in 0..8 {
        let r = engine.retriever();
        waiters.push(tokio::spawn(async move { r.retrieve("10+20").await }));
    }
    source.set("10+20");

    let mut generations = Vec::new();
    for w in waiters {
        let a = w.await.unwrap().unwrap();
        assert_eq!(a.compiled_form(), Some(&30));
        generations.push(a.generation());
    }
    generations.dedup();
    assert_eq!(generations.len(), 1);
    engine.stop().await.unwrap();
}

struct Tally(Arc<AtomicUsize>);

#[async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, event: &Event) {
        if event.kind == EventKind::AttemptPublished {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscribers_observe_publishes() {
    let published = Arc::new(AtomicUsize::new(0));
    let source = LiveSource::new();
    let engine = Engine::builder(Adder::default(), source.clone(), EngineConfig::default())
        .with_subscribers(vec![Arc::new(Tally(published.clone()))])
        .build();
    assert_eq!(engine.subscriber_count(), 1);
    engine.start();

    source.set("1");
    engine.retrieve("1").await.unwrap();
    source.set("2");
    engine.retrieve("2").await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while published.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber saw both publishes");
    engine.stop().await.unwrap();
}
