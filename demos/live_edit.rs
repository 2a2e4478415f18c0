//! Simulates an editor typing an expression while a request handler asks for
//! compiled results.
//!
//! Run with:
//! ```text
//! RUST_LOG=debug cargo run --example live_edit --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use livecompile::{
    CompileError, Compiler, Diagnostic, Engine, EngineConfig, LiveSource, LogWriter, MessageLog,
    Severity, Subscribe,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Evaluates `a*b+c*d`-style expressions; each term costs a few milliseconds.
struct Calculator;

impl Compiler for Calculator {
    type Parsed = Vec<Vec<i64>>;
    type Output = i64;

    fn parse(&self, source: &str, _ctx: &CancellationToken) -> Result<Self::Parsed, CompileError> {
        source
            .split('+')
            .map(|sum| {
                sum.split('*')
                    .map(|term| {
                        let term = term.trim();
                        if term.is_empty() {
                            return Err(CompileError::from(Diagnostic::error(
                                "unexpected end of expression",
                            )));
                        }
                        term.parse::<i64>().map_err(|_| {
                            CompileError::from(Diagnostic::error(format!("not a number: {term}")))
                        })
                    })
                    .collect::<Result<Vec<i64>, CompileError>>()
            })
            .collect()
    }

    fn compile(&self, sums: Self::Parsed, ctx: &CancellationToken) -> Result<i64, CompileError> {
        let mut total = 0;
        for product in sums {
            if ctx.is_cancelled() {
                return Err(CompileError::Canceled);
            }
            std::thread::sleep(Duration::from_millis(40));
            total += product.iter().product::<i64>();
        }
        Ok(total)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let source = LiveSource::new();
    let log = Arc::new(MessageLog::new());
    let cfg = EngineConfig {
        retrieve_timeout: Duration::from_millis(500),
        ..EngineConfig::default()
    };
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let engine = Engine::builder(Calculator, source.clone(), cfg)
        .with_sink(log.clone())
        .with_subscribers(subscribers)
        .build();

    let run = engine.start();
    tracing::info!(%run, "engine running");

    // Keystrokes arrive faster than a compile finishes, so most are superseded.
    let typed = "2*3+4*5+6";
    for end in 1..=typed.len() {
        source.set(&typed[..end]);
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    let artifact = engine
        .retrieve(typed)
        .await
        .context("final expression should compile")?;
    tracing::info!(
        value = ?artifact.compiled_form(),
        generation = artifact.generation(),
        "compiled"
    );

    source.set("2*");
    if engine.retrieve("2*").await.is_err() {
        for msg in log.messages(Severity::Error) {
            tracing::warn!(%msg, "compiler says");
        }
    }

    engine.stop().await?;
    Ok(())
}
