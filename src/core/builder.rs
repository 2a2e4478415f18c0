use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{config::EngineConfig, engine::Engine, supervisor::Shared};
use crate::{
    compile::Compiler,
    events::Bus,
    host::{MessageLog, MessageSink, SourceProvider},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Engine`] with optional collaborators.
pub struct EngineBuilder<C: Compiler> {
    cfg: EngineConfig,
    compiler: C,
    source: Arc<dyn SourceProvider>,
    sink: Option<Arc<dyn MessageSink>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<C: Compiler> EngineBuilder<C> {
    /// Creates a new builder with the given compiler, source and configuration.
    pub fn new(compiler: C, source: impl SourceProvider, cfg: EngineConfig) -> Self {
        Self {
            cfg,
            compiler,
            source: Arc::new(source),
            sink: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the sink that receives retrieval diagnostics.
    ///
    /// Defaults to a private [`MessageLog`] nobody reads.
    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive engine events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the engine. The supervisor is not started.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Result slot
    /// - Subscriber workers and the bus listener feeding them
    ///
    /// Must be called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> Arc<Engine<C>> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let has_subscribers = !self.subscribers.is_empty();
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let lifetime = CancellationToken::new();

        if has_subscribers {
            subscriber_listener(&bus, Arc::clone(&subs), lifetime.clone());
        }

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(MessageLog::new()) as Arc<dyn MessageSink>);
        let shared = Arc::new(Shared::new(
            self.cfg,
            Arc::new(self.compiler),
            self.source,
            bus,
        ));

        Arc::new(Engine::new_internal(shared, sink, subs, lifetime))
    }
}

/// Forwards bus events to the subscriber set until `lifetime` is cancelled.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, lifetime: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = lifetime.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
    });
}
