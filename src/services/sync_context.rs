//! One execution context (an editor or an overlay) wired end to end.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::{
    config::SyncConfig,
    dao::{
        document_store::RANKINGS_RESOURCE,
        local_cache::{FileCache, LocalCache, MemoryCache},
    },
    dto::envelope::Envelope,
    services::{
        clock::{Clock, SystemClock},
        poll_loop::{PollHandle, PollLoop, PollSource},
        publisher::{PublishRequest, Publisher},
        remote::RemoteAdapter,
    },
    state::{BroadcastBus, BusRegistry, ContextId, ReconciliationEngine, SubscriptionId},
};

/// Bus, engine, cache, relay adapter, poller and publisher of one context.
pub struct SyncContext {
    id: ContextId,
    bus: BroadcastBus,
    engine: Arc<ReconciliationEngine>,
    poller: Arc<PollLoop>,
    publisher: Publisher,
    bus_listener: SubscriptionId,
    running: Mutex<Option<PollHandle>>,
}

impl SyncContext {
    /// Start wiring a context from `config`.
    pub fn builder(config: SyncConfig) -> SyncContextBuilder {
        SyncContextBuilder::new(config)
    }

    /// Identity used to tag this context's cache writes.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The named bus this context publishes on and listens to.
    pub fn bus(&self) -> &BroadcastBus {
        &self.bus
    }

    /// The reconciliation engine every transport of this context feeds.
    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// Last accepted envelope of this context.
    pub fn current(&self) -> Option<Envelope> {
        self.engine.current()
    }

    /// Stamp and send an update through every transport.
    pub fn publish(&self, request: PublishRequest) -> Envelope {
        self.publisher.publish(request)
    }

    /// Register a display observer and ask the poller for a fresh read.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = self.engine.subscribe(observer);
        self.poller.trigger();
        id
    }

    /// Remove a display observer; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.engine.unsubscribe(id)
    }

    /// Run a single poll tick now.
    pub async fn poll_once(&self) -> PollSource {
        self.poller.poll_once().await
    }

    /// Start the poll loop; a no-op when it already runs.
    pub fn start(&self) {
        let Ok(mut running) = self.running.lock() else {
            warn!(context = %self.id, "poll handle lock poisoned; not starting");
            return;
        };
        if running.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *running = Some(self.poller.start());
    }

    /// Stop the poll loop and wait for it to exit.
    pub async fn stop(&self) {
        let handle = match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.stop().await;
            info!(context = %self.id, "sync context stopped");
        }
    }

    /// Whether the poll loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|running| running.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for SyncContext {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.bus_listener);
    }
}

/// Builder for [`SyncContext`]; anything not supplied is derived from the config.
pub struct SyncContextBuilder {
    config: SyncConfig,
    buses: Option<BusRegistry>,
    cache: Option<Arc<dyn LocalCache>>,
    remote: Option<RemoteAdapter>,
    clock: Option<Arc<dyn Clock>>,
}

impl SyncContextBuilder {
    fn new(config: SyncConfig) -> Self {
        Self {
            config,
            buses: None,
            cache: None,
            remote: None,
            clock: None,
        }
    }

    /// Attach to channels of an existing registry instead of a private one.
    pub fn bus_registry(mut self, buses: BusRegistry) -> Self {
        self.buses = Some(buses);
        self
    }

    /// Use `cache` instead of the configured one.
    pub fn cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `remote` instead of the configured relay.
    pub fn remote(mut self, remote: RemoteAdapter) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Stamp publishes with `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wire the context. The poll loop is not started.
    pub fn build(self) -> SyncContext {
        let id = ContextId::new();
        let config = self.config;

        let bus = self
            .buses
            .unwrap_or_default()
            .channel(&config.channel_name);
        let cache = self.cache.unwrap_or_else(|| default_cache(&config));
        let remote = self
            .remote
            .unwrap_or_else(|| RemoteAdapter::from_config(&config, RANKINGS_RESOURCE));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let engine = Arc::new(ReconciliationEngine::new());
        let bus_engine = engine.clone();
        let bus_listener = bus.subscribe(move |envelope| {
            bus_engine.offer_envelope(envelope.clone());
        });

        if !remote.is_configured() {
            info!(context = %id, "no relay configured; syncing through the local cache only");
        }

        let poller = Arc::new(PollLoop::new(
            id,
            config.poll_interval,
            remote.clone(),
            cache.clone(),
            engine.clone(),
        ));
        let publisher = Publisher::new(id, clock, bus.clone(), engine.clone(), cache, remote)
            .skipping_bus_listener(bus_listener);

        SyncContext {
            id,
            bus,
            engine,
            poller,
            publisher,
            bus_listener,
            running: Mutex::new(None),
        }
    }
}

fn default_cache(config: &SyncConfig) -> Arc<dyn LocalCache> {
    match &config.cache_path {
        Some(path) => Arc::new(FileCache::new(path.clone())),
        None => Arc::new(MemoryCache::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dto::rankings::{Entity, Mode},
        services::clock::ManualClock,
    };

    fn rows() -> Vec<Entity> {
        vec![Entity::ranked("a", "A", "aa", 1)]
    }

    #[tokio::test]
    async fn contexts_on_one_cache_see_each_other_through_polling() {
        let cache = MemoryCache::new();
        let editor = SyncContext::builder(SyncConfig::default())
            .cache(Arc::new(cache.clone()))
            .remote(RemoteAdapter::unconfigured())
            .clock(Arc::new(ManualClock::starting_at(10)))
            .build();
        let overlay = SyncContext::builder(SyncConfig::default())
            .cache(Arc::new(cache))
            .remote(RemoteAdapter::unconfigured())
            .build();

        let sent = editor.publish(PublishRequest::new(Mode::EConsole, rows()));
        assert!(overlay.current().is_none());
        assert_eq!(overlay.poll_once().await, PollSource::Local);
        assert_eq!(overlay.current(), Some(sent));
    }

    #[tokio::test]
    async fn shared_registry_delivers_bus_messages_across_contexts() {
        let buses = BusRegistry::new();
        let a = SyncContext::builder(SyncConfig::default())
            .bus_registry(buses.clone())
            .build();
        let b = SyncContext::builder(SyncConfig::default())
            .bus_registry(buses)
            .build();

        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        b.bus().subscribe(move |_| *sink.lock().unwrap() += 1);

        a.publish(PublishRequest::new(Mode::EMobile, rows()));
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn bus_message_reaches_the_other_context_observers_once() {
        let buses = BusRegistry::new();
        let editor = SyncContext::builder(SyncConfig::default())
            .bus_registry(buses.clone())
            .remote(RemoteAdapter::unconfigured())
            .clock(Arc::new(ManualClock::starting_at(500)))
            .build();
        let overlay = SyncContext::builder(SyncConfig::default())
            .bus_registry(buses)
            .remote(RemoteAdapter::unconfigured())
            .build();

        let editor_seen = Arc::new(Mutex::new(Vec::new()));
        let overlay_seen = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = editor_seen.clone();
            editor.subscribe(move |e| sink.lock().unwrap().push(e.timestamp()));
            let sink = overlay_seen.clone();
            overlay.subscribe(move |e| sink.lock().unwrap().push(e.timestamp()));
        }

        let sent = editor.publish(PublishRequest::new(Mode::EMobile, rows()));

        // No polling happened: the overlay learned about it from the bus alone.
        assert_eq!(overlay.current(), Some(sent.clone()));
        assert_eq!(*overlay_seen.lock().unwrap(), vec![500]);
        assert_eq!(*editor_seen.lock().unwrap(), vec![500]);
        assert_eq!(editor.current(), Some(sent));
    }

    #[tokio::test]
    async fn dropped_context_leaves_the_shared_bus() {
        let buses = BusRegistry::new();
        let bus = buses.channel(&SyncConfig::default().channel_name);
        let context = SyncContext::builder(SyncConfig::default())
            .bus_registry(buses)
            .remote(RemoteAdapter::unconfigured())
            .build();
        assert_eq!(bus.subscriber_count(), 1);

        drop(context);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_triggers_an_immediate_poll() {
        let cache = MemoryCache::new();
        let config = SyncConfig {
            poll_interval: Duration::from_secs(3_600),
            ..SyncConfig::default()
        };
        let overlay = SyncContext::builder(config)
            .cache(Arc::new(cache.clone()))
            .remote(RemoteAdapter::unconfigured())
            .build();
        overlay.start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let envelope = Envelope::new(Mode::RocketLeague, rows()).with_timestamp(42);
        // Written by a writer whose notification the overlay ignores.
        cache.put(&envelope, overlay.id());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tx = Mutex::new(tx);
        overlay.subscribe(move |e| {
            let _ = tx.lock().unwrap().send(e.clone());
        });

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(received.unwrap(), Some(envelope));

        overlay.stop().await;
        assert!(!overlay.is_running());
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_without_start_is_a_no_op() {
        let context = SyncContext::builder(SyncConfig::default())
            .remote(RemoteAdapter::unconfigured())
            .build();
        context.stop().await;
        context.start();
        context.start();
        assert!(context.is_running());
        context.stop().await;
        assert!(!context.is_running());
    }
}
