//! Recurring pull of the current ranking state into the reconciliation engine.
//!
//! Each tick tries the relay first and only falls back to the local cache
//! when the relay yields nothing. Whatever is obtained goes through the same
//! timestamp gate, so a late or duplicate read is harmless.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Notify, broadcast::error::RecvError, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, trace};

use crate::{
    dao::local_cache::{CacheChange, LocalCache},
    services::remote::RemoteAdapter,
    state::{ContextId, ReconciliationEngine},
};

/// Where the envelope fed to the engine on a tick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSource {
    /// The relay answered with a ranking update.
    Remote,
    /// The relay had nothing usable; the local cache did.
    Local,
    /// Neither source had anything to offer.
    Nothing,
}

/// Poller for one execution context.
pub struct PollLoop {
    context: ContextId,
    interval: Duration,
    remote: RemoteAdapter,
    cache: Arc<dyn LocalCache>,
    engine: Arc<ReconciliationEngine>,
    trigger: Notify,
}

impl PollLoop {
    /// Poller for one context; call [`PollLoop::start`] to run it.
    pub fn new(
        context: ContextId,
        interval: Duration,
        remote: RemoteAdapter,
        cache: Arc<dyn LocalCache>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            context,
            interval,
            remote,
            cache,
            engine,
            trigger: Notify::new(),
        }
    }

    /// Run one tick: relay first, local cache as fallback.
    pub async fn poll_once(&self) -> PollSource {
        if let Some(envelope) = self.remote.fetch().await {
            let outcome = self.engine.offer_envelope(envelope);
            trace!(context = %self.context, ?outcome, "polled relay");
            return PollSource::Remote;
        }

        match self.cache.get() {
            Some(envelope) => {
                let outcome = self.engine.offer_envelope(envelope);
                trace!(context = %self.context, ?outcome, "polled local cache");
                PollSource::Local
            }
            None => PollSource::Nothing,
        }
    }

    /// Ask a running loop to poll now instead of waiting for the next tick.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Spawn the loop on the current runtime.
    pub fn start(self: &Arc<Self>) -> PollHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let poller = self.clone();
        let task = tokio::spawn(async move { poller.run(shutdown_rx).await });
        info!(context = %self.context, interval_ms = self.interval.as_millis() as u64, "poll loop started");
        PollHandle {
            shutdown,
            task: Some(task),
        }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut changes = self.cache.changes();
        let mut changes_open = true;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
                _ = self.trigger.notified() => {
                    trace!(context = %self.context, "poll triggered");
                }
                change = changes.recv(), if changes_open => match change {
                    Ok(CacheChange { writer }) if writer == self.context => continue,
                    Ok(CacheChange { writer }) => {
                        trace!(context = %self.context, %writer, "local cache changed elsewhere");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(context = %self.context, skipped, "cache notifications lagged");
                    }
                    Err(RecvError::Closed) => {
                        changes_open = false;
                        continue;
                    }
                },
            }

            self.poll_once().await;
        }

        debug!(context = %self.context, "poll loop stopped");
    }
}

/// Owner of a running poll loop. Dropping it aborts the task.
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Signal the loop to exit and wait for it. An in-flight tick completes first.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        dao::{
            document_store::{DocumentStore, MemoryDocumentStore},
            local_cache::MemoryCache,
        },
        dto::{
            envelope::Envelope,
            rankings::{Entity, Mode},
        },
    };

    fn envelope(name: &str, timestamp: u64) -> Envelope {
        Envelope::new(Mode::EConsole, vec![Entity::ranked(name, name, "xx", 1)])
            .with_timestamp(timestamp)
    }

    struct Fixture {
        relay: MemoryDocumentStore,
        cache: MemoryCache,
        engine: Arc<ReconciliationEngine>,
        poller: Arc<PollLoop>,
    }

    fn fixture(interval: Duration) -> Fixture {
        let relay = MemoryDocumentStore::new();
        let cache = MemoryCache::new();
        let engine = Arc::new(ReconciliationEngine::new());
        let poller = Arc::new(PollLoop::new(
            ContextId::new(),
            interval,
            RemoteAdapter::new(Arc::new(relay.clone()), Duration::from_secs(1)),
            Arc::new(cache.clone()),
            engine.clone(),
        ));
        Fixture {
            relay,
            cache,
            engine,
            poller,
        }
    }

    #[tokio::test]
    async fn remote_value_wins_and_cache_is_not_consulted() {
        let f = fixture(Duration::from_secs(60));
        f.relay.save(envelope("remote", 5).to_value().unwrap()).await.unwrap();
        f.cache.put(&envelope("local", 50), ContextId::new());

        assert_eq!(f.poller.poll_once().await, PollSource::Remote);
        assert_eq!(f.engine.current(), Some(envelope("remote", 5)));
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_cache() {
        let f = fixture(Duration::from_secs(60));
        f.relay.save(envelope("remote", 5).to_value().unwrap()).await.unwrap();
        f.relay.set_offline(true);
        f.cache.put(&envelope("local", 3), ContextId::new());

        assert_eq!(f.poller.poll_once().await, PollSource::Local);
        assert_eq!(f.engine.current(), Some(envelope("local", 3)));
    }

    #[tokio::test]
    async fn empty_relay_and_cache_feed_nothing() {
        let f = fixture(Duration::from_secs(60));
        assert_eq!(f.poller.poll_once().await, PollSource::Nothing);
        assert!(f.engine.current().is_none());
    }

    #[tokio::test]
    async fn stale_remote_read_does_not_regress_state() {
        let f = fixture(Duration::from_secs(60));
        f.engine.offer_envelope(envelope("newer", 100));
        f.relay.save(envelope("older", 10).to_value().unwrap()).await.unwrap();

        assert_eq!(f.poller.poll_once().await, PollSource::Remote);
        assert_eq!(f.engine.current(), Some(envelope("newer", 100)));
    }

    #[tokio::test]
    async fn running_loop_picks_up_foreign_cache_writes_and_stops() {
        let f = fixture(Duration::from_secs(3_600));
        f.relay.set_offline(true);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tx = Mutex::new(tx);
        f.engine.subscribe(move |e| {
            let _ = tx.lock().unwrap().send(e.timestamp());
        });

        let handle = f.poller.start();
        // The first interval tick fires immediately on an empty cache.
        tokio::time::sleep(Duration::from_millis(20)).await;

        f.cache.put(&envelope("elsewhere", 77), ContextId::new());
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(received.unwrap(), Some(77));

        handle.stop().await;
    }

    #[tokio::test]
    async fn trigger_polls_without_waiting_for_the_interval() {
        let f = fixture(Duration::from_secs(3_600));
        let handle = f.poller.start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        f.relay.save(envelope("fresh", 9).to_value().unwrap()).await.unwrap();
        f.poller.trigger();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while f.engine.current().is_none() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(f.engine.current(), Some(envelope("fresh", 9)));

        handle.stop().await;
    }

    #[tokio::test]
    async fn dropping_the_handle_aborts_the_task() {
        let f = fixture(Duration::from_millis(10));
        let handle = f.poller.start();
        assert!(!handle.is_finished());
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(Arc::strong_count(&f.poller), 1);
    }
}
