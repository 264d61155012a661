//! Outbound side of a context: stamping and fan-out of updates.

use std::sync::Arc;

use tracing::info;

use crate::{
    dao::local_cache::LocalCache,
    dto::{
        envelope::Envelope,
        rankings::{AnimationSettings, Entity, LayoutSettings, Mode, RankOffsets},
    },
    services::{clock::Clock, remote::RemoteAdapter},
    state::{BroadcastBus, ContextId, ReconciliationEngine, SubscriptionId},
};

/// Full replacement of the list shown for `mode`, plus optional parameter sets.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Mode whose list is replaced.
    pub mode: Mode,
    /// New list, in display order.
    pub entities: Vec<Entity>,
    /// Layout to send; `None` leaves displays on their current layout.
    pub layout: Option<LayoutSettings>,
    /// Animation to send; `None` leaves displays on their current one.
    pub animation: Option<AnimationSettings>,
    /// Offsets to send; `None` leaves displays on their current ones.
    pub rank_offsets: Option<RankOffsets>,
}

impl PublishRequest {
    /// Request carrying only the list; parameter sets are left out of the update.
    pub fn new(mode: Mode, entities: Vec<Entity>) -> Self {
        Self {
            mode,
            entities,
            layout: None,
            animation: None,
            rank_offsets: None,
        }
    }

    /// Also send a layout parameter set.
    pub fn with_layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Also send an animation parameter set.
    pub fn with_animation(mut self, animation: AnimationSettings) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Also send per-rank position offsets.
    pub fn with_rank_offsets(mut self, offsets: RankOffsets) -> Self {
        self.rank_offsets = Some(offsets);
        self
    }

    fn into_envelope(self) -> Envelope {
        let mut envelope = Envelope::new(self.mode, self.entities);
        if let Some(layout) = self.layout {
            envelope = envelope.with_layout(layout);
        }
        if let Some(animation) = self.animation {
            envelope = envelope.with_animation(animation);
        }
        if let Some(offsets) = self.rank_offsets {
            envelope = envelope.with_rank_offsets(offsets);
        }
        envelope
    }
}

/// Fans one publish out to every transport of its context.
pub struct Publisher {
    context: ContextId,
    clock: Arc<dyn Clock>,
    bus: BroadcastBus,
    engine: Arc<ReconciliationEngine>,
    cache: Arc<dyn LocalCache>,
    remote: RemoteAdapter,
    bus_listener: Option<SubscriptionId>,
}

impl Publisher {
    /// Publisher over the given transports; stamps with `clock`.
    pub fn new(
        context: ContextId,
        clock: Arc<dyn Clock>,
        bus: BroadcastBus,
        engine: Arc<ReconciliationEngine>,
        cache: Arc<dyn LocalCache>,
        remote: RemoteAdapter,
    ) -> Self {
        Self {
            context,
            clock,
            bus,
            engine,
            cache,
            remote,
            bus_listener: None,
        }
    }

    /// Skip the bus subscriber `id` when publishing.
    ///
    /// Used when this context's engine listens on the bus and is offered the
    /// update directly instead.
    pub fn skipping_bus_listener(mut self, id: SubscriptionId) -> Self {
        self.bus_listener = Some(id);
        self
    }

    /// Stamp and distribute an update, returning the envelope that was sent.
    ///
    /// Local effects (bus, engine, cache) are applied before returning; the
    /// relay write runs in the background.
    pub fn publish(&self, request: PublishRequest) -> Envelope {
        let envelope = request
            .into_envelope()
            .with_timestamp(self.clock.now_millis());

        let delivered = match self.bus_listener {
            Some(own) => self.bus.publish_excluding(&envelope, own),
            None => self.bus.publish(&envelope),
        };
        let outcome = self.engine.offer_envelope(envelope.clone());
        self.cache.put(&envelope, self.context);
        self.remote.push(&envelope);

        info!(
            context = %self.context,
            mode = %envelope.mode(),
            entities = envelope.entities().len(),
            timestamp = envelope.timestamp(),
            delivered,
            ?outcome,
            "published ranking update"
        );
        envelope
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;
    use crate::{
        dao::{document_store::MemoryDocumentStore, local_cache::MemoryCache},
        services::clock::ManualClock,
        state::{BusRegistry, Offer},
    };

    struct Fixture {
        clock: ManualClock,
        bus: BroadcastBus,
        engine: Arc<ReconciliationEngine>,
        cache: MemoryCache,
        relay: MemoryDocumentStore,
        publisher: Publisher,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::starting_at(1_000);
        let bus = BusRegistry::new().channel("test");
        let engine = Arc::new(ReconciliationEngine::new());
        let cache = MemoryCache::new();
        let relay = MemoryDocumentStore::new();
        let publisher = Publisher::new(
            ContextId::new(),
            Arc::new(clock.clone()),
            bus.clone(),
            engine.clone(),
            Arc::new(cache.clone()),
            RemoteAdapter::new(Arc::new(relay.clone()), Duration::from_secs(1)),
        );
        Fixture {
            clock,
            bus,
            engine,
            cache,
            relay,
            publisher,
        }
    }

    fn rows() -> Vec<Entity> {
        vec![
            Entity::ranked("x", "X", "xx", 1),
            Entity::ranked("y", "Y", "yy", 2),
        ]
    }

    #[tokio::test]
    async fn publish_reaches_every_transport() {
        let f = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        f.bus.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let sent = f.publisher.publish(
            PublishRequest::new(Mode::EMobile, rows()).with_layout(LayoutSettings::default()),
        );

        assert_eq!(sent.timestamp(), 1_000);
        assert_eq!(sent.layout(), Some(&LayoutSettings::default()));
        assert!(sent.animation().is_none());
        assert_eq!(*seen.lock().unwrap(), vec![sent.clone()]);
        assert_eq!(f.engine.current(), Some(sent.clone()));
        assert_eq!(f.cache.get(), Some(sent.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while f.relay.peek().is_none() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(f.relay.peek().and_then(|doc| Envelope::decode(&doc)), Some(sent));
    }

    #[tokio::test]
    async fn bus_subscribers_see_the_update_before_the_engine() {
        let f = fixture();
        let engine = f.engine.clone();
        let engine_state_during_delivery = Arc::new(Mutex::new(None));
        let sink = engine_state_during_delivery.clone();
        f.bus.subscribe(move |_| *sink.lock().unwrap() = Some(engine.last_timestamp()));

        f.publisher.publish(PublishRequest::new(Mode::EMobile, rows()));
        assert_eq!(*engine_state_during_delivery.lock().unwrap(), Some(0));
        assert_eq!(f.engine.last_timestamp(), 1_000);
    }

    #[tokio::test]
    async fn skewed_clock_publish_is_still_distributed_but_not_accepted() {
        let f = fixture();
        f.publisher.publish(PublishRequest::new(Mode::EMobile, rows()));
        f.clock.set(999);
        let skewed = f.publisher.publish(PublishRequest::new(Mode::EConsole, rows()));

        assert_eq!(skewed.timestamp(), 999);
        assert_eq!(f.cache.get(), Some(skewed));
        assert_eq!(f.engine.last_timestamp(), 1_000);
        assert_eq!(f.engine.current().map(|e| e.mode()), Some(Mode::EMobile));
    }

    #[tokio::test]
    async fn empty_publish_is_stamped_but_dropped_by_the_engine() {
        let f = fixture();
        let sent = f.publisher.publish(PublishRequest::new(Mode::EMobile, Vec::new()));
        assert_eq!(sent.timestamp(), 1_000);
        assert!(f.engine.current().is_none());
        assert_eq!(f.engine.offer_envelope(sent), Offer::Unrecognized);
    }

    #[test]
    fn publish_without_runtime_still_applies_local_effects() {
        let f = fixture();
        let sent = f.publisher.publish(PublishRequest::new(Mode::EMobile, rows()));
        assert_eq!(f.engine.current(), Some(sent));
        assert!(f.relay.peek().is_none());
    }
}
