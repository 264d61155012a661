use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rankings_sync::{
    Envelope, PublishRequest, SyncConfig, SyncContext,
    dao::{
        document_store::MemoryDocumentStore,
        local_cache::{DEFAULT_CACHE_KEY, FileCache, LocalCache, MemoryCache},
    },
    dto::rankings::{AnimationSettings, Entity, LayoutSettings, Mode, RankOffsets},
    services::{clock::ManualClock, poll_loop::PollSource, remote::RemoteAdapter},
    state::{BusRegistry, ContextId, DisplayState},
};
use uuid::Uuid;

fn entities(names: &[&str]) -> Vec<Entity> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Entity::ranked(*name, *name, "xx", i as i32 + 1))
        .collect()
}

fn names(envelope: &Envelope) -> Vec<String> {
    envelope.entities().iter().map(|e| e.name.clone()).collect()
}

fn context(relay: &MemoryDocumentStore, clock: &ManualClock, interval: Duration) -> SyncContext {
    let config = SyncConfig {
        poll_interval: interval,
        ..SyncConfig::default()
    };
    SyncContext::builder(config)
        .cache(Arc::new(MemoryCache::new()))
        .remote(RemoteAdapter::new(
            Arc::new(relay.clone()),
            Duration::from_secs(1),
        ))
        .clock(Arc::new(clock.clone()))
        .build()
}

async fn wait_for_relay_timestamp(relay: &MemoryDocumentStore, timestamp: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stored = relay
            .peek()
            .and_then(|doc| Envelope::decode(&doc))
            .map(|e| e.timestamp());
        if stored == Some(timestamp) || tokio::time::Instant::now() >= deadline {
            assert_eq!(stored, Some(timestamp), "relay never received the push");
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn publish_converges_across_contexts_and_skewed_update_is_rejected() {
    let relay = MemoryDocumentStore::new();
    let interval = Duration::from_millis(50);

    let track_a = context(&relay, &ManualClock::starting_at(1_000), interval);
    let display = context(&relay, &ManualClock::starting_at(0), interval);
    let skewed = context(&relay, &ManualClock::starting_at(999), interval);

    let local_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = local_seen.clone();
    track_a
        .bus()
        .subscribe(move |e| sink.lock().unwrap().push(names(e)));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let tx = Mutex::new(tx);
    display.subscribe(move |e| {
        let _ = tx.lock().unwrap().send(e.clone());
    });
    display.start();

    let sent = track_a.publish(PublishRequest::new(
        Mode::RocketLeague,
        entities(&["X", "Y", "Z"]),
    ));
    assert_eq!(sent.timestamp(), 1_000);
    assert_eq!(*local_seen.lock().unwrap(), vec![vec!["X", "Y", "Z"]]);

    let received = tokio::time::timeout(interval * 20, rx.recv())
        .await
        .expect("display context never polled the update")
        .expect("observer channel closed");
    assert_eq!(names(&received), vec!["X", "Y", "Z"]);
    assert_eq!(received.timestamp(), 1_000);

    skewed.publish(PublishRequest::new(Mode::RocketLeague, entities(&["Z", "Y", "X"])));
    wait_for_relay_timestamp(&relay, 999).await;
    assert_eq!(display.poll_once().await, PollSource::Remote);

    let current = display.current().expect("display lost its state");
    assert_eq!(names(&current), vec!["X", "Y", "Z"]);
    assert_eq!(display.engine().last_timestamp(), 1_000);
    // Re-reads of the t=1000 document are accepted ties; the skewed one never arrives.
    while let Ok(update) = rx.try_recv() {
        assert_eq!(update.timestamp(), 1_000);
    }

    display.stop().await;
}

#[tokio::test]
async fn relay_outage_falls_back_to_the_shared_cache() {
    let relay = MemoryDocumentStore::new();
    relay.set_offline(true);
    let cache = MemoryCache::new();

    let stored = Envelope::new(Mode::EMobile, entities(&["A", "B"])).with_timestamp(50);
    cache.put(&stored, ContextId::new());

    let display = SyncContext::builder(SyncConfig::default())
        .cache(Arc::new(cache))
        .remote(RemoteAdapter::new(Arc::new(relay), Duration::from_millis(200)))
        .build();

    assert_eq!(display.poll_once().await, PollSource::Local);
    assert_eq!(display.current(), Some(stored));
}

#[tokio::test]
async fn missing_relay_degrades_to_cache_only_sync() {
    let cache = MemoryCache::new();
    let clock = ManualClock::starting_at(10);
    let build = || {
        SyncContext::builder(SyncConfig::default())
            .cache(Arc::new(cache.clone()))
            .clock(Arc::new(clock.clone()))
            .build()
    };
    let editor = build();
    let overlay = build();

    let sent = editor.publish(PublishRequest::new(Mode::EConsoleGroupB, entities(&["Q"])));
    assert_eq!(overlay.poll_once().await, PollSource::Local);
    assert_eq!(overlay.current(), Some(sent));
}

#[tokio::test]
async fn display_keeps_parameters_an_update_omits() {
    let relay = MemoryDocumentStore::new();
    let clock = ManualClock::starting_at(100);
    let editor = context(&relay, &clock, Duration::from_secs(60));

    let display_state = Arc::new(Mutex::new(DisplayState::default()));
    let shown = display_state.clone();
    editor.subscribe(move |e| shown.lock().unwrap().apply(e));

    let big_text = LayoutSettings {
        font_size: 48.0,
        ..LayoutSettings::default()
    };
    editor.publish(PublishRequest::new(Mode::EConsole, entities(&["A"])).with_layout(big_text));
    clock.advance(1);
    editor.publish(PublishRequest::new(Mode::EConsole, entities(&["B", "A"])));

    let state = display_state.lock().unwrap();
    assert_eq!(state.layout, big_text);
    assert_eq!(state.render_lines(), vec!["1. B (xx)", "2. A (xx)"]);
    assert_eq!(state.updated_at, 101);
}

#[tokio::test]
async fn bus_update_drives_the_overlay_display_without_polling() {
    let buses = BusRegistry::new();
    let clock = ManualClock::starting_at(2_000);
    let build = |clock: ManualClock| {
        SyncContext::builder(SyncConfig::default())
            .bus_registry(buses.clone())
            .cache(Arc::new(MemoryCache::new()))
            .remote(RemoteAdapter::unconfigured())
            .clock(Arc::new(clock))
            .build()
    };
    let editor = build(clock.clone());
    let overlay = build(ManualClock::starting_at(0));

    let display_state = Arc::new(Mutex::new(DisplayState::default()));
    let shown = display_state.clone();
    overlay.subscribe(move |e| shown.lock().unwrap().apply(e));

    let offsets = RankOffsets::from([(2, -8)]);
    editor.publish(
        PublishRequest::new(Mode::EConsoleGroupB, entities(&["P", "Q"]))
            .with_rank_offsets(offsets.clone()),
    );
    clock.advance(5);
    editor.publish(PublishRequest::new(Mode::EConsoleGroupB, entities(&["Q", "P"])));

    let state = display_state.lock().unwrap();
    assert_eq!(state.mode, Mode::EConsoleGroupB);
    assert_eq!(state.render_lines(), vec!["1. Q (xx)", "2. P (xx)"]);
    assert_eq!(state.rank_offsets, offsets);
    assert_eq!(state.updated_at, 2_005);
    assert_eq!(overlay.engine().last_timestamp(), 2_005);
}

#[tokio::test]
async fn parameter_sets_survive_the_shared_file_cache() {
    let dir = std::env::temp_dir().join(format!("rankings-scenario-{}", Uuid::new_v4().simple()));
    let cache_path = FileCache::in_dir(&dir, DEFAULT_CACHE_KEY).path().to_path_buf();
    let build = |clock: ManualClock| {
        // Each context opens the file on its own, like two processes.
        SyncContext::builder(SyncConfig::default())
            .cache(Arc::new(FileCache::new(cache_path.clone())))
            .remote(RemoteAdapter::unconfigured())
            .clock(Arc::new(clock))
            .build()
    };
    let editor = build(ManualClock::starting_at(70));
    let overlay = build(ManualClock::starting_at(0));

    let springy = AnimationSettings {
        damping: 12.0,
        ..AnimationSettings::default()
    };
    let sent = editor.publish(
        PublishRequest::new(Mode::RocketLeague, entities(&["R", "S", "T"]))
            .with_animation(springy)
            .with_rank_offsets(RankOffsets::from([(1, 20), (3, -20)])),
    );

    assert_eq!(overlay.poll_once().await, PollSource::Local);
    let received = overlay.current().expect("overlay should read the cached update");
    assert_eq!(received, sent);

    let mut state = DisplayState::default();
    state.apply(&received);
    assert_eq!(state.animation, springy);
    assert_eq!(state.offset_for_rank(1), 20);
    assert_eq!(state.offset_for_rank(3), -20);
    let _ = std::fs::remove_dir_all(&dir);
}
