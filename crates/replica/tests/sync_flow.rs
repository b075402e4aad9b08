use replica::{
    map_forward, map_position, Calibration, EntityId, EntitySync, HeadlessHost,
    InterpolationState, MapFrame, Quat, RepresentationKind, SnapshotFeed, SyncConfig,
    SyncSession, Vec3,
};
use serde_json::{json, Value};

fn new_sync() -> EntitySync<HeadlessHost> {
    EntitySync::new(&SyncConfig::default(), HeadlessHost::default()).expect("valid config")
}

fn apply(sync: &mut EntitySync<HeadlessHost>, payload: Value) {
    sync.on_snapshot(&payload.to_string())
        .expect("payload should parse");
}

fn alice(position: &str, health: i32) -> Value {
    json!({ "p1": [position, "Alice", "A", health, "1, 0, 0"] })
}

fn p1() -> EntityId {
    EntityId::new("p1")
}

fn position_of(sync: &EntitySync<HeadlessHost>, id: &EntityId) -> Vec3 {
    sync.store().transform(id).expect("transform").position
}

#[test]
fn three_cycle_lifecycle_of_a_single_entity() {
    let mut sync = new_sync();

    apply(&mut sync, alice("0, 0, 0", 100));
    let handle = sync.store().handle(&p1()).expect("handle after spawn");
    let spawned = sync.host().find(handle).expect("representation");
    assert_eq!(spawned.kind, RepresentationKind::TeamA);
    assert_eq!(spawned.text, "Alice (100 HP)");
    assert!(spawned.visible);
    assert!(spawned
        .transform
        .position
        .abs_diff_eq(Vec3::new(0.4, -0.05, -0.6), 1e-5));
    assert!((spawned.transform.rotation * Vec3::Z).abs_diff_eq(Vec3::X, 1e-5));

    apply(&mut sync, alice("0, 0, 0", 0));
    assert_eq!(sync.store().handle(&p1()), Some(handle));
    let dead = sync.host().find(handle).expect("representation");
    assert!(!dead.visible);
    assert_eq!(dead.text, "Alice(0)");
    assert!(!sync.tracked(&p1()).expect("still tracked").alive);

    apply(&mut sync, json!({}));
    assert!(sync.tracked(&p1()).is_none());
    assert!(sync.store().handle(&p1()).is_none());
    assert!(sync.host().find(handle).is_none());
    assert_eq!(sync.host().destroyed_total(), 1);
    assert_eq!(sync.interpolation_state(&p1()), InterpolationState::Idle);
}

#[test]
fn handles_stay_stable_across_updates() {
    let mut sync = new_sync();
    apply(
        &mut sync,
        json!({
            "p1": ["0, 0, 0", "Alice", "CT", 100, "1, 0, 0"],
            "p2": ["100, 0, 0", "Bob", "T", 100, "0, 1, 0"],
        }),
    );
    let first = sync.store().handle(&p1()).expect("p1");
    let second = sync.store().handle(&EntityId::new("p2")).expect("p2");

    for step in 1..5 {
        let x = format!("{}, 0, 0", step * 10);
        apply(
            &mut sync,
            json!({
                "p1": [x, "Alice", "CT", 100 - step, "1, 0, 0"],
                "p2": ["100, 0, 0", "Bob", "T", 100, "0, 1, 0"],
            }),
        );
        sync.tick(0.05);
    }

    assert_eq!(sync.store().handle(&p1()), Some(first));
    assert_eq!(sync.store().handle(&EntityId::new("p2")), Some(second));
    assert_eq!(sync.host().created_total(), 2);
    assert_eq!(sync.host().destroyed_total(), 0);
}

#[test]
fn revived_entity_becomes_visible_with_same_handle() {
    let mut sync = new_sync();
    apply(&mut sync, alice("0, 0, 0", 100));
    let handle = sync.store().handle(&p1()).expect("handle");

    apply(&mut sync, alice("0, 0, 0", -5));
    assert!(!sync.host().find(handle).expect("hidden").visible);

    apply(&mut sync, alice("0, 0, 0", 40));
    let revived = sync.host().find(handle).expect("revived");
    assert!(revived.visible);
    assert_eq!(revived.text, "Alice(40)");
    assert_eq!(sync.host().created_total(), 1);
}

#[test]
fn preempting_update_starts_from_current_transform() {
    let mut sync = new_sync();
    apply(&mut sync, alice("0, 0, 0", 100));
    apply(&mut sync, alice("1000, 0, 0", 100));
    sync.tick(0.15);
    let midway = position_of(&sync, &p1());
    assert!(midway.abs_diff_eq(Vec3::new(0.655, -0.05, -0.6), 1e-3));

    apply(&mut sync, alice("2000, 0, 0", 100));
    sync.tick(0.0);
    assert!(position_of(&sync, &p1()).abs_diff_eq(midway, 1e-5));

    sync.tick(0.3);
    assert!(position_of(&sync, &p1()).abs_diff_eq(Vec3::new(1.42, -0.05, -0.6), 1e-4));
    assert_eq!(
        sync.interpolation_state(&p1()),
        InterpolationState::Completed
    );
}

#[test]
fn rotated_map_frame_reaches_the_host() {
    let mut sync = new_sync();
    sync.set_map_frame(MapFrame {
        parent_rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        ..sync.map_frame()
    });

    apply(&mut sync, alice("0, 0, 0", 100));

    let transform = sync.store().transform(&p1()).expect("transform");
    assert!(transform
        .position
        .abs_diff_eq(Vec3::new(-0.6, -0.05, -0.4), 1e-5));
    assert!((transform.rotation * Vec3::Z).abs_diff_eq(Vec3::NEG_Z, 1e-5));
    assert!(transform.position.abs_diff_eq(
        map_position(Vec3::ZERO, &sync.map_frame(), &Calibration::default()),
        1e-6
    ));
    assert!(map_forward(Vec3::X, &sync.map_frame()).abs_diff_eq(Vec3::NEG_Z, 1e-5));
}

#[test]
fn session_drains_feed_published_from_another_thread() {
    let feed = SnapshotFeed::new();
    let mut session = SyncSession::attach(&feed, new_sync());
    let publisher = feed.clone();

    std::thread::spawn(move || {
        publisher.publish(alice("0, 0, 0", 100).to_string());
        publisher.publish("not json");
        publisher.publish(alice("1000, 0, 0", 90).to_string());
    })
    .join()
    .expect("publisher thread");

    let summary = session.advance(1.0);
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.dropped, 1);
    assert!(position_of(session.sync(), &p1()).abs_diff_eq(Vec3::new(0.91, -0.05, -0.6), 1e-4));

    let metrics = session.metrics().snapshot();
    assert_eq!(metrics.payloads_applied, 2);
    assert_eq!(metrics.payloads_dropped, 1);
    assert_eq!(metrics.tracked_entities, 1);

    let host = session.shutdown();
    assert_eq!(host.representation_count(), 0);
    assert_eq!(feed.subscriber_count(), 0);
}
