use std::sync::Arc;

use harbor_core::{ChangeEvent, Role, User, VesselId, VesselState, ViewportFilter};

use crate::helper::{MemoryRepository, harness, harness_with_repository, report_at, ts};

fn world() -> ViewportFilter {
    ViewportFilter::bounds(90.0, -90.0, 180.0, -180.0)
}

#[tokio::test]
async fn test_late_subscriber_gets_one_full_snapshot_then_only_diffs() {
    let h = harness();

    for seconds in 0..5 {
        h.pipeline
            .apply(report_at("9123456", seconds, 1.29, 103.85));
    }
    h.pipeline.apply(report_at("9234567", 10, -6.2, 106.8));

    let (subscription, membership) = h.hub.subscribe(world());
    assert_eq!(membership.len(), 2);

    // Exactly one Added per vessel, reflecting all applied updates.
    let first = subscription.recv().await.unwrap();
    let second = subscription.recv().await.unwrap();
    match (&first, &second) {
        (ChangeEvent::Added(a), ChangeEvent::Added(b)) => {
            assert_eq!(a.vessel_id.as_ref(), "9123456");
            assert_eq!(a.latest.timestamp, ts(4));
            assert_eq!(b.vessel_id.as_ref(), "9234567");
        }
        other => panic!("expected two added events, got {other:?}"),
    }
    assert!(subscription.try_recv().is_none());

    // Subsequent updates arrive as diffs, never as a duplicate Added.
    h.pipeline
        .apply(report_at("9123456", 20, 1.30, 103.90));
    match subscription.recv().await.unwrap() {
        ChangeEvent::Updated { previous, current } => {
            assert_eq!(previous.latest.timestamp, ts(4));
            assert_eq!(current.latest.timestamp, ts(20));
        }
        other => panic!("expected an update, got {other:?}"),
    }
}

#[tokio::test]
async fn test_vessel_crossing_into_a_viewport_emits_a_single_added() {
    let h = harness();

    // Start outside the subscriber's viewport.
    h.pipeline.apply(report_at("9123456", 0, 40.0, 103.85));
    let (subscription, membership) =
        h.hub.subscribe(ViewportFilter::bounds(10.0, -10.0, 110.0, 90.0));
    assert!(membership.is_empty());

    // Move inside: exactly one Added, no Updated.
    h.pipeline.apply(report_at("9123456", 1, 1.29, 103.85));
    match subscription.recv().await.unwrap() {
        ChangeEvent::Added(state) => assert_eq!(state.latest.timestamp, ts(1)),
        other => panic!("expected added, got {other:?}"),
    }
    assert!(subscription.try_recv().is_none());

    // Move back out: exactly one Removed.
    h.pipeline.apply(report_at("9123456", 2, 40.0, 103.85));
    assert!(matches!(
        subscription.recv().await.unwrap(),
        ChangeEvent::Removed(id) if id.as_ref() == "9123456"
    ));
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn test_manual_correction_beats_stream_report_applied_second() {
    let h = harness();
    let staff = User::test_default(Role::PortStaff);

    // A manual correction carrying the same timestamp as the stream report
    // it corrects must win, even though it is applied second.
    h.pipeline.apply(report_at("9123456", 0, 1.29027, 103.851959));
    h.pipeline.apply(report_at("9123456", 1, 1.30, 103.90));
    let correction = report_at("9123456", 1, 1.295, 103.86);
    h.pipeline.apply_manual(&staff, correction).unwrap();

    let state = h.store.get(&VesselId::test_new("9123456")).unwrap();
    assert_eq!(state.latest.latitude, 1.295);
    assert_eq!(state.latest.longitude, 103.86);
    assert_eq!(state.history().len(), 3);
}

#[tokio::test]
async fn test_accepted_states_are_persisted_fire_and_forget() {
    let repository = Arc::new(MemoryRepository::default());
    let h = harness_with_repository(Some(Arc::clone(&repository)));
    let id = VesselId::test_new("9123456");

    h.pipeline.apply(report_at("9123456", 0, 1.29, 103.85));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(
        repository.persisted(&id).unwrap().latest.timestamp,
        ts(0)
    );

    // A failing repository must not affect the in-memory accept.
    repository.set_failing(true);
    h.pipeline.apply(report_at("9123456", 1, 1.30, 103.90));
    assert_eq!(h.store.get(&id).unwrap().latest.timestamp, ts(1));
    assert_eq!(repository.persisted(&id).unwrap().latest.timestamp, ts(0));
}

#[tokio::test]
async fn test_rehydrated_store_feeds_initial_snapshots() {
    let repository = Arc::new(MemoryRepository::default());
    repository.seed(vec![VesselState::new(report_at(
        "9123456", 100, 1.29, 103.85,
    ))]);

    let h = harness();
    use harbor_core::VesselStateOutbound;
    h.store.rehydrate(repository.load_all().await.unwrap());

    let (_subscription, membership) = h.hub.subscribe(world());
    assert_eq!(membership.len(), 1);

    // Rehydrated state still obeys staleness against new reports.
    use harbor_core::ApplyOutcome;
    assert_eq!(
        h.pipeline.apply(report_at("9123456", 50, 1.0, 100.0)),
        ApplyOutcome::RejectedStale
    );
}
