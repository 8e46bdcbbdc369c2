use chrono::{Duration, TimeZone, Utc};
use feed_consumer::models::{PositionMessage, StaticMessage};
use harbor_core::{ChangeEvent, ReportSource, VesselId, ViewportFilter};

use crate::helper::test;

#[tokio::test(flavor = "multi_thread")]
async fn test_feed_positions_are_applied_to_the_store() {
    test(|mut helper| async move {
        let pos = PositionMessage::test_default(None);
        helper.feed_source.send_position(&pos).await;

        helper.process_confirmation.recv().await.unwrap();

        let state = helper.store.get(&pos.vessel_id).unwrap();
        assert_eq!(state.latest.latitude, pos.latitude.unwrap());
        assert_eq!(state.latest.source, ReportSource::Stream);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stale_feed_positions_are_dropped() {
    test(|mut helper| async move {
        let pos = PositionMessage::test_default(None);
        let mut stale = pos.clone();
        stale.timestamp = pos.timestamp - Duration::seconds(10);
        stale.latitude = Some(50.0);

        helper.feed_source.send_position(&pos).await;
        helper.process_confirmation.recv().await.unwrap();
        helper.feed_source.send_position(&stale).await;
        helper.process_confirmation.recv().await.unwrap();

        let state = helper.store.get(&pos.vessel_id).unwrap();
        assert_eq!(state.latest.latitude, pos.latitude.unwrap());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_manual_correction_overrides_stream_report_with_equal_timestamp() {
    test(|mut helper| async move {
        let pos = PositionMessage::test_default(None);
        helper.feed_source.send_position(&pos).await;
        helper.process_confirmation.recv().await.unwrap();

        let staff = harbor_core::User::test_default(harbor_core::Role::PortStaff);
        let mut correction = harbor_core::PositionReport::test_default(
            pos.vessel_id.clone(),
            pos.timestamp,
        );
        correction.latitude = 1.295;
        correction.longitude = 103.86;

        let outcome = helper.pipeline.apply_manual(&staff, correction).unwrap();
        assert_eq!(outcome, harbor_core::ApplyOutcome::Accepted);

        let state = helper.store.get(&pos.vessel_id).unwrap();
        assert_eq!(state.latest.latitude, 1.295);
        assert_eq!(state.latest.source, ReportSource::Manual);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_static_messages_merge_into_tracked_vessels() {
    test(|mut helper| async move {
        let pos = PositionMessage::test_default(None);
        helper.feed_source.send_position(&pos).await;
        helper.process_confirmation.recv().await.unwrap();

        let mut vessel = StaticMessage::test_default(Some(pos.vessel_id.clone()));
        vessel.timestamp = pos.timestamp;
        helper.feed_source.send_static(&vessel).await;
        helper.process_confirmation.recv().await.unwrap();

        let state = helper.store.get(&pos.vessel_id).unwrap();
        let info = state.info.as_ref().unwrap();
        assert_eq!(info.name.as_deref(), Some("Pacific Explorer"));

        // A later update without a name keeps the existing one.
        let mut update = StaticMessage::test_default(Some(pos.vessel_id.clone()));
        update.timestamp = vessel.timestamp + Duration::seconds(1);
        update.name = None;
        update.destination = Some("JAKARTA".to_string());
        helper.feed_source.send_static(&update).await;
        helper.process_confirmation.recv().await.unwrap();

        let state = helper.store.get(&pos.vessel_id).unwrap();
        let info = state.info.as_ref().unwrap();
        assert_eq!(info.name.as_deref(), Some("Pacific Explorer"));
        assert_eq!(info.destination.as_deref(), Some("JAKARTA"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_lines_are_skipped_without_stalling_the_stream() {
    test(|mut helper| async move {
        helper.feed_source.send_raw("this is not json").await;
        helper
            .feed_source
            .send_raw(r#"{"type":"Position","vesselId":"not-an-id"}"#)
            .await;

        let pos = PositionMessage::test_default(None);
        helper.feed_source.send_position(&pos).await;

        // The malformed lines may land in an earlier commit than the valid
        // one; wait until the valid position shows up.
        while helper.store.get(&pos.vessel_id).is_none() {
            helper.process_confirmation.recv().await.unwrap();
        }

        assert_eq!(helper.store.len(), 1);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_flushes_buffered_messages() {
    use feed_consumer::consumer::Consumer;
    use futures::TryStreamExt;
    use tokio_stream::wrappers::ReceiverStream;
    use tokio_util::sync::CancellationToken;

    let (line_sender, line_receiver) =
        tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(10);
    let source = tokio_util::compat::FuturesAsyncReadCompatExt::compat(
        ReceiverStream::new(line_receiver).into_async_read(),
    );

    let (sender, receiver) = async_channel::bounded(10);
    let token = CancellationToken::new();

    // A commit interval far beyond the test runtime: only the shutdown flush
    // can deliver the buffered message.
    let consumer = Consumer::new(std::time::Duration::from_secs(3600));
    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(source, sender, token).await }
    });

    let pos = PositionMessage::test_default(None);
    let mut line = serde_json::to_string(&pos).unwrap();
    line.push('\n');
    line_sender.send(Ok(line)).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    token.cancel();

    handle.await.unwrap().unwrap();
    let message: harbor_core::DataMessage = receiver.recv().await.unwrap();
    assert_eq!(message.positions.len(), 1);
    assert_eq!(message.positions[0].vessel_id, pos.vessel_id);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscribers_observe_feed_updates_end_to_end() {
    test(|mut helper| async move {
        let (subscription, membership) = helper
            .hub
            .subscribe(ViewportFilter::bounds(10.0, -10.0, 110.0, 90.0));
        assert!(membership.is_empty());

        let mut pos = PositionMessage::test_default(Some(VesselId::test_new("9123456")));
        pos.timestamp = Utc.timestamp_opt(1000, 0).unwrap();
        helper.feed_source.send_position(&pos).await;
        helper.process_confirmation.recv().await.unwrap();

        match subscription.recv().await.unwrap() {
            ChangeEvent::Added(state) => assert_eq!(state.vessel_id.as_ref(), "9123456"),
            other => panic!("expected added, got {other:?}"),
        }

        let mut update = pos.clone();
        update.timestamp = pos.timestamp + Duration::seconds(5);
        update.latitude = Some(1.30);
        helper.feed_source.send_position(&update).await;
        helper.process_confirmation.recv().await.unwrap();

        match subscription.recv().await.unwrap() {
            ChangeEvent::Updated { current, .. } => {
                assert_eq!(current.latest.latitude, 1.30);
            }
            other => panic!("expected updated, got {other:?}"),
        }
    })
    .await;
}
