use iori_sink::{FileKind, Playlist, PresentationState, SinkConfig, SinkError, TrackId};

use crate::{
    common::{fragment, sink, video, Op},
    AssertWrapper,
};

#[tokio::test]
async fn test_init_failure_keeps_track() {
    let (mut sink, storage) = sink(SinkConfig::default());
    let track = TrackId::from("video");

    storage.fail(FileKind::Header, true);
    let result = sink.on_track_init(track.clone(), video()).await;
    assert!(matches!(result, Err(SinkError::InitWriteFailed(_))));
    assert!(sink.playlist().has_track(&track));

    // the track can still stream
    storage.fail(FileKind::Header, false);
    let demand = sink.on_stream_start(track).assert_success();
    let commit = sink.on_fragment(demand, fragment(1)).await.assert_success();
    assert_eq!(commit.notifications.len(), 1);
}

#[tokio::test]
async fn test_failed_fragment_is_contained() {
    let (mut sink, storage) = sink(SinkConfig::default());
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let demand = sink.on_stream_start(track.clone()).assert_success();

    storage.fail(FileKind::Segment, true);
    let manifests_before = storage.manifest_writes();
    let error = sink.on_fragment(demand, fragment(1)).await.unwrap_err();
    assert!(matches!(error, SinkError::ChangesetApplyFailed(_)));
    assert!(error.is_storage());
    assert_eq!(storage.manifest_writes(), manifests_before);
    assert!(sink.registry().is_awaiting(&track));

    // the host decides to carry on
    storage.fail(FileKind::Segment, false);
    let demand = sink.demand(&track).assert_success();
    let commit = sink.on_fragment(demand, fragment(1)).await.assert_success();
    assert_eq!(commit.notifications.len(), 1);

    // No rollback: the failed fragment stays in the playlist, so the retry got
    // a new name and the manifest still lists the segment which was never
    // stored.
    assert!(!storage.contains("video_segment_0.m4s"));
    assert!(storage.contains("video_segment_1.m4s"));
    let uris: Vec<_> = storage
        .media_playlist("video.m3u8")
        .segments
        .into_iter()
        .map(|s| s.uri)
        .collect();
    assert_eq!(uris, vec!["video_segment_0.m4s", "video_segment_1.m4s"]);
}

#[tokio::test]
async fn test_manifest_failure_emits_nothing() {
    let (mut sink, storage) = sink(SinkConfig::default());
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let demand = sink.on_stream_start(track.clone()).assert_success();

    storage.fail(FileKind::Manifest, true);
    let result = sink.on_fragment(demand, fragment(1)).await;
    assert!(matches!(result, Err(SinkError::ManifestWriteFailed(_))));
    assert!(storage.contains("video_segment_0.m4s"));
    assert!(sink.registry().is_awaiting(&track));
    assert!(!sink.registry().has_demand(&track));

    storage.fail(FileKind::Manifest, false);
    let demand = sink.demand(&track).assert_success();
    let commit = sink.on_fragment(demand, fragment(1)).await.assert_success();
    assert_eq!(commit.notifications.len(), 1);
}

#[tokio::test]
async fn test_stream_end_propagates_manifest_failure() {
    let (mut sink, storage) = sink(SinkConfig::default());
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let demand = sink.on_stream_start(track.clone()).assert_success();
    let _commit = sink.on_fragment(demand, fragment(1)).await.assert_success();

    storage.fail(FileKind::Manifest, true);
    let result = sink.on_stream_end(&track).await;
    assert!(matches!(result, Err(SinkError::ManifestWriteFailed(_))));
}

#[tokio::test]
async fn test_persist_teardown_failure_can_be_retried() {
    let (mut sink, storage) = sink(SinkConfig {
        persist: true,
        ..Default::default()
    });
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let demand = sink.on_stream_start(track.clone()).assert_success();
    let _commit = sink.on_fragment(demand, fragment(1)).await.assert_success();
    sink.on_stream_end(&track).await.assert_success();

    storage.fail(FileKind::Manifest, true);
    let result = sink.on_teardown().await;
    assert!(matches!(result, Err(SinkError::ManifestWriteFailed(_))));
    assert_eq!(sink.state(), PresentationState::Active);

    storage.fail(FileKind::Manifest, false);
    let cleanup = sink.on_teardown().await.assert_success();
    assert_eq!(sink.state(), PresentationState::Closed);
    assert_eq!(cleanup.files().len(), 2);
}

#[tokio::test]
async fn test_cleanup_failure_is_reported() {
    let (mut sink, storage) = sink(SinkConfig::default());
    let track = TrackId::from("video");

    sink.on_track_init(track, video()).await.assert_success();
    let cleanup = sink.on_teardown().await.assert_success();

    storage.fail_removal(true);
    let result = cleanup.execute().await;
    assert!(matches!(result, Err(SinkError::CleanupFailed(_))));
    assert!(!storage.ops().iter().any(|op| matches!(op, Op::Remove(_))));
}
