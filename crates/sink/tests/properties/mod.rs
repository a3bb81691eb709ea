use std::{collections::HashSet, time::Duration};

use iori_sink::{Playlist, RetentionWindow, SinkConfig, SinkNotification, TrackId};

use crate::{
    common::{audio, fragment, fragment_ms, sink, video},
    AssertWrapper,
};

const DURATIONS_MS: [u64; 12] = [
    2000, 1500, 3000, 500, 2500, 4000, 1000, 1000, 6000, 250, 2000, 3500,
];

#[tokio::test]
async fn test_manifest_never_references_missing_segment() {
    let (mut sink, storage) = sink(SinkConfig {
        retention_window: RetentionWindow::Finite(Duration::from_secs(4)),
        ..Default::default()
    });
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let mut demand = sink.on_stream_start(track.clone()).assert_success();
    for millis in DURATIONS_MS {
        demand = sink
            .on_fragment(demand, fragment_ms(millis))
            .await
            .assert_success()
            .demand;
    }
    sink.on_stream_end(&track).await.assert_success();

    assert!(storage.manifest_writes() > DURATIONS_MS.len());
    assert_eq!(storage.dangling(), Vec::<String>::new());
    drop(demand);
}

#[tokio::test]
async fn test_track_playable_exactly_once_per_track() {
    let (mut sink, _) = sink(SinkConfig::default());
    let video_id = TrackId::from("video");
    let audio_id = TrackId::from("audio");

    sink.on_track_init(video_id.clone(), video())
        .await
        .assert_success();
    sink.on_track_init(audio_id.clone(), audio())
        .await
        .assert_success();
    let mut video_demand = sink.on_stream_start(video_id.clone()).assert_success();
    let mut audio_demand = sink.on_stream_start(audio_id.clone()).assert_success();

    let mut playable = Vec::new();
    for _ in 0..20 {
        let commit = sink.on_fragment(video_demand, fragment(1)).await.assert_success();
        video_demand = commit.demand;
        playable.extend(commit.notifications);

        let commit = sink.on_fragment(audio_demand, fragment(1)).await.assert_success();
        audio_demand = commit.demand;
        playable.extend(commit.notifications);
    }

    let playable: Vec<_> = playable
        .into_iter()
        .map(|notification| match notification {
            SinkNotification::TrackPlayable(id) => id,
            SinkNotification::Cleanup(_) => panic!("unexpected cleanup"),
        })
        .collect();
    assert_eq!(playable, vec![video_id, audio_id]);
    drop((video_demand, audio_demand));
}

#[tokio::test]
async fn test_window_retains_at_least_target() {
    let window = Duration::from_secs(5);
    let (mut sink, _) = sink(SinkConfig {
        retention_window: RetentionWindow::Finite(window),
        ..Default::default()
    });
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let mut demand = sink.on_stream_start(track.clone()).assert_success();

    let mut cumulative = Duration::ZERO;
    for millis in DURATIONS_MS {
        demand = sink
            .on_fragment(demand, fragment_ms(millis))
            .await
            .assert_success()
            .demand;
        cumulative += Duration::from_millis(millis);

        let state = sink.playlist().track(&track).assert_success();
        let retained = state.window_duration();
        let oldest = state.segments().next().assert_success().duration;
        if cumulative >= window {
            assert!(retained >= window, "{retained:?} < {window:?}");
        } else {
            assert_eq!(retained, cumulative);
        }
        // trimming stops as soon as one more pop would break the window
        if state.segments().count() > 1 {
            assert!(retained - oldest < window);
        }
    }
    drop(demand);
}

#[tokio::test]
async fn test_persist_restores_full_history() {
    let (mut sink, storage) = sink(SinkConfig {
        retention_window: RetentionWindow::Finite(Duration::from_secs(2)),
        persist: true,
        ..Default::default()
    });
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let mut demand = sink.on_stream_start(track.clone()).assert_success();
    for _ in 0..6 {
        demand = sink
            .on_fragment(demand, fragment(1))
            .await
            .assert_success()
            .demand;
    }
    drop(demand);

    // trimmed from the live playlist, but still stored
    let live = storage.media_playlist("video.m3u8");
    assert_eq!(live.segments.len(), 2);
    assert_eq!(live.media_sequence, 4);
    assert!(storage.contains("video_segment_0.m4s"));

    sink.on_stream_end(&track).await.assert_success();
    let cleanup = sink.on_teardown().await.assert_success();

    let rebuilt = storage.media_playlist("video.m3u8");
    assert_eq!(rebuilt.media_sequence, 0);
    assert!(rebuilt.end_list);
    let uris: Vec<_> = rebuilt.segments.iter().map(|s| s.uri.clone()).collect();
    let expected: Vec<_> = (0..6).map(|i| format!("video_segment_{i}.m4s")).collect();
    assert_eq!(uris, expected);
    assert_eq!(storage.dangling(), Vec::<String>::new());
    assert_eq!(cleanup.files().len(), 7);
}

#[tokio::test]
async fn test_teardown_without_persist_does_not_rebuild() {
    let (mut sink, storage) = sink(SinkConfig {
        retention_window: RetentionWindow::Finite(Duration::from_secs(2)),
        ..Default::default()
    });
    let track = TrackId::from("video");

    sink.on_track_init(track.clone(), video())
        .await
        .assert_success();
    let mut demand = sink.on_stream_start(track.clone()).assert_success();
    for _ in 0..6 {
        demand = sink
            .on_fragment(demand, fragment(1))
            .await
            .assert_success()
            .demand;
    }
    drop(demand);

    let ops_before = storage.ops().len();
    let _cleanup = sink.on_teardown().await.assert_success();
    assert_eq!(storage.ops().len(), ops_before);
    assert_eq!(storage.media_playlist("video.m3u8").segments.len(), 2);
}

#[tokio::test]
async fn test_cleanup_covers_every_produced_file() {
    let (mut sink, storage) = sink(SinkConfig {
        retention_window: RetentionWindow::Finite(Duration::from_secs(1)),
        ..Default::default()
    });
    let video_id = TrackId::from("video");
    let audio_id = TrackId::from("audio");

    sink.on_track_init(video_id.clone(), video())
        .await
        .assert_success();
    sink.on_track_init(audio_id.clone(), audio())
        .await
        .assert_success();
    let mut video_demand = sink.on_stream_start(video_id.clone()).assert_success();
    let mut audio_demand = sink.on_stream_start(audio_id.clone()).assert_success();

    for _ in 0..5 {
        video_demand = sink
            .on_fragment(video_demand, fragment(1))
            .await
            .assert_success()
            .demand;
    }
    for _ in 0..3 {
        audio_demand = sink
            .on_fragment(audio_demand, fragment(1))
            .await
            .assert_success()
            .demand;
    }
    drop((video_demand, audio_demand));

    let produced: HashSet<String> = ["video_header.mp4", "audio_header.cmfa"]
        .into_iter()
        .map(String::from)
        .chain((0..5).map(|i| format!("video_segment_{i}.m4s")))
        .chain((0..3).map(|i| format!("audio_segment_{i}.cmfa")))
        .collect();

    let cleanup = sink.on_teardown().await.assert_success();
    let files: HashSet<String> = cleanup.files().iter().cloned().collect();
    assert_eq!(files, produced);
    assert_eq!(files, sink.playlist().all_fragments().into_iter().collect());

    cleanup.execute().await.assert_success();
    let left = storage.names();
    assert!(left.iter().all(|name| name.ends_with(".m3u8")));
}
