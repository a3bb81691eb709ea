mod handle;

pub use handle::SinkHandle;

use std::time::Duration;

use bytes::Bytes;

use crate::{
    config::SinkConfig,
    error::{SinkError, SinkResult},
    playlist::{HlsPlaylist, Playlist, TrackConfig},
    registry::{Demand, TrackRegistry},
    storage::{Cleanup, SinkStorage, Storage, StorageBackend},
    ContentType, SegmentFormat, TrackId,
};

/// Init metadata of a track.
#[derive(Debug, Clone)]
pub struct TrackInit {
    pub content_type: ContentType,
    pub format: SegmentFormat,
    /// Initialization segment.
    pub header: Bytes,

    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
}

impl TrackInit {
    pub fn new(content_type: ContentType, format: SegmentFormat, header: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            format,
            header: header.into(),
            bandwidth: None,
            codecs: None,
        }
    }

    pub fn with_bandwidth(mut self, bandwidth: u64) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    pub fn with_codecs(mut self, codecs: impl Into<String>) -> Self {
        self.codecs = Some(codecs.into());
        self
    }
}

/// One buffer of encoded media.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub payload: Bytes,
    pub duration: Duration,
}

impl Fragment {
    pub fn new(payload: impl Into<Bytes>, duration: Duration) -> Self {
        Self {
            payload: payload.into(),
            duration,
        }
    }
}

pub enum SinkNotification<B> {
    /// The first segment of the track is stored and listed in its manifest.
    TrackPlayable(TrackId),
    /// Removal of every file of the presentation, to be run by the host.
    Cleanup(Cleanup<B>),
}

impl<B> std::fmt::Debug for SinkNotification<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrackPlayable(track_id) => f.debug_tuple("TrackPlayable").field(track_id).finish(),
            Self::Cleanup(cleanup) => f.debug_tuple("Cleanup").field(cleanup).finish(),
        }
    }
}

/// Outcome of a committed fragment.
pub struct FragmentCommit<B> {
    /// Permission to send the next fragment of the same track.
    pub demand: Demand,
    pub notifications: Vec<SinkNotification<B>>,
}

impl<B> std::fmt::Debug for FragmentCommit<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentCommit")
            .field("demand", &self.demand)
            .field("notifications", &self.notifications)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    Active,
    Draining,
    Closed,
}

/// Packages fragments of many tracks into one presentation.
///
/// ```text
///  track init ──► playlist.add_track ──► storage.init
///
///  fragment ──► playlist.add_fragment ──► storage.apply_chunk_changeset
///                                               │
///                 demand ◄── track playable ◄── storage.store_manifests
/// ```
///
/// Every operation takes `&mut self`, so events of all tracks are applied
/// one at a time. Use [`Sink::spawn`] to feed it from several tasks.
pub struct Sink<P, B> {
    playlist: P,
    storage: Storage<B>,
    registry: TrackRegistry,
    config: SinkConfig,
    state: PresentationState,
}

impl Sink<HlsPlaylist, SinkStorage> {
    /// Build an HLS sink writing to the storage named in the config.
    pub fn from_config(config: SinkConfig) -> SinkResult<Self> {
        let playlist = HlsPlaylist::new(config.manifest_name.clone());
        let storage = SinkStorage::from_config(config.storage.clone())?;
        Ok(Self::new(playlist, storage, config))
    }
}

impl<P, B> Sink<P, B>
where
    P: Playlist,
    B: StorageBackend,
{
    pub fn new(playlist: P, storage: B, config: SinkConfig) -> Self {
        Self::with_storage(playlist, Storage::new(storage), config)
    }

    pub fn with_storage(playlist: P, storage: Storage<B>, config: SinkConfig) -> Self {
        Self {
            playlist,
            storage,
            registry: TrackRegistry::new(),
            config,
            state: PresentationState::Active,
        }
    }

    pub fn playlist(&self) -> &P {
        &self.playlist
    }

    pub fn storage(&self) -> &Storage<B> {
        &self.storage
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    fn ensure_active(&self) -> SinkResult<()> {
        match self.state {
            PresentationState::Active => Ok(()),
            _ => Err(SinkError::Closed),
        }
    }

    /// Add the track to the playlist and store its init segment.
    ///
    /// The track stays in the playlist even if storing the init segment
    /// fails. A track whose files would overwrite another file of the
    /// presentation is rejected before anything changes.
    pub async fn on_track_init(&mut self, track_id: TrackId, init: TrackInit) -> SinkResult<()> {
        self.ensure_active()?;

        let header_name = self.playlist.add_track(TrackConfig {
            id: track_id.clone(),
            content_type: init.content_type,
            format: init.format,
            window: self.config.retention_window,
            target_fragment_duration: self.config.target_fragment_duration,
            persist: self.config.persist,
            bandwidth: init.bandwidth,
            codecs: init.codecs,
        })?;
        self.registry.initialize(&track_id)?;

        self.storage
            .init(&header_name, init.header)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to store init segment of track {track_id}: {e}");
                SinkError::InitWriteFailed(e)
            })
    }

    /// Register the track as waiting to become playable and ask for its first
    /// fragment.
    pub fn on_stream_start(&mut self, track_id: TrackId) -> SinkResult<Demand> {
        self.ensure_active()?;
        self.registry.start(&track_id)?;
        tracing::info!("Stream of track {track_id} started.");

        self.registry.issue_demand(&track_id)
    }

    /// Commit one fragment: add it to the playlist, store the segment, then
    /// store the manifests.
    ///
    /// Nothing is rolled back on failure. The playlist keeps the fragment even
    /// if its bytes or the manifests could not be stored, and no demand is
    /// returned; call [`Sink::demand`] to continue the track.
    pub async fn on_fragment(
        &mut self,
        demand: Demand,
        fragment: Fragment,
    ) -> SinkResult<FragmentCommit<B>> {
        self.ensure_active()?;
        let track_id = self.registry.redeem(demand)?;
        self.registry.ensure_streaming(&track_id)?;

        let changeset = self.playlist.add_fragment(&track_id, fragment.duration);
        self.storage
            .apply_chunk_changeset(&changeset, fragment.payload)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to store fragment of track {track_id}: {e}");
                SinkError::ChangesetApplyFailed(e)
            })?;

        self.serialize_and_store_playlist().await?;
        tracing::debug!(
            "Committed {:?} of track {track_id}, {} stale file(s) removed.",
            changeset.to_add,
            changeset.to_remove.len()
        );

        let mut notifications = Vec::new();
        if self.registry.consume_if_awaiting(&track_id) {
            tracing::info!("Track {track_id} is playable.");
            notifications.push(SinkNotification::TrackPlayable(track_id.clone()));
        }

        let demand = self.registry.issue_demand(&track_id)?;
        Ok(FragmentCommit {
            demand,
            notifications,
        })
    }

    /// Ask for the next fragment of a streaming track which has no
    /// outstanding demand, e.g. after a failed fragment.
    pub fn demand(&mut self, track_id: &TrackId) -> SinkResult<Demand> {
        self.ensure_active()?;
        self.registry.ensure_streaming(track_id)?;
        self.registry.issue_demand(track_id)
    }

    /// Close the track and store its final manifest.
    pub async fn on_stream_end(&mut self, track_id: &TrackId) -> SinkResult<()> {
        self.ensure_active()?;
        self.registry.finish(track_id)?;
        self.playlist.finish(track_id);
        tracing::info!("Stream of track {track_id} ended.");

        let result = self.serialize_and_store_playlist().await;
        self.storage.clear_cache();
        result
    }

    /// Stop the presentation and hand out the removal of its files.
    ///
    /// In persist mode the playlist is rebuilt from its first segment and
    /// stored before the cleanup is returned. If that fails the presentation
    /// stays active, so teardown can be retried.
    pub async fn on_teardown(&mut self) -> SinkResult<Cleanup<B>> {
        self.ensure_active()?;
        self.state = PresentationState::Draining;

        let files = self.playlist.all_fragments();
        if self.config.persist {
            self.playlist.from_beginning();
            if let Err(e) = self.serialize_and_store_playlist().await {
                self.state = PresentationState::Active;
                return Err(e);
            }
        }

        self.state = PresentationState::Closed;
        tracing::info!(
            "Presentation {} closed, {} file(s) to clean up.",
            self.config.manifest_name,
            files.len()
        );
        Ok(self.storage.cleanup(files))
    }

    async fn serialize_and_store_playlist(&mut self) -> SinkResult<()> {
        let manifests = self.playlist.serialize();
        self.storage.store_manifests(manifests).await.map_err(|e| {
            tracing::warn!("Failed to store manifests: {e}");
            SinkError::ManifestWriteFailed(e)
        })
    }
}
