mod hls;
pub mod track;

pub use hls::HlsPlaylist;

use std::{collections::BTreeMap, time::Duration};

use bytes::Bytes;

use crate::{
    changeset::ChunkChangeset, config::RetentionWindow, error::SinkResult, ContentType,
    SegmentFormat, TrackId,
};

/// Serialized manifests keyed by file name.
pub type PlaylistFiles = BTreeMap<String, Bytes>;

/// Everything the playlist needs to know about a new track.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub id: TrackId,
    pub content_type: ContentType,
    pub format: SegmentFormat,
    pub window: RetentionWindow,
    /// Expected fragment duration. Zero means no hint.
    pub target_fragment_duration: Duration,
    /// Keep trimmed segments in storage so they can be restored at teardown.
    pub persist: bool,

    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
}

/// The manifest model of a presentation.
///
/// Implementations are pure: they decide file names and windowing, but never
/// touch storage. Calling a track operation with an id which was not added
/// is a programming error and may panic.
pub trait Playlist: Send + 'static {
    /// Add a track and return the name of its initialization segment.
    ///
    /// Fails without changing anything if the track was already added, or if
    /// its files would share a name with a file of the presentation.
    fn add_track(&mut self, config: TrackConfig) -> SinkResult<String>;

    fn has_track(&self, track_id: &TrackId) -> bool;

    /// Append a fragment to the track and trim the sliding window.
    ///
    /// The returned changeset never deletes a segment that the manifests
    /// serialized afterwards still reference.
    fn add_fragment(&mut self, track_id: &TrackId, duration: Duration) -> ChunkChangeset;

    /// Close the track so its manifest describes a finished list.
    fn finish(&mut self, track_id: &TrackId);

    /// Restore every trimmed segment which was kept in storage.
    fn from_beginning(&mut self);

    /// Every file the playlist ever produced, trimmed ones included.
    fn all_fragments(&self) -> Vec<String>;

    fn serialize(&self) -> PlaylistFiles;
}
