use std::time::Duration;

use bytes::Bytes;
use m3u8_rs::{
    AlternativeMedia, AlternativeMediaType, Map, MasterPlaylist, MediaPlaylist, MediaPlaylistType,
    MediaSegment, VariantStream,
};

use super::{track::Track, Playlist, PlaylistFiles, TrackConfig};
use crate::{
    changeset::ChunkChangeset,
    error::{SinkError, SinkResult},
    ContentType, TrackId,
};

const HLS_VERSION: usize = 7;
const AUDIO_GROUP_ID: &str = "audio";
const DEFAULT_BANDWIDTH: u64 = 2_560_000;

/// HLS manifest model: one master playlist plus one media playlist per track.
pub struct HlsPlaylist {
    name: String,
    tracks: Vec<Track>,
}

impl HlsPlaylist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn master_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }

    pub fn track(&self, track_id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id() == track_id)
    }

    fn track_mut(&mut self, track_id: &TrackId) -> &mut Track {
        self.tracks
            .iter_mut()
            .find(|track| track.id() == track_id)
            .unwrap_or_else(|| panic!("Unknown track: {track_id}"))
    }

    fn master_playlist(&self) -> MasterPlaylist {
        let has_video = self
            .tracks
            .iter()
            .any(|track| track.config().content_type != ContentType::Audio);
        let has_audio = self
            .tracks
            .iter()
            .any(|track| track.config().content_type == ContentType::Audio);
        // audio renditions are only grouped when a variant can reference them
        let audio_group = (has_video && has_audio).then(|| AUDIO_GROUP_ID.to_string());

        let mut variants = Vec::new();
        let mut alternatives = Vec::new();
        for track in &self.tracks {
            let config = track.config();
            if config.content_type == ContentType::Audio && audio_group.is_some() {
                alternatives.push(AlternativeMedia {
                    media_type: AlternativeMediaType::Audio,
                    uri: Some(track.playlist_name()),
                    group_id: AUDIO_GROUP_ID.to_string(),
                    name: track.id().to_string(),
                    default: alternatives.is_empty(),
                    autoselect: true,
                    ..Default::default()
                });
                continue;
            }

            variants.push(VariantStream {
                uri: track.playlist_name(),
                bandwidth: config.bandwidth.unwrap_or(DEFAULT_BANDWIDTH),
                codecs: config.codecs.clone(),
                audio: match config.content_type {
                    ContentType::Audio => None,
                    _ => audio_group.clone(),
                },
                ..Default::default()
            });
        }

        MasterPlaylist {
            version: Some(HLS_VERSION),
            independent_segments: true,
            variants,
            alternatives,
            ..Default::default()
        }
    }

    fn media_playlist(track: &Track) -> MediaPlaylist {
        let with_map = track.config().format.is_fragmented_mp4();
        let segments = track
            .segments()
            .enumerate()
            .map(|(index, segment)| MediaSegment {
                uri: segment.name.clone(),
                duration: segment.duration.as_secs_f32(),
                map: (with_map && index == 0).then(|| Map {
                    uri: track.header_name().to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect();

        MediaPlaylist {
            version: Some(HLS_VERSION),
            target_duration: track.target_duration() as _,
            media_sequence: track.media_sequence(),
            segments,
            end_list: track.is_finished(),
            playlist_type: track
                .config()
                .window
                .is_infinite()
                .then_some(MediaPlaylistType::Event),
            independent_segments: true,
            ..Default::default()
        }
    }
}

fn write_playlist<F>(write: F) -> Bytes
where
    F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
{
    let mut buffer = Vec::new();
    write(&mut buffer).expect("writing a playlist into memory never fails");
    Bytes::from(buffer)
}

impl Playlist for HlsPlaylist {
    fn add_track(&mut self, config: TrackConfig) -> SinkResult<String> {
        if self.has_track(&config.id) {
            return Err(SinkError::TrackAlreadyInitialized(config.id));
        }

        let track = Track::new(config);
        if track.playlist_name() == self.master_name() {
            return Err(SinkError::TrackNameConflict(
                track.id().clone(),
                self.master_name(),
            ));
        }
        // every file name of a track is derived from its stem
        if let Some(other) = self.tracks.iter().find(|other| other.stem() == track.stem()) {
            return Err(SinkError::TrackNameConflict(
                track.id().clone(),
                other.playlist_name(),
            ));
        }

        let header_name = track.header_name().to_string();
        tracing::info!("Track {} added to playlist {}", track.id(), self.name);
        self.tracks.push(track);
        Ok(header_name)
    }

    fn has_track(&self, track_id: &TrackId) -> bool {
        self.track(track_id).is_some()
    }

    fn add_fragment(&mut self, track_id: &TrackId, duration: Duration) -> ChunkChangeset {
        self.track_mut(track_id).add_segment(duration)
    }

    fn finish(&mut self, track_id: &TrackId) {
        self.track_mut(track_id).finish();
    }

    fn from_beginning(&mut self) {
        for track in &mut self.tracks {
            track.from_beginning();
        }
    }

    fn all_fragments(&self) -> Vec<String> {
        self.tracks.iter().flat_map(Track::all_segments).collect()
    }

    fn serialize(&self) -> PlaylistFiles {
        let mut files = PlaylistFiles::new();

        let master = self.master_playlist();
        files.insert(
            self.master_name(),
            write_playlist(|buffer| master.write_to(buffer)),
        );

        for track in &self.tracks {
            let media = Self::media_playlist(track);
            files.insert(
                track.playlist_name(),
                write_playlist(|buffer| media.write_to(buffer)),
            );
        }

        files
    }
}
