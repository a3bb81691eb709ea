use std::{collections::VecDeque, time::Duration};

use crate::{changeset::ChunkChangeset, TrackId};

use super::TrackConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub duration: Duration,
    pub sequence: u64,
}

/// Segment list of one track with its sliding window.
#[derive(Debug)]
pub struct Track {
    config: TrackConfig,
    stem: String,
    header_name: String,

    /// Segments referenced by the live playlist.
    segments: VecDeque<Segment>,
    /// Segments trimmed from the window but kept in storage.
    stale_segments: VecDeque<Segment>,
    /// Total duration of `segments`.
    window_duration: Duration,

    next_sequence: u64,
    media_sequence: u64,
    max_segment_duration: Duration,
    finished: bool,
}

impl Track {
    pub fn new(config: TrackConfig) -> Self {
        let stem = config.id.file_stem();
        let header_name = format!("{stem}_header.{}", config.format.header_ext());

        Self {
            config,
            stem,
            header_name,
            segments: VecDeque::new(),
            stale_segments: VecDeque::new(),
            window_duration: Duration::ZERO,
            next_sequence: 0,
            media_sequence: 0,
            max_segment_duration: Duration::ZERO,
            finished: false,
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.config.id
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Prefix shared by every file of the track.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.stem)
    }

    pub fn segment_name(&self, sequence: u64) -> String {
        format!(
            "{}_segment_{sequence}.{}",
            self.stem,
            self.config.format.as_ext()
        )
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn stale_segments(&self) -> impl Iterator<Item = &Segment> {
        self.stale_segments.iter()
    }

    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    pub fn media_sequence(&self) -> u64 {
        self.media_sequence
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `EXT-X-TARGETDURATION` in whole seconds.
    pub fn target_duration(&self) -> u64 {
        let longest = self
            .max_segment_duration
            .max(self.config.target_fragment_duration);
        (longest.as_secs_f64().ceil() as u64).max(1)
    }

    pub fn add_segment(&mut self, duration: Duration) -> ChunkChangeset {
        let sequence = self.next_sequence;
        let name = self.segment_name(sequence);
        self.next_sequence += 1;

        self.segments.push_back(Segment {
            name: name.clone(),
            duration,
            sequence,
        });
        self.window_duration += duration;
        self.max_segment_duration = self.max_segment_duration.max(duration);

        let stale = self.pop_stale_segments();
        let removed = if self.config.persist {
            self.stale_segments.extend(stale);
            Vec::new()
        } else {
            stale.into_iter().map(|segment| segment.name).collect()
        };

        ChunkChangeset::add(name).with_removed(removed)
    }

    /// Trim the oldest segments as long as the remaining ones still cover the
    /// retention window.
    fn pop_stale_segments(&mut self) -> Vec<Segment> {
        let Some(target) = self.config.window.as_duration() else {
            return Vec::new();
        };

        let mut stale = Vec::new();
        while self.segments.len() > 1 {
            let oldest = self.segments[0].duration;
            if self.window_duration.saturating_sub(oldest) < target {
                break;
            }

            if let Some(segment) = self.segments.pop_front() {
                self.window_duration = self.window_duration.saturating_sub(segment.duration);
                self.media_sequence = segment.sequence + 1;
                stale.push(segment);
            }
        }
        stale
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn from_beginning(&mut self) {
        while let Some(segment) = self.stale_segments.pop_back() {
            self.window_duration += segment.duration;
            self.segments.push_front(segment);
        }
        self.media_sequence = self
            .segments
            .front()
            .map_or(self.next_sequence, |segment| segment.sequence);
    }

    /// Init segment followed by every segment name ever produced.
    pub fn all_segments(&self) -> Vec<String> {
        std::iter::once(self.header_name.clone())
            .chain((0..self.next_sequence).map(|sequence| self.segment_name(sequence)))
            .collect()
    }
}
