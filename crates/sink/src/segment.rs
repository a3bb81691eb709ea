use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Identifier of one media substream, stable for the life of the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(Arc<str>);

impl TrackId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name usable as a file name prefix.
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "__")
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Video,
    Audio,
    /// Audio and video in the same segments.
    Muxed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentFormat {
    #[default]
    #[serde(rename = "ts", alias = "mpeg2ts")]
    Mpeg2TS,
    Mp4,
    M4s,
    M4a,
    Cmfv,
    Cmfa,
    Other(String),
}

impl SegmentFormat {
    pub fn as_ext(&self) -> &str {
        match self {
            Self::Mpeg2TS => "ts",
            Self::Mp4 => "mp4",
            Self::M4s => "m4s",
            Self::M4a => "m4a",
            Self::Cmfv => "cmfv",
            Self::Cmfa => "cmfa",
            Self::Other(ext) => ext.as_str(),
        }
    }

    /// Extension of the initialization segment.
    pub fn header_ext(&self) -> &str {
        match self {
            Self::Mpeg2TS => "ts",
            Self::Cmfv | Self::Cmfa => self.as_ext(),
            Self::Other(ext) => ext.as_str(),
            _ => "mp4",
        }
    }

    /// Fragmented MP4 family formats need the init segment referenced by
    /// `EXT-X-MAP`.
    pub fn is_fragmented_mp4(&self) -> bool {
        matches!(
            self,
            Self::Mp4 | Self::M4s | Self::M4a | Self::Cmfv | Self::Cmfa
        )
    }

    pub fn from_filename(s: &str) -> Self {
        let (_, ext) = s.rsplit_once('.').unwrap_or(("", s));
        match ext {
            "ts" => Self::Mpeg2TS,
            "mp4" | "m4f" => Self::Mp4,
            "m4s" => Self::M4s,
            "m4a" => Self::M4a,
            "cmfv" => Self::Cmfv,
            "cmfa" => Self::Cmfa,
            _ => Self::Other(ext.to_string()),
        }
    }
}

/// What a stored file is, so backends can pick content types or write modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Header,
    Segment,
    Manifest,
}

impl FileKind {
    pub fn content_type(&self, name: &str) -> &'static str {
        match self {
            Self::Manifest => "application/vnd.apple.mpegurl",
            Self::Header | Self::Segment => match SegmentFormat::from_filename(name) {
                SegmentFormat::Mpeg2TS => "video/mp2t",
                SegmentFormat::M4a | SegmentFormat::Cmfa => "audio/mp4",
                SegmentFormat::Other(_) => "application/octet-stream",
                _ => "video/mp4",
            },
        }
    }
}
