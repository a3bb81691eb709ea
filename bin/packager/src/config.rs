use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use iori_sink::{ContentType, SegmentFormat, SinkConfig, TrackInit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sink: SinkConfig,
    pub tracks: Vec<TrackSource>,
}

/// A track replayed from files on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSource {
    pub id: String,
    #[serde(default)]
    pub content_type: ContentType,
    pub format: SegmentFormat,
    /// Init segment of the track.
    pub init: PathBuf,
    /// Directory holding one file per fragment, replayed in file name order.
    pub fragments: PathBuf,
    /// Duration of every fragment in seconds.
    pub fragment_duration: f64,
    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
}

impl TrackSource {
    pub fn fragment_duration(&self) -> anyhow::Result<Duration> {
        Ok(Duration::try_from_secs_f64(self.fragment_duration)?)
    }

    pub fn track_init(&self, header: Vec<u8>) -> TrackInit {
        let mut init = TrackInit::new(self.content_type, self.format.clone(), header);
        if let Some(bandwidth) = self.bandwidth {
            init = init.with_bandwidth(bandwidth);
        }
        if let Some(codecs) = &self.codecs {
            init = init.with_codecs(codecs);
        }
        init
    }

    /// Fragment files sorted by name. The init file is skipped if it lives in
    /// the same directory.
    pub async fn fragment_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.fragments).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || same_file(&path, &self.init) {
                continue;
            }
            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }
}
