use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minimum span of recent media kept in the live playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionWindow {
    Finite(Duration),
    Infinite,
}

impl RetentionWindow {
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Finite(duration) => Some(*duration),
            Self::Infinite => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self::Finite(Duration::from_secs(5))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawWindow {
    Seconds(f64),
    Keyword(String),
}

impl Serialize for RetentionWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(duration) => RawWindow::Seconds(duration.as_secs_f64()),
            Self::Infinite => RawWindow::Keyword("infinite".to_string()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RetentionWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawWindow::deserialize(deserializer)? {
            RawWindow::Seconds(secs) => Duration::try_from_secs_f64(secs)
                .map(Self::Finite)
                .map_err(serde::de::Error::custom),
            RawWindow::Keyword(keyword) if keyword == "infinite" => Ok(Self::Infinite),
            RawWindow::Keyword(keyword) => Err(serde::de::Error::custom(format!(
                "invalid retention window: {keyword}"
            ))),
        }
    }
}

/// Where segments and manifests are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    File {
        path: PathBuf,
    },
    #[cfg(feature = "opendal-s3")]
    S3 {
        #[serde(flatten)]
        s3: opendal::services::S3Config,
        prefix: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Master manifest is written as `<manifest_name>.m3u8`.
    pub manifest_name: String,
    pub retention_window: RetentionWindow,
    pub persist: bool,
    /// Expected fragment duration in seconds, 0 for no hint.
    #[serde(with = "secs")]
    pub target_fragment_duration: Duration,
    pub storage: StorageConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            manifest_name: "index".to_string(),
            retention_window: RetentionWindow::default(),
            persist: false,
            target_fragment_duration: Duration::ZERO,
            storage: StorageConfig::default(),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
