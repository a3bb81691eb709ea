use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use iori_sink::{
    ContentType, FileKind, Fragment, HlsPlaylist, SegmentFormat, Sink, SinkConfig, StorageBackend,
    StorageError, StorageResult, TrackInit,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Store(String, FileKind),
    Remove(String),
}

/// In-memory backend which records every operation, can be told to fail,
/// and checks that no media playlist references a missing segment.
#[derive(Default)]
pub struct RecordingStorage {
    files: Mutex<HashMap<String, Bytes>>,
    ops: Mutex<Vec<Op>>,
    failing_kinds: Mutex<HashSet<FileKind>>,
    fail_removal: Mutex<bool>,
    dangling: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, kind: FileKind, failing: bool) {
        let mut kinds = self.failing_kinds.lock().unwrap();
        if failing {
            kinds.insert(kind);
        } else {
            kinds.remove(&kind);
        }
    }

    pub fn fail_removal(&self, failing: bool) {
        *self.fail_removal.lock().unwrap() = failing;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> HashSet<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn manifest_writes(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::Store(_, FileKind::Manifest)))
            .count()
    }

    /// Segment URIs which a stored media playlist referenced before they
    /// were stored.
    pub fn dangling(&self) -> Vec<String> {
        self.dangling.lock().unwrap().clone()
    }

    pub fn media_playlist(&self, name: &str) -> m3u8_rs::MediaPlaylist {
        let content = self.files.lock().unwrap()[name].clone();
        m3u8_rs::parse_media_playlist_res(&content).expect("valid media playlist")
    }

    pub fn master_playlist(&self, name: &str) -> m3u8_rs::MasterPlaylist {
        let content = self.files.lock().unwrap()[name].clone();
        m3u8_rs::parse_master_playlist_res(&content).expect("valid master playlist")
    }

    fn check_references(&self, content: &Bytes, files: &HashMap<String, Bytes>) {
        let Ok(playlist) = m3u8_rs::parse_media_playlist_res(content) else {
            return;
        };
        let mut dangling = self.dangling.lock().unwrap();
        for segment in playlist.segments {
            if !files.contains_key(&segment.uri) {
                dangling.push(segment.uri);
            }
        }
    }
}

impl StorageBackend for RecordingStorage {
    async fn store(&self, name: &str, content: Bytes, kind: FileKind) -> StorageResult<()> {
        if self.failing_kinds.lock().unwrap().contains(&kind) {
            return Err(StorageError::Rejected(name.to_string()));
        }

        let mut files = self.files.lock().unwrap();
        if kind == FileKind::Manifest {
            self.check_references(&content, &files);
        }
        files.insert(name.to_string(), content);
        self.ops
            .lock()
            .unwrap()
            .push(Op::Store(name.to_string(), kind));
        Ok(())
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        if *self.fail_removal.lock().unwrap() {
            return Err(StorageError::Rejected(name.to_string()));
        }

        self.files.lock().unwrap().remove(name);
        self.ops.lock().unwrap().push(Op::Remove(name.to_string()));
        Ok(())
    }
}

pub type TestSink = Sink<HlsPlaylist, Arc<RecordingStorage>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("iori_sink=debug")
        .with_test_writer()
        .try_init();
}

pub fn sink(config: SinkConfig) -> (TestSink, Arc<RecordingStorage>) {
    init_tracing();
    let storage = RecordingStorage::new();
    let sink = Sink::new(
        HlsPlaylist::new(config.manifest_name.clone()),
        storage.clone(),
        config,
    );
    (sink, storage)
}

pub fn video() -> TrackInit {
    TrackInit::new(ContentType::Video, SegmentFormat::M4s, "video-init")
}

pub fn audio() -> TrackInit {
    TrackInit::new(ContentType::Audio, SegmentFormat::Cmfa, "audio-init")
}

pub fn fragment_ms(millis: u64) -> Fragment {
    Fragment::new(format!("fragment-{millis}"), Duration::from_millis(millis))
}

pub fn fragment(secs: u64) -> Fragment {
    fragment_ms(secs * 1000)
}
