pub mod file;
pub mod memory;
#[cfg(feature = "opendal")]
pub mod opendal;

use std::{collections::HashMap, future::Future, sync::Arc};

use bytes::Bytes;
use futures::future::try_join_all;

use crate::{
    changeset::ChunkChangeset,
    config::StorageConfig,
    error::{SinkError, SinkResult, StorageResult},
    playlist::PlaylistFiles,
    FileKind,
};

/// A durable sink for named blobs.
///
/// Backends only know about names and bytes. Ordering of writes, windowing
/// and manifest contents are decided by the sink.
pub trait StorageBackend: Send + Sync + 'static {
    /// Store `content` under `name`, replacing any previous content.
    fn store(
        &self,
        name: &str,
        content: Bytes,
        kind: FileKind,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Remove the file. Removing a file which does not exist succeeds.
    fn remove(&self, name: &str) -> impl Future<Output = StorageResult<()>> + Send;

    /// Hint a location for the stored files.
    fn location_hint(&self) -> Option<String> {
        None
    }
}

impl<B> StorageBackend for Arc<B>
where
    B: StorageBackend,
{
    fn store(
        &self,
        name: &str,
        content: Bytes,
        kind: FileKind,
    ) -> impl Future<Output = StorageResult<()>> + Send {
        self.as_ref().store(name, content, kind)
    }

    fn remove(&self, name: &str) -> impl Future<Output = StorageResult<()>> + Send {
        self.as_ref().remove(name)
    }

    fn location_hint(&self) -> Option<String> {
        self.as_ref().location_hint()
    }
}

/// Storage as seen by the sink.
///
/// Manifests are cached after every successful write, so unchanged manifests
/// are not rewritten.
pub struct Storage<B> {
    backend: Arc<B>,
    manifest_cache: HashMap<String, Bytes>,
}

impl<B> Storage<B>
where
    B: StorageBackend,
{
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            manifest_cache: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub async fn init(&mut self, name: &str, content: Bytes) -> StorageResult<()> {
        self.backend.store(name, content, FileKind::Header).await
    }

    /// Write every new segment, then remove the stale ones.
    pub async fn apply_chunk_changeset(
        &mut self,
        changeset: &ChunkChangeset,
        payload: Bytes,
    ) -> StorageResult<()> {
        for name in &changeset.to_add {
            self.backend
                .store(name, payload.clone(), FileKind::Segment)
                .await?;
        }

        try_join_all(
            changeset
                .to_remove
                .iter()
                .map(|name| self.backend.remove(name)),
        )
        .await?;

        Ok(())
    }

    pub async fn store_manifests(&mut self, manifests: PlaylistFiles) -> StorageResult<()> {
        for (name, content) in manifests {
            if self.manifest_cache.get(&name) == Some(&content) {
                continue;
            }

            self.backend
                .store(&name, content.clone(), FileKind::Manifest)
                .await?;
            self.manifest_cache.insert(name, content);
        }

        Ok(())
    }

    pub fn clear_cache(&mut self) {
        self.manifest_cache.clear();
    }

    pub fn cleanup(&self, files: Vec<String>) -> Cleanup<B> {
        Cleanup {
            backend: self.backend.clone(),
            files,
        }
    }
}

/// Deferred removal of every file a presentation produced.
///
/// Nothing is removed until [`Cleanup::execute`] is called, so the host can
/// keep serving a finished presentation for as long as it needs.
#[must_use = "files are only removed when the cleanup is executed"]
pub struct Cleanup<B> {
    backend: Arc<B>,
    files: Vec<String>,
}

impl<B> Cleanup<B>
where
    B: StorageBackend,
{
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub async fn execute(self) -> SinkResult<()> {
        tracing::info!("Removing {} files.", self.files.len());
        try_join_all(self.files.iter().map(|name| self.backend.remove(name)))
            .await
            .map_err(SinkError::CleanupFailed)?;
        Ok(())
    }
}

impl<B> std::fmt::Debug for Cleanup<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleanup")
            .field("files", &self.files)
            .finish()
    }
}

/// Storage backend picked from [`StorageConfig`].
pub enum SinkStorage {
    Memory(memory::MemoryStorage),
    File(file::FileStorage),
    #[cfg(feature = "opendal")]
    Opendal(self::opendal::OpendalStorage),
}

impl SinkStorage {
    pub fn memory() -> Self {
        Self::Memory(memory::MemoryStorage::new())
    }

    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::File(file::FileStorage::new(path.into()))
    }

    #[cfg(feature = "opendal")]
    pub fn opendal(operator: ::opendal::Operator, prefix: impl Into<String>) -> Self {
        Self::Opendal(self::opendal::OpendalStorage::new(operator, prefix))
    }

    pub fn from_config(config: StorageConfig) -> StorageResult<Self> {
        Ok(match config {
            StorageConfig::Memory => Self::memory(),
            StorageConfig::File { path } => Self::file(path),
            #[cfg(feature = "opendal-s3")]
            StorageConfig::S3 { s3, prefix } => {
                let operator = ::opendal::Operator::from_config(s3)?.finish();
                Self::opendal(operator, prefix)
            }
        })
    }
}

impl StorageBackend for SinkStorage {
    async fn store(&self, name: &str, content: Bytes, kind: FileKind) -> StorageResult<()> {
        match self {
            SinkStorage::Memory(storage) => storage.store(name, content, kind).await,
            SinkStorage::File(storage) => storage.store(name, content, kind).await,
            #[cfg(feature = "opendal")]
            SinkStorage::Opendal(storage) => storage.store(name, content, kind).await,
        }
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        match self {
            SinkStorage::Memory(storage) => storage.remove(name).await,
            SinkStorage::File(storage) => storage.remove(name).await,
            #[cfg(feature = "opendal")]
            SinkStorage::Opendal(storage) => storage.remove(name).await,
        }
    }

    fn location_hint(&self) -> Option<String> {
        match self {
            SinkStorage::Memory(storage) => storage.location_hint(),
            SinkStorage::File(storage) => storage.location_hint(),
            #[cfg(feature = "opendal")]
            SinkStorage::Opendal(storage) => storage.location_hint(),
        }
    }
}
