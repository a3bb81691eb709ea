use std::{io, path::PathBuf};

use bytes::Bytes;

use super::StorageBackend;
use crate::{error::StorageResult, FileKind};

/// Writes every file into one directory.
pub struct FileStorage {
    output_dir: PathBuf,
}

impl FileStorage {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    async fn ensure_output_dir(&self) -> StorageResult<()> {
        if !self.output_dir.exists() {
            tokio::fs::create_dir_all(&self.output_dir).await?;
        }

        Ok(())
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name.replace('/', "__"))
    }
}

impl StorageBackend for FileStorage {
    async fn store(&self, name: &str, content: Bytes, kind: FileKind) -> StorageResult<()> {
        self.ensure_output_dir().await?;

        let path = self.file_path(name);
        if kind == FileKind::Manifest {
            // players poll manifests, so replace them atomically
            let tmp_path = path.with_extension("m3u8.tmp");
            tokio::fs::write(&tmp_path, &content).await?;
            tokio::fs::rename(&tmp_path, &path).await?;
        } else {
            tokio::fs::write(&path, &content).await?;
        }

        Ok(())
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.file_path(name)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn location_hint(&self) -> Option<String> {
        Some(self.output_dir.display().to_string())
    }
}
