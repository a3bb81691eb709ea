use bytes::Bytes;

use super::StorageBackend;
use crate::{error::StorageResult, FileKind};

pub use opendal::*;

/// Writes files through an opendal [`Operator`], e.g. to an S3 bucket.
pub struct OpendalStorage {
    operator: Operator,
    prefix: String,
}

impl OpendalStorage {
    pub fn new(operator: Operator, prefix: impl Into<String>) -> Self {
        Self {
            operator,
            prefix: prefix.into(),
        }
    }

    fn file_key(&self, name: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        let name = name.replace('/', "__");
        if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        }
    }
}

impl StorageBackend for OpendalStorage {
    async fn store(&self, name: &str, content: Bytes, kind: FileKind) -> StorageResult<()> {
        let key = self.file_key(name);
        let mut writer = self.operator.write_with(&key, content);
        writer = writer.content_type(kind.content_type(name));
        if kind == FileKind::Manifest {
            writer = writer.cache_control("no-cache");
        }
        writer.await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        let key = self.file_key(name);
        self.operator.delete(&key).await?;
        Ok(())
    }

    fn location_hint(&self) -> Option<String> {
        Some(self.prefix.clone())
    }
}
