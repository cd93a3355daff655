//! Filesystem-backed blob store.
//!
//! Objects live at `<root>/<bucket>/<key>`. Writes go to a temporary file in
//! the target directory and are renamed into place, so readers never see a
//! partially written object.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{ArchiveError, Result, store::BlobStore};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a blob store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_segment(bucket)?;
        validate_segment(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

/// Rejects empty, absolute, and parent-relative paths.
fn validate_segment(segment: &str) -> Result<()> {
    let path = Path::new(segment);
    let valid = !segment.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidKey(segment.to_string()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| ArchiveError::InvalidKey(key.to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store
            .put("sales-archive", "sales/20240101/abc.json", b"{\"id\":\"abc\"}".to_vec())
            .await
            .unwrap();

        let on_disk = std::fs::read(dir.path().join("sales-archive/sales/20240101/abc.json"))
            .unwrap();
        assert_eq!(on_disk, b"{\"id\":\"abc\"}");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("b", "k.json", b"a much longer body".to_vec()).await.unwrap();
        store.put("b", "k.json", b"short".to_vec()).await.unwrap();

        assert_eq!(store.get("b", "k.json").await.unwrap(), Some(b"short".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.get("b", "missing.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        for key in ["../escape.json", "/etc/passwd", ""] {
            let result = store.put("b", key, b"x".to_vec()).await;
            assert!(matches!(result, Err(ArchiveError::InvalidKey(_))), "key {key:?}");
        }
    }
}
