use crate::traits::{FallbackStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Prefix of every image path stored by the local fallback tier.
pub const LOCAL_UPLOADS_PREFIX: &str = "uploads/";

/// Local filesystem fallback tier
#[derive(Clone, Debug)]
pub struct LocalFallbackStore {
    uploads_dir: PathBuf,
}

impl LocalFallbackStore {
    /// Create a fallback store rooted at `uploads_dir` (served as `/uploads`).
    ///
    /// The directory is created lazily on the first store.
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        LocalFallbackStore {
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Convert a key to a path inside the uploads directory.
    ///
    /// Keys are flat file names; anything that could leave the directory is rejected.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {:?}",
                key
            )));
        }
        Ok(self.uploads_dir.join(key))
    }
}

#[async_trait]
impl FallbackStore for LocalFallbackStore {
    async fn store(&self, file_path: &Path, key: &str) -> StorageResult<String> {
        let target = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        fs::create_dir_all(&self.uploads_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create uploads directory {}: {}",
                self.uploads_dir.display(),
                e
            ))
        })?;

        let size = fs::copy(file_path, &target).await.map_err(|e| {
            tracing::error!(
                error = %e,
                source = %file_path.display(),
                key = %key,
                "Local fallback copy failed"
            );
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(file_path.display().to_string())
            } else {
                StorageError::UploadFailed(e.to_string())
            }
        })?;

        tracing::info!(
            key = %key,
            path = %target.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored image in local fallback tier"
        );

        Ok(format!("{}{}", LOCAL_UPLOADS_PREFIX, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn source_file(dir: &TempDir, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join("scratch.jpg");
        fs::write(&path, bytes).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_store_copies_and_keeps_source() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = source_file(&scratch, b"tiny").await;
        let store = LocalFallbackStore::new(root.path().join("uploads"));

        let stored = store.store(&src, "oak_0000001.jpg").await.unwrap();

        assert_eq!(stored, "uploads/oak_0000001.jpg");
        assert!(stored.starts_with(LOCAL_UPLOADS_PREFIX));
        assert!(src.exists());
        let copied = fs::read(root.path().join("uploads/oak_0000001.jpg"))
            .await
            .unwrap();
        assert_eq!(copied, b"tiny");
    }

    #[tokio::test]
    async fn test_store_creates_nested_directory() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = source_file(&scratch, b"x").await;
        let dir = root.path().join("a/b/uploads");
        let store = LocalFallbackStore::new(&dir);

        store.store(&src, "oak_0000002.jpg").await.unwrap();
        // Second call must not fail on the existing directory.
        store.store(&src, "oak_0000003.jpg").await.unwrap();

        assert!(dir.join("oak_0000002.jpg").exists());
        assert!(dir.join("oak_0000003.jpg").exists());
    }

    #[tokio::test]
    async fn test_store_rejects_traversal() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = source_file(&scratch, b"x").await;
        let store = LocalFallbackStore::new(root.path());

        for key in ["../escape.jpg", "nested/key.jpg", ""] {
            let result = store.store(&src, key).await;
            assert!(matches!(result, Err(StorageError::InvalidKey(_))), "{}", key);
        }
    }

    #[tokio::test]
    async fn test_store_missing_source() {
        let root = TempDir::new().unwrap();
        let store = LocalFallbackStore::new(root.path());
        let result = store
            .store(&root.path().join("missing.jpg"), "oak_0000004.jpg")
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
