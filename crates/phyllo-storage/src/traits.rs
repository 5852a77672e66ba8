//! Storage abstraction traits
//!
//! [`ObjectStore`] is the remote tier and [`FallbackStore`] the local one. The
//! ingestion pipeline only talks to these traits, so either tier can be swapped
//! for an in-memory double in tests.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::keys;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error text fragments providers use when an object falls below their size policy.
const SIZE_POLICY_MARKERS: &[&str] = &["too small", "entitytoosmall"];

/// Outcome of a remote storage attempt.
///
/// Failures are values rather than errors so the caller can decide between the
/// local fallback and aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Success { key: String, url: String },
    Failure { error: String },
}

impl UploadResult {
    pub fn failure(error: impl Into<String>) -> Self {
        UploadResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            UploadResult::Success { key, .. } => Some(key),
            UploadResult::Failure { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadResult::Success { url, .. } => Some(url),
            UploadResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadResult::Success { .. } => None,
            UploadResult::Failure { error } => Some(error),
        }
    }

    /// Whether this is a failure whose message reports a provider size-policy rejection.
    pub fn is_size_policy_violation(&self) -> bool {
        match self {
            UploadResult::Success { .. } => false,
            UploadResult::Failure { error } => {
                let error = error.to_lowercase();
                SIZE_POLICY_MARKERS.iter().any(|m| error.contains(m))
            }
        }
    }
}

/// Remote object storage tier.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `file_path` under `key` with a single non-multipart put.
    async fn upload(&self, file_path: &Path, key: &str, content_type: &str) -> UploadResult;

    /// Copy `old_key` to `new_key`, then delete `old_key`.
    ///
    /// A failed delete leaves the old object behind; it is logged and the rename
    /// still reports success for the new key.
    async fn rename_object(&self, old_key: &str, new_key: &str) -> UploadResult;

    /// Public URL of `key`.
    fn public_url(&self, key: &str) -> String;

    /// Whether `path` is a remote key rather than a local file reference.
    fn is_key_formatted(&self, path: &str) -> bool {
        keys::is_valid_key(path)
    }
}

/// Local fallback tier used when the remote tier rejects an object on size.
#[async_trait]
pub trait FallbackStore: Send + Sync {
    /// Copy the file at `file_path` into the uploads directory as `key` and return
    /// its path relative to the process, which always starts with the local prefix.
    async fn store(&self, file_path: &Path, key: &str) -> StorageResult<String>;
}
