use crate::local::LocalFallbackStore;
#[cfg(feature = "storage-s3")]
use crate::s3::{S3ObjectStore, S3Settings};
use crate::traits::{FallbackStore, ObjectStore, StorageResult};
use phyllo_core::Config;
use std::sync::Arc;

/// Create the remote tier from configuration
#[cfg(feature = "storage-s3")]
pub fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    let settings = S3Settings {
        bucket: config.r2_bucket().to_string(),
        region: config.r2_region().to_string(),
        endpoint: config.r2_endpoint(),
        access_key_id: config.r2_access_key_id().map(String::from),
        secret_access_key: config.r2_secret_access_key().map(String::from),
        public_base_url: config.r2_public_base_url().to_string(),
        timeout: config.storage_timeout(),
    };

    tracing::info!(
        bucket = %settings.bucket,
        region = %settings.region,
        endpoint = ?settings.endpoint,
        "Initializing S3-compatible object store"
    );

    let store = S3ObjectStore::new(settings)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-s3"))]
pub fn create_object_store(_config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    Err(crate::traits::StorageError::ConfigError(
        "Remote storage not available (storage-s3 feature not enabled)".to_string(),
    ))
}

/// Create the local fallback tier from configuration
pub fn create_fallback_store(config: &Config) -> Arc<dyn FallbackStore> {
    Arc::new(LocalFallbackStore::new(config.uploads_dir().clone()))
}
