use crate::traits::{ObjectStore, StorageError, StorageResult, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Provider error code for objects below the minimum accepted size.
const ENTITY_TOO_SMALL: &str = "EntityTooSmall";

/// Connection settings for an S3-compatible bucket.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (R2, MinIO, ...).
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base of the public URLs handed out for stored keys.
    pub public_base_url: String,
    pub timeout: Duration,
}

/// S3-compatible remote tier
#[derive(Clone)]
pub struct S3ObjectStore {
    store: Arc<dyn object_store::ObjectStore>,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Build a client for the configured bucket. Path-style addressing is used so
    /// that R2 and other S3-compatible endpoints work unchanged.
    pub fn new(settings: S3Settings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone())
            .with_virtual_hosted_style_request(false)
            .with_client_options(ClientOptions::new().with_timeout(settings.timeout));

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }
        if let Some(ref access_key_id) = settings.access_key_id {
            builder = builder.with_access_key_id(access_key_id.clone());
        }
        if let Some(ref secret) = settings.secret_access_key {
            builder = builder.with_secret_access_key(secret.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_store(
            Arc::new(store),
            settings.bucket,
            settings.public_base_url,
        ))
    }

    /// Wrap an existing `object_store` backend, e.g. `InMemory` in tests.
    pub fn with_store(
        store: Arc<dyn object_store::ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        S3ObjectStore {
            store,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn put_options(content_type: &str, size: usize) -> PutOptions {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        attributes.insert(
            Attribute::Metadata(Cow::Borrowed("original-size")),
            size.to_string().into(),
        );
        PutOptions {
            attributes,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, file_path: &Path, key: &str, content_type: &str) -> UploadResult {
        let data = match tokio::fs::read(file_path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %file_path.display(),
                    key = %key,
                    "Failed to read file for upload"
                );
                return UploadResult::failure(format!("Failed to read file for upload: {}", e));
            }
        };

        let size = data.len();
        if size < 1 {
            return UploadResult::failure("File is empty or too small to upload to object storage");
        }

        let location = ObjectPath::from(key);
        let opts = Self::put_options(content_type, size);
        let start = std::time::Instant::now();

        // Single-shot put: small images must never take the multipart path.
        let result: ObjectResult<_> = object_store::ObjectStore::put_opts(
            self.store.as_ref(),
            &location,
            PutPayload::from(Bytes::from(data)),
            opts,
        )
        .await;

        if let Err(e) = result {
            let message = e.to_string();
            tracing::error!(
                error = %message,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            if message.contains(ENTITY_TOO_SMALL) {
                return UploadResult::failure(format!(
                    "File is too small for object storage upload ({}): {}",
                    ENTITY_TOO_SMALL, message
                ));
            }
            return UploadResult::failure(message);
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        UploadResult::Success {
            key: key.to_string(),
            url: self.public_url(key),
        }
    }

    async fn rename_object(&self, old_key: &str, new_key: &str) -> UploadResult {
        let start = std::time::Instant::now();
        let from = ObjectPath::from(old_key);
        let to = ObjectPath::from(new_key);

        let copy_result: ObjectResult<_> = self.store.copy(&from, &to).await;
        if let Err(e) = copy_result {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                from_key = %old_key,
                to_key = %new_key,
                "S3 copy failed"
            );
            return UploadResult::failure(e.to_string());
        }

        let delete_result: ObjectResult<_> = self.store.delete(&from).await;
        if let Err(e) = delete_result {
            tracing::warn!(
                error = %e,
                bucket = %self.bucket,
                orphan_key = %old_key,
                to_key = %new_key,
                "S3 rename left the old object behind"
            );
        }

        tracing::info!(
            from_key = %old_key,
            to_key = %new_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 rename successful"
        );

        UploadResult::Success {
            key: new_key.to_string(),
            url: self.public_url(new_key),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}
