//! Leaf image ingestion
//!
//! One upload runs through a fixed sequence of stages:
//!
//! 1. the image is written to a scratch file,
//! 2. the classifier decides whether it is a plant and labels it,
//! 3. a storage key is derived from the species label,
//! 4. the image goes to the remote tier, or to the local tier when the remote
//!    tier rejects it on size policy,
//! 5. the classification is persisted.
//!
//! Each stage returns `Result<_, IngestionFailure>` and the scratch file is
//! released once, after the last stage ran, on success and on every failure.

use crate::error::HttpAppError;
use crate::services::scratch::ScratchFile;
use crate::utils::upload::UploadedImage;
use phyllo_core::models::{
    ClassificationOutcome, ClassificationRecord, InferenceResult, NewClassification,
};
use phyllo_core::{AppError, Config, StorageTier};
use phyllo_db::ClassificationRecordStore;
use phyllo_services::{Classifier, InferenceError};
use phyllo_storage::{extension_of, generate_key, FallbackStore, ObjectStore, UploadResult};
use rand::Rng;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Unique identifiers are drawn from `0..10^7` so they always fit the key width.
const UNIQUE_ID_SPACE: u32 = 10_000_000;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scratch_dir: PathBuf,
    pub inference_timeout: Duration,
    pub storage_timeout: Duration,
    /// Files below this size are treated as a size-policy rejection even when
    /// the provider's error text does not say so.
    pub min_object_size_bytes: u64,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        PipelineSettings {
            scratch_dir: config.scratch_dir().clone(),
            inference_timeout: config.inference_timeout(),
            storage_timeout: config.storage_timeout(),
            min_object_size_bytes: config.min_object_size_bytes(),
        }
    }
}

/// Every way an ingestion run can end without a record.
#[derive(Debug)]
pub enum IngestionFailure {
    /// The scratch copy could not be written or read back.
    Scratch(io::Error),
    NotAPlant,
    Inference(InferenceError),
    InferenceTimedOut,
    /// The file name cannot produce a storage key.
    InvalidFile(String),
    /// Remote upload failed for a reason other than size policy, or the local
    /// fallback failed.
    Storage(String),
    /// The image is stored but the record could not be written.
    Persistence(AppError),
}

impl From<IngestionFailure> for AppError {
    fn from(failure: IngestionFailure) -> Self {
        match failure {
            IngestionFailure::Scratch(e) => {
                AppError::Internal(format!("Failed to stage upload: {}", e))
            }
            IngestionFailure::NotAPlant => AppError::NotAPlant,
            IngestionFailure::Inference(InferenceError::Unavailable(msg)) => {
                AppError::InferenceUnavailable(msg)
            }
            IngestionFailure::Inference(InferenceError::MalformedResponse(msg)) => {
                AppError::InferenceMalformed(msg)
            }
            IngestionFailure::InferenceTimedOut => {
                AppError::InferenceUnavailable("classifier timed out".to_string())
            }
            IngestionFailure::InvalidFile(msg) => AppError::InvalidInput(msg),
            IngestionFailure::Storage(msg) => AppError::Storage(msg),
            IngestionFailure::Persistence(e) => e,
        }
    }
}

impl From<IngestionFailure> for HttpAppError {
    fn from(failure: IngestionFailure) -> Self {
        HttpAppError(failure.into())
    }
}

/// Where the image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: String,
    pub url: String,
    pub tier: StorageTier,
}

#[derive(Debug, Clone)]
pub struct IngestionSuccess {
    pub record: ClassificationRecord,
    pub image_url: String,
    pub storage_tier: StorageTier,
}

/// URL a client should use for a stored image.
///
/// Remote keys resolve against the bucket's public base; local paths are served
/// by this process under `/uploads`.
pub fn image_url(object_store: &dyn ObjectStore, tier: StorageTier, image_path: &str) -> String {
    match tier {
        StorageTier::Remote => object_store.public_url(image_path),
        StorageTier::Local => format!("/{}", image_path),
    }
}

pub struct IngestionPipeline {
    classifier: Arc<dyn Classifier>,
    object_store: Arc<dyn ObjectStore>,
    fallback_store: Arc<dyn FallbackStore>,
    records: Arc<dyn ClassificationRecordStore>,
    settings: PipelineSettings,
}

impl IngestionPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        object_store: Arc<dyn ObjectStore>,
        fallback_store: Arc<dyn FallbackStore>,
        records: Arc<dyn ClassificationRecordStore>,
        settings: PipelineSettings,
    ) -> Self {
        IngestionPipeline {
            classifier,
            object_store,
            fallback_store,
            records,
            settings,
        }
    }

    /// Classify, store and persist one validated upload for `user_id`.
    #[tracing::instrument(
        skip(self, image),
        fields(user_id = %user_id, filename = %image.filename, size_bytes = image.data.len())
    )]
    pub async fn ingest(
        &self,
        user_id: &str,
        image: UploadedImage,
    ) -> Result<IngestionSuccess, IngestionFailure> {
        let start = std::time::Instant::now();
        let UploadedImage {
            data,
            filename,
            content_type,
        } = image;

        let scratch = ScratchFile::create(&self.settings.scratch_dir, &filename, data)
            .await
            .map_err(IngestionFailure::Scratch)?;

        let result = self
            .run(user_id, &scratch, &filename, &content_type)
            .await;

        scratch.release().await;

        match &result {
            Ok(success) => tracing::info!(
                record_id = %success.record.id,
                storage_tier = %success.storage_tier,
                image_path = %success.record.image_path,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Ingestion completed"
            ),
            Err(failure) => tracing::debug!(
                failure = ?failure,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Ingestion ended without a record"
            ),
        }

        result
    }

    async fn run(
        &self,
        user_id: &str,
        scratch: &ScratchFile,
        filename: &str,
        content_type: &str,
    ) -> Result<IngestionSuccess, IngestionFailure> {
        let inference = self.infer(scratch, filename, content_type).await?;
        let key = storage_key(&inference.species, filename)?;
        let stored = self.store(scratch, &key, content_type).await?;
        let record = self.persist(user_id, filename, &inference, &stored).await?;

        Ok(IngestionSuccess {
            record,
            image_url: stored.url,
            storage_tier: stored.tier,
        })
    }

    async fn infer(
        &self,
        scratch: &ScratchFile,
        filename: &str,
        content_type: &str,
    ) -> Result<InferenceResult, IngestionFailure> {
        let data = tokio::fs::read(scratch.path())
            .await
            .map_err(IngestionFailure::Scratch)?;

        let outcome = tokio::time::timeout(
            self.settings.inference_timeout,
            self.classifier.classify(data, filename, content_type),
        )
        .await
        .map_err(|_| {
            tracing::error!(
                timeout_secs = self.settings.inference_timeout.as_secs(),
                "Classifier call timed out"
            );
            IngestionFailure::InferenceTimedOut
        })?
        .map_err(IngestionFailure::Inference)?;

        match outcome {
            ClassificationOutcome::Plant(result) => {
                tracing::debug!(
                    species = %result.species,
                    species_confidence = result.species_confidence,
                    shape = %result.shape,
                    "Image classified"
                );
                Ok(result)
            }
            ClassificationOutcome::NotAPlant => {
                tracing::debug!("Classifier gate rejected the image");
                Err(IngestionFailure::NotAPlant)
            }
        }
    }

    async fn store(
        &self,
        scratch: &ScratchFile,
        key: &str,
        content_type: &str,
    ) -> Result<StoredImage, IngestionFailure> {
        let upload = tokio::time::timeout(
            self.settings.storage_timeout,
            self.object_store.upload(scratch.path(), key, content_type),
        )
        .await
        .unwrap_or_else(|_| UploadResult::failure("Object storage upload timed out"));

        if let UploadResult::Success { key, url } = &upload {
            return Ok(StoredImage {
                path: key.clone(),
                url: url.clone(),
                tier: StorageTier::Remote,
            });
        }

        // Providers word size rejections inconsistently, so the file size is checked too.
        let size_policy = upload.is_size_policy_violation()
            || scratch.size() < self.settings.min_object_size_bytes;
        let error = upload.error().unwrap_or("unknown storage error").to_string();
        if !size_policy {
            tracing::error!(key = %key, error = %error, "Remote upload failed");
            return Err(IngestionFailure::Storage(error));
        }

        tracing::warn!(
            key = %key,
            error = %error,
            size_bytes = scratch.size(),
            "Remote tier rejected the image on size, using local fallback"
        );

        let local_path = tokio::time::timeout(
            self.settings.storage_timeout,
            self.fallback_store.store(scratch.path(), key),
        )
        .await
        .map_err(|_| IngestionFailure::Storage("Local fallback timed out".to_string()))?
        .map_err(|e| IngestionFailure::Storage(e.to_string()))?;

        Ok(StoredImage {
            url: image_url(self.object_store.as_ref(), StorageTier::Local, &local_path),
            path: local_path,
            tier: StorageTier::Local,
        })
    }

    async fn persist(
        &self,
        user_id: &str,
        filename: &str,
        inference: &InferenceResult,
        stored: &StoredImage,
    ) -> Result<ClassificationRecord, IngestionFailure> {
        let new = NewClassification {
            original_filename: filename.to_string(),
            image_path: stored.path.clone(),
            species: inference.species.clone(),
            shape: inference.shape.clone(),
            species_confidence: inference.species_confidence,
            shape_confidence: inference.shape_confidence,
            user_id: user_id.to_string(),
            storage_tier: stored.tier,
        };

        self.records.create(new).await.map_err(|e| {
            // Stable message: offline sweeps search for it.
            tracing::error!(
                orphan_key = %stored.path,
                storage_tier = %stored.tier,
                user_id = %user_id,
                error = %e,
                "Orphaned stored image: classification record was not written"
            );
            IngestionFailure::Persistence(e)
        })
    }
}

/// Key for a new object: normalized species label, a random identifier and the
/// original file's extension.
fn storage_key(species: &str, filename: &str) -> Result<String, IngestionFailure> {
    let extension = extension_of(filename).ok_or_else(|| {
        IngestionFailure::InvalidFile(format!("File name {} has no extension", filename))
    })?;
    let unique_id = rand::rng().random_range(0..UNIQUE_ID_SPACE).to_string();

    generate_key(species, &unique_id, &extension)
        .map_err(|e| IngestionFailure::InvalidFile(e.to_string()))
}
