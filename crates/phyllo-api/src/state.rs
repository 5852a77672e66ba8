//! Application state and sub-state extractors.
//!
//! Handlers extract the slice they need through Axum's `FromRef`.

use crate::services::ingestion::{IngestionPipeline, PipelineSettings};
use crate::utils::upload::UploadLimits;
use phyllo_core::Config;
use phyllo_db::ClassificationRecordStore;
use phyllo_services::Classifier;
use phyllo_storage::{FallbackStore, ObjectStore};
use std::sync::Arc;

/// Both storage tiers.
#[derive(Clone)]
pub struct StorageState {
    pub object_store: Arc<dyn ObjectStore>,
    pub fallback_store: Arc<dyn FallbackStore>,
}

/// Record store and the pipeline that writes to it.
#[derive(Clone)]
pub struct ClassificationState {
    pub records: Arc<dyn ClassificationRecordStore>,
    pub ingestion: Arc<IngestionPipeline>,
}

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub is_production: bool,
    pub storage: StorageState,
    pub classifications: ClassificationState,
    pub upload_limits: UploadLimits,
}

impl AppState {
    /// Wire the collaborators together. Production and tests both build state here.
    pub fn new(
        config: Config,
        object_store: Arc<dyn ObjectStore>,
        fallback_store: Arc<dyn FallbackStore>,
        classifier: Arc<dyn Classifier>,
        records: Arc<dyn ClassificationRecordStore>,
    ) -> Self {
        let ingestion = IngestionPipeline::new(
            classifier,
            object_store.clone(),
            fallback_store.clone(),
            records.clone(),
            PipelineSettings::from_config(&config),
        );

        let upload_limits = UploadLimits {
            max_file_size: config.max_file_size_bytes(),
            allowed_extensions: config.allowed_extensions().to_vec(),
            allowed_content_types: config.allowed_content_types().to_vec(),
        };

        AppState {
            is_production: config.is_production(),
            storage: StorageState {
                object_store,
                fallback_store,
            },
            classifications: ClassificationState {
                records,
                ingestion: Arc::new(ingestion),
            },
            upload_limits,
            config,
        }
    }
}

impl axum::extract::FromRef<Arc<AppState>> for StorageState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.storage.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ClassificationState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.classifications.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for UploadLimits {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.upload_limits.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
