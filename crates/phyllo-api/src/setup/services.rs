//! Service and repository wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use phyllo_core::Config;
use phyllo_db::ClassificationRepository;
use phyllo_services::InferenceClient;
use phyllo_storage::{FallbackStore, ObjectStore};
use sqlx::PgPool;
use std::sync::Arc;

pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    object_store: Arc<dyn ObjectStore>,
    fallback_store: Arc<dyn FallbackStore>,
) -> Result<Arc<AppState>> {
    let classifier = InferenceClient::new(config.classifier_base_url(), config.inference_timeout())
        .context("Failed to create classifier client")?;
    tracing::info!(predict_url = %classifier.predict_url(), "Classifier client initialized");

    let records = ClassificationRepository::new(pool);

    Ok(Arc::new(AppState::new(
        config.clone(),
        object_store,
        fallback_store,
        Arc::new(classifier),
        Arc::new(records),
    )))
}
