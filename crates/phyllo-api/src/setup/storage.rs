//! Storage setup and initialization

use anyhow::{Context, Result};
use phyllo_core::Config;
use phyllo_storage::{create_fallback_store, create_object_store, FallbackStore, ObjectStore};
use std::sync::Arc;

/// Build both storage tiers and make sure the local directories exist.
pub async fn setup_storage(
    config: &Config,
) -> Result<(Arc<dyn ObjectStore>, Arc<dyn FallbackStore>)> {
    tracing::info!("Initializing storage tiers...");

    let object_store = create_object_store(config).context("Failed to create object store")?;
    let fallback_store = create_fallback_store(config);

    for dir in [config.uploads_dir(), config.scratch_dir()] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    tracing::info!(
        bucket = %config.r2_bucket(),
        uploads_dir = %config.uploads_dir().display(),
        scratch_dir = %config.scratch_dir().display(),
        "Storage tiers initialized"
    );

    Ok((object_store, fallback_store))
}
