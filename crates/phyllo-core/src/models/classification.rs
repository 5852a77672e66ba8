use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage_types::StorageTier;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "verification_status", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VerificationStatus::Pending => write!(f, "PENDING"),
            VerificationStatus::Verified => write!(f, "VERIFIED"),
            VerificationStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(VerificationStatus::Pending),
            "VERIFIED" => Ok(VerificationStatus::Verified),
            "REJECTED" => Ok(VerificationStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid verification status: {}", s)),
        }
    }
}

/// One persisted classification of an uploaded leaf image.
///
/// `image_path` is either a generated remote key or a path under the local
/// uploads prefix; `storage_tier` records which of the two it is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub id: Uuid,
    pub original_filename: String,
    pub image_path: String,
    pub species: String,
    pub shape: String,
    pub species_confidence: f64,
    pub shape_confidence: f64,
    pub user_id: String,
    pub is_archived: bool,
    pub status: VerificationStatus,
    pub storage_tier: StorageTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new classification row. Everything else is defaulted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClassification {
    pub original_filename: String,
    pub image_path: String,
    pub species: String,
    pub shape: String,
    pub species_confidence: f64,
    pub shape_confidence: f64,
    pub user_id: String,
    pub storage_tier: StorageTier,
}

/// Partial update applied by administrators.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationUpdate {
    pub species: Option<String>,
    pub shape: Option<String>,
    pub status: Option<VerificationStatus>,
    pub is_archived: Option<bool>,
}

impl ClassificationUpdate {
    pub fn is_empty(&self) -> bool {
        self.species.is_none()
            && self.shape.is_none()
            && self.status.is_none()
            && self.is_archived.is_none()
    }

    /// Apply the set fields to `record` in place.
    pub fn apply_to(&self, record: &mut ClassificationRecord) {
        if let Some(species) = &self.species {
            record.species = species.clone();
        }
        if let Some(shape) = &self.shape {
            record.shape = shape.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(is_archived) = self.is_archived {
            record.is_archived = is_archived;
        }
    }
}
