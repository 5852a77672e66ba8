use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a classification image is authoritatively stored.
///
/// Defined in core because it is persisted alongside the record and rendered in
/// API responses (`"R2"` or `"local"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "storage_tier"))]
pub enum StorageTier {
    /// Remote S3-compatible bucket; the image path is a generated storage key.
    #[serde(rename = "R2")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "R2"))]
    Remote,
    /// Process-local `uploads/` directory.
    #[serde(rename = "local")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "local"))]
    Local,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Remote => "R2",
            StorageTier::Local => "local",
        }
    }
}

impl FromStr for StorageTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "r2" | "remote" | "s3" => Ok(StorageTier::Remote),
            "local" => Ok(StorageTier::Local),
            _ => Err(anyhow::anyhow!("Invalid storage tier: {}", s)),
        }
    }
}

impl Display for StorageTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
