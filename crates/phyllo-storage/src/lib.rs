//! Phyllo Storage Library
//!
//! Storage for classified leaf images. Images live in exactly one of two tiers:
//!
//! - **Remote**: an S3-compatible bucket (Cloudflare R2 in production). The
//!   record's image path is a generated key such as `zea-mays_0004711.jpg`.
//! - **Local fallback**: a process-local directory served under `/uploads`, used
//!   when the remote tier rejects an object on size policy. The image path is
//!   `uploads/<key>`.
//!
//! Key generation and validation are centralized in the `keys` module so that any
//! code path can tell a remote key from a local path.

pub mod factory;
pub mod keys;
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_fallback_store, create_object_store};
pub use keys::{extension_of, generate_key, is_valid_key};
pub use local::{LocalFallbackStore, LOCAL_UPLOADS_PREFIX};
pub use phyllo_core::StorageTier;
#[cfg(feature = "storage-s3")]
pub use s3::{S3ObjectStore, S3Settings};
pub use traits::{FallbackStore, ObjectStore, StorageError, StorageResult, UploadResult};
