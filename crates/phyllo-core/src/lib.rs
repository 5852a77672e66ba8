//! Phyllo Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every Phyllo component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{AppConfig, BaseConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageTier;
// Note: ObjectStore, UploadResult and StorageError live in phyllo-storage
