//! Phyllo database layer
//!
//! PostgreSQL repositories behind async traits so the HTTP layer can run against
//! in-memory doubles in tests.

pub mod db;

pub use db::{ClassificationRecordStore, ClassificationRepository, Page};
