//! Database repositories for data access layer
//!
//! One repository per persisted entity. Each exposes a trait describing the
//! contract and a PostgreSQL implementation.

pub mod classification;

pub use classification::{ClassificationRecordStore, ClassificationRepository, Page};
