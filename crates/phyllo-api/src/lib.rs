//! Phyllo API Library
//!
//! HTTP handlers, authentication, the ingestion pipeline and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;
pub mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use services::ingestion::{IngestionPipeline, PipelineSettings};
pub use state::AppState;
