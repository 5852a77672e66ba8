//! Data models for the application
//!
//! Organized by domain: the persisted classification entity and the values
//! exchanged with the external classifier.

mod classification;
mod inference;

pub use classification::*;
pub use inference::*;
