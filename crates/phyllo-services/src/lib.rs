//! Phyllo Services Library
//!
//! Clients for the external services the intake pipeline depends on.

pub mod services;

pub use services::inference::{Classifier, InferenceClient, InferenceError};
