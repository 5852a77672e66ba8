pub mod ingestion;
pub mod scratch;
