pub mod classifications;
pub mod upload;
