pub mod extraction;
pub mod ingestion;
pub mod materialize;
pub mod upload;
