//! Ingestion pipeline: dedup → thread resolution → classification → persist.

pub mod ingest;
pub mod processor;
pub mod types;

pub use ingest::spawn_ingest_worker;
pub use processor::EmailProcessor;
pub use types::IngestOutcome;
