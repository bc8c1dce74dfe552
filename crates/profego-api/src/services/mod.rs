pub mod ingest;

pub use ingest::{IngestService, SubmittedFile};
