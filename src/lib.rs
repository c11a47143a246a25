pub mod config;
pub mod error;
pub mod ingest;
pub mod reading;
pub mod report;
pub mod serial;
pub mod storage;

pub use config::Config;
pub use error::{AppError, IngestError, StorageError};
pub use ingest::{IngestStats, Ingestor, LineOutcome};
