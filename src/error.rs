use chrono::{DateTime, Local};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Serial error: {0}")]
    Serial(String),
    #[error("Serial device closed")]
    SerialClosed,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failure reported by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("prepare failed: {0}")]
    Prepare(String),
    #[error("insert failed: {0}")]
    Insert(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Failure scoped to a single serial line. None of these stop the loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("validation error: field '{field}' {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("storage error at {at}: {source}")]
    Storage {
        at: DateTime<Local>,
        #[source]
        source: StorageError,
    },
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Decode(_) => "decode",
            IngestError::Validation { .. } => "validation",
            IngestError::Storage { .. } => "storage",
        }
    }
}
