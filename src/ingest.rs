use crate::error::{AppError, IngestError};
use crate::reading::{decode_line, Decoded, GreenhouseRow};
use crate::serial::LineReader;
use crate::storage::GreenhouseStore;
use chrono::Local;
use std::future::Future;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

/// Per-line counters, logged at shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub empty: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub decode_errors: u64,
    pub validation_errors: u64,
    pub storage_errors: u64,
}

/// What happened to one line that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Empty,
    Skipped,
    Inserted(GreenhouseRow),
}

pub struct Ingestor<S> {
    store: S,
    source_prefix: String,
    stats: IngestStats,
}

impl<S: GreenhouseStore> Ingestor<S> {
    pub fn new(store: S, source_prefix: impl Into<String>) -> Self {
        Self {
            store,
            source_prefix: source_prefix.into(),
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode, filter and store one line. Every error returned here is scoped to this line.
    pub async fn handle_line(&mut self, line: &[u8]) -> Result<LineOutcome, IngestError> {
        self.stats.lines += 1;
        let res = self.process(line).await;
        match &res {
            Ok(LineOutcome::Empty) => self.stats.empty += 1,
            Ok(LineOutcome::Skipped) => self.stats.skipped += 1,
            Ok(LineOutcome::Inserted(_)) => self.stats.inserted += 1,
            Err(IngestError::Decode(_)) => self.stats.decode_errors += 1,
            Err(IngestError::Validation { .. }) => self.stats.validation_errors += 1,
            Err(IngestError::Storage { .. }) => self.stats.storage_errors += 1,
        }
        res
    }

    async fn process(&self, line: &[u8]) -> Result<LineOutcome, IngestError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(LineOutcome::Empty);
        }

        let reading = match decode_line(line, &self.source_prefix)? {
            Decoded::Qualified(r) => r,
            Decoded::Skipped => return Ok(LineOutcome::Skipped),
        };

        let now = Local::now();
        let row = GreenhouseRow::stamp(reading, now);
        self.store
            .insert(&row)
            .await
            .map_err(|source| IngestError::Storage { at: now, source })?;
        Ok(LineOutcome::Inserted(row))
    }

    /// Read lines until the device closes, a read fails, or `shutdown` resolves.
    ///
    /// Iterations never overlap: a line is fully handled before the next read.
    pub async fn run<R, F>(&mut self, reader: &mut LineReader<R>, shutdown: F) -> Result<(), AppError>
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                }
                res = reader.next_line() => res?,
            };

            debug!(line = %String::from_utf8_lossy(line), "received");
            match self.handle_line(line).await {
                Ok(LineOutcome::Inserted(row)) => {
                    debug!(source = %row.source, at = %row.time, "reading stored");
                }
                Ok(LineOutcome::Skipped) => debug!("reading skipped: source does not match"),
                Ok(LineOutcome::Empty) => {}
                Err(e) => report(&e),
            }
        }
    }
}

fn report(e: &IngestError) {
    match e {
        IngestError::Decode(msg) => warn!(error = %msg, "ignoring value: not a JSON object"),
        IngestError::Validation { field, reason } => {
            warn!(field = %field, reason = %reason, "ignoring reading: validation failed")
        }
        IngestError::Storage { at, source } => {
            error!(at = %at, error = %source, "unexpected error storing reading")
        }
    }
}
