use crate::config::CassandraConfig;
use crate::error::StorageError;
use crate::reading::GreenhouseRow;
use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use scylla::prepared_statement::PreparedStatement;
use scylla::{Session, SessionBuilder};
use tracing::debug;

/// Where qualifying rows go.
#[allow(async_fn_in_trait)]
pub trait GreenhouseStore {
    async fn insert(&self, row: &GreenhouseRow) -> Result<(), StorageError>;
}

type RowTuple = (String, NaiveDate, DateTime<Utc>, f64, f64, f64, f64, f64);

const COLUMNS: &str =
    "source, day, time, temperaturein, temperatureout, temperaturecheck, humidity, light";

/// Session bound to one keyspace, holding the prepared insert.
pub struct CassandraStore {
    session: Session,
    insert: PreparedStatement,
    table: String,
}

impl CassandraStore {
    pub async fn connect(cfg: &CassandraConfig) -> Result<Self, StorageError> {
        let mut builder = SessionBuilder::new().known_nodes(&cfg.nodes);
        if let (Some(u), Some(p)) = (&cfg.username, &cfg.password) {
            builder = builder.user(u, p);
        }
        let session = builder
            .build()
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;
        session
            .use_keyspace(&cfg.keyspace, false)
            .await
            .map_err(|e| StorageError::Connect(format!("use keyspace {}: {}", cfg.keyspace, e)))?;

        let insert = session
            .prepare(insert_statement(&cfg.table))
            .await
            .map_err(|e| StorageError::Prepare(e.to_string()))?;
        debug!(table = %cfg.table, "prepared insert statement");

        Ok(Self {
            session,
            insert,
            table: cfg.table.clone(),
        })
    }

    /// Every stored row, in whatever order the cluster returns them.
    pub async fn fetch_all(&self) -> Result<Vec<GreenhouseRow>, StorageError> {
        let query = format!("SELECT {} FROM {}", COLUMNS, self.table);
        let mut rows = self
            .session
            .query_iter(query, ())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?
            .into_typed::<RowTuple>();

        let mut out = Vec::new();
        while let Some(next) = rows.next().await {
            let (source, day, time, temperature_in, temperature_out, temperature_check, humidity, light) =
                next.map_err(|e| StorageError::Query(e.to_string()))?;
            out.push(GreenhouseRow {
                source,
                day,
                time,
                temperature_in,
                temperature_out,
                temperature_check,
                humidity,
                light,
            });
        }
        debug!(table = %self.table, count = out.len(), "fetched rows");
        Ok(out)
    }
}

impl GreenhouseStore for CassandraStore {
    async fn insert(&self, row: &GreenhouseRow) -> Result<(), StorageError> {
        self.session
            .execute_unpaged(
                &self.insert,
                (
                    row.source.as_str(),
                    row.day,
                    row.time,
                    row.temperature_in,
                    row.temperature_out,
                    row.temperature_check,
                    row.humidity,
                    row.light,
                ),
            )
            .await
            .map_err(|e| StorageError::Insert(e.to_string()))?;
        Ok(())
    }
}

fn insert_statement(table: &str) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        table, COLUMNS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_statement() {
        assert_eq!(
            insert_statement("greenhouse"),
            "INSERT INTO greenhouse (source, day, time, temperaturein, temperatureout, \
             temperaturecheck, humidity, light) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        );
    }
}
