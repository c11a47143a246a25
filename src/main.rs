use greenhouse_bridge::config::Config;
use greenhouse_bridge::ingest::Ingestor;
use greenhouse_bridge::serial::{self, LineReader};
use greenhouse_bridge::storage::CassandraStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.example.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    info!(
        port = %cfg.serial.port,
        baud_rate = cfg.serial.baud_rate,
        prefix = %cfg.ingest.source_prefix,
        "loaded config"
    );

    let store = CassandraStore::connect(&cfg.cassandra).await?;
    info!(
        nodes = ?cfg.cassandra.nodes,
        keyspace = %cfg.cassandra.keyspace,
        table = %cfg.cassandra.table,
        "connected to Cassandra"
    );

    let port = serial::open(&cfg.serial)?;
    info!(port = %cfg.serial.port, "serial device opened");
    let mut reader = LineReader::new(port, cfg.serial.read_timeout());

    let mut ingestor = Ingestor::new(store, cfg.ingest.source_prefix.clone());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let res = ingestor.run(&mut reader, shutdown).await;

    let stats = ingestor.stats();
    info!(
        lines = stats.lines,
        inserted = stats.inserted,
        skipped = stats.skipped,
        decode_errors = stats.decode_errors,
        validation_errors = stats.validation_errors,
        storage_errors = stats.storage_errors,
        "ingestion stopped"
    );

    res?;
    Ok(())
}
