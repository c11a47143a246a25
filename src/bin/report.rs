use greenhouse_bridge::config::Config;
use greenhouse_bridge::report::summarize;
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
        .with_writer(std::io::stderr)
        .init();

    let cfg_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.example.yaml".into());
    let cfg = Config::load(&cfg_path)?;

    let store = CassandraStore::connect(&cfg.cassandra).await?;
    let rows = store.fetch_all().await?;
    info!(count = rows.len(), table = %cfg.cassandra.table, "loaded measurements");

    match summarize(&rows, cfg.report.cold_threshold) {
        Some(summary) => println!("{}", summary),
        None => println!("no records"),
    }
    Ok(())
}
