/// End-to-end test against a live Cassandra/Scylla node.
///
/// Marked #[ignore]; run with a node that has `schema/greenhouse.cql` applied:
///
///   CASSANDRA_NODES=localhost:9042 cargo test --test end_to_end_test -- --ignored
use greenhouse_bridge::config::CassandraConfig;
use greenhouse_bridge::ingest::Ingestor;
use greenhouse_bridge::serial::LineReader;
use greenhouse_bridge::storage::CassandraStore;
use std::future::pending;

#[tokio::test]
#[ignore]
async fn test_serial_lines_to_cassandra() {
    let nodes = std::env::var("CASSANDRA_NODES").unwrap_or_else(|_| "localhost:9042".to_string());
    let cfg = CassandraConfig {
        nodes: nodes.split(',').map(|s| s.trim().to_string()).collect(),
        keyspace: "home".into(),
        table: "greenhouse".into(),
        username: None,
        password: None,
    };

    let store = match CassandraStore::connect(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "Skipping test: Cassandra is not available at {}\nError: {}",
                nodes, e
            );
            return;
        }
    };

    let source = format!("GTEST{}", std::process::id());
    let before = store
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.source == source)
        .count();

    let input = format!(
        "{{\"source\":\"{s}\",\"temperaturein\":21.5,\"temperatureout\":15.0,\"temperaturecheck\":21.0,\"humidity\":55,\"light\":300}}\n\
         not json\n\
         {{\"source\":\"K1\",\"temperaturein\":1}}\n",
        s = source
    );
    let data: &'static [u8] = Box::leak(input.into_bytes().into_boxed_slice());
    let mut reader = LineReader::new(data, None);
    let mut ingestor = Ingestor::new(store, "G");
    let _ = ingestor.run(&mut reader, pending()).await;
    assert_eq!(ingestor.stats().inserted, 1);

    let after: Vec<_> = ingestor
        .store()
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.source == source)
        .collect();
    assert_eq!(after.len(), before + 1);
    assert_eq!(after[0].temperature_in, 21.5);
    assert_eq!(after[0].light, 300.0);
}
