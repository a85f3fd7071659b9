#![cfg(feature = "redis")]

use std::time::{SystemTime, UNIX_EPOCH};

use config::shared::{HostConfig, StoreConfig};
use recstore::client::{Lookup, RecordStoreClient};
use recstore::error::ErrorKind;
use recstore::types::{Key, Record, Value};
use telemetry::init_test_tracing;

const REDIS_HOST: &str = "127.0.0.1";
const REDIS_PORT: u16 = 6379;

/// Each run writes into its own namespace so reruns against the same server do not collide.
fn store_config() -> StoreConfig {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    StoreConfig {
        hosts: vec![HostConfig::new(REDIS_HOST, REDIS_PORT)],
        namespace: format!("test_{suffix}"),
        set_name: "phones".to_string(),
        username: None,
        password: None,
    }
}

#[ignore = "requires a redis server on 127.0.0.1:6379"]
#[tokio::test(flavor = "multi_thread")]
async fn redis_round_trips_by_key_and_indexed_field() {
    init_test_tracing();
    let config = store_config();
    let client = RecordStoreClient::connect(&config).await.unwrap();
    let namespace = config.namespace.as_str();
    let set = config.set_name.as_str();

    // Written before the index exists, so it has to be back-filled.
    let early = Key::new(namespace, set, 0_i64);
    client
        .put_record(&early, Record::new().with("phone", "phone_0").with("ltv", "ltv_0"))
        .await
        .unwrap();

    client.create_index(namespace, set, "phone").await.unwrap();
    let err = client.create_index(namespace, set, "phone").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexAlreadyExists);

    for i in 1..=10_i64 {
        let record = Record::new()
            .with("phone", format!("phone_{i}"))
            .with("ltv", format!("ltv_{i}"));
        client
            .put_record(&Key::new(namespace, set, i), record)
            .await
            .unwrap();
    }

    for i in 0..=10_i64 {
        let expected = Value::from(format!("ltv_{i}"));

        let by_key = client.get_by_key(&Key::new(namespace, set, i)).await;
        assert_eq!(by_key.field("ltv"), Some(&expected));

        let by_phone = client
            .get_by_indexed_field(namespace, set, "phone", &Value::from(format!("phone_{i}")), &["ltv"])
            .await;
        assert_eq!(by_phone, Lookup::Found(Record::new().with("ltv", format!("ltv_{i}"))));
    }

    // Replacing a record moves it out of its old index entry.
    client
        .put_record(&Key::new(namespace, set, 1_i64), Record::new().with("phone", "phone_moved"))
        .await
        .unwrap();
    let old = client
        .get_by_indexed_field(namespace, set, "phone", &Value::from("phone_1"), &[])
        .await;
    assert_eq!(old, Lookup::NotFound);

    let missing = client.get_by_key(&Key::new(namespace, set, 999_i64)).await;
    assert_eq!(missing, Lookup::NotFound);

    client.close().await.unwrap();
}

#[tokio::test]
async fn unreachable_host_fails_to_connect() {
    init_test_tracing();
    let config = StoreConfig {
        hosts: vec![HostConfig::new("127.0.0.1", 1)],
        ..store_config()
    };

    let err = RecordStoreClient::connect(&config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
}
