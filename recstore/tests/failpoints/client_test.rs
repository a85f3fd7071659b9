use recstore::client::{Lookup, RecordStoreClient};
use recstore::error::ErrorKind;
use recstore::failpoints::{
    CREATE_INDEX__BEFORE_CREATE, GET_BY_INDEXED_FIELD__BEFORE_QUERY, GET_BY_KEY__BEFORE_READ,
    PUT_RECORD__BEFORE_WRITE,
};
use recstore::store::memory::MemoryStore;
use recstore::test_utils::failpoints::StoreFailScenario;
use recstore::types::{Key, Record, Value};
use telemetry::init_test_tracing;

// Failpoints are process wide, so everything that configures them runs in one test.
#[tokio::test]
async fn failpoints_surface_as_store_errors() {
    init_test_tracing();
    let store = MemoryStore::new();
    let client = RecordStoreClient::new(store.clone());
    let key = Key::new("test", "phones", 1_i64);
    let record = Record::new().with("phone", "phone_1").with("ltv", "ltv_1");

    let scenario = StoreFailScenario::setup().fail(CREATE_INDEX__BEFORE_CREATE);
    let err = client.create_index("test", "phones", "phone").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexCreationFailed);
    assert!(store.indexes().await.is_empty());
    scenario.teardown();

    let scenario = StoreFailScenario::setup()
        .fail_with(CREATE_INDEX__BEFORE_CREATE, ErrorKind::IndexAlreadyExists);
    let err = client.create_index("test", "phones", "phone").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexAlreadyExists);
    scenario.teardown();

    client.create_index("test", "phones", "phone").await.unwrap();

    let scenario =
        StoreFailScenario::setup().fail_with(PUT_RECORD__BEFORE_WRITE, ErrorKind::ConnectionFailed);
    let err = client.put_record(&key, record.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    assert!(store.records().await.is_empty());
    scenario.teardown();

    client.put_record(&key, record.clone()).await.unwrap();

    let scenario = StoreFailScenario::setup()
        .fail_with(GET_BY_KEY__BEFORE_READ, ErrorKind::RecordNotFound)
        .fail_with(GET_BY_INDEXED_FIELD__BEFORE_QUERY, ErrorKind::QueryFailed);
    assert_eq!(client.get_by_key(&key).await, Lookup::NotFound);
    let lookup = client
        .get_by_indexed_field("test", "phones", "phone", &Value::from("phone_1"), &[])
        .await;
    assert_eq!(lookup.error().map(|err| err.kind()), Some(ErrorKind::QueryFailed));
    scenario.teardown();

    assert_eq!(client.get_by_key(&key).await, Lookup::Found(record));
}
