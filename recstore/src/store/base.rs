use std::future::Future;

use crate::error::StoreResult;
use crate::types::{IndexSpec, Key, Record, Value};

/// Operations the client facade needs from the external database.
///
/// Implementations own the connection. They report failures through [`StoreResult`] and
/// leave logging to the facade.
pub trait RecordStore {
    /// Declares an equality index.
    ///
    /// Fails with [`crate::error::ErrorKind::IndexAlreadyExists`] when an index on the same
    /// `(namespace, set, field)` already exists. Records already stored in the set become
    /// queryable through the new index.
    fn create_index(&self, spec: &IndexSpec) -> impl Future<Output = StoreResult<()>> + Send;

    /// Writes `record` under `key`, replacing every field previously stored there.
    fn put(&self, key: &Key, record: Record) -> impl Future<Output = StoreResult<()>> + Send;

    /// Reads the record stored under `key`. A missing record is `Ok(None)`.
    fn get(&self, key: &Key) -> impl Future<Output = StoreResult<Option<Record>>> + Send;

    /// Returns every record of `(namespace, set)` whose `field` equals `value`, ordered by key.
    ///
    /// Fails with [`crate::error::ErrorKind::QueryFailed`] when no index covers `field`.
    fn query_equal(
        &self,
        namespace: &str,
        set: &str,
        field: &str,
        value: &Value,
    ) -> impl Future<Output = StoreResult<Vec<(Key, Record)>>> + Send;

    /// Releases the connection.
    fn close(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
