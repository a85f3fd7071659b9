use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, StoreResult};
use crate::store::base::RecordStore;
use crate::types::{IndexSpec, Key, Record, Value};

/// `(namespace, set, field)` an index is declared on.
type IndexTarget = (String, String, String);

#[derive(Debug, Default)]
struct Inner {
    /// Every stored record. Key order is the order query matches are returned in.
    records: BTreeMap<Key, Record>,
    /// Declared indexes mapped to their names.
    indexes: HashMap<IndexTarget, String>,
    closed: bool,
}

impl Inner {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            bail!(ErrorKind::InvalidState, "memory store connection is closed");
        }

        Ok(())
    }
}

/// In-memory [`RecordStore`].
///
/// Behaves like the Redis backend: writes replace whole records, an index must be declared
/// before it is queried, declaring it twice fails and matches come back in key order.
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored record.
    pub async fn records(&self) -> BTreeMap<Key, Record> {
        let inner = self.inner.lock().await;
        inner.records.clone()
    }

    /// Returns the declared indexes, sorted by name.
    pub async fn indexes(&self) -> Vec<IndexSpec> {
        let inner = self.inner.lock().await;
        let mut indexes: Vec<IndexSpec> = inner
            .indexes
            .iter()
            .map(|((namespace, set, field), name)| IndexSpec {
                namespace: namespace.clone(),
                set: set.clone(),
                field: field.clone(),
                name: name.clone(),
            })
            .collect();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));

        indexes
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

impl RecordStore for MemoryStore {
    async fn create_index(&self, spec: &IndexSpec) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;

        let target = (spec.namespace.clone(), spec.set.clone(), spec.field.clone());
        if let Some(existing) = inner.indexes.get(&target) {
            bail!(
                ErrorKind::IndexAlreadyExists,
                "index already exists",
                format!("index `{existing}` already covers field `{}`", spec.field)
            );
        }
        inner.indexes.insert(target, spec.name.clone());

        Ok(())
    }

    async fn put(&self, key: &Key, record: Record) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;
        record.validate()?;

        inner.records.insert(key.clone(), record);

        Ok(())
    }

    async fn get(&self, key: &Key) -> StoreResult<Option<Record>> {
        let inner = self.inner.lock().await;
        inner.ensure_open()?;

        Ok(inner.records.get(key).cloned())
    }

    async fn query_equal(
        &self,
        namespace: &str,
        set: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(Key, Record)>> {
        let inner = self.inner.lock().await;
        inner.ensure_open()?;

        let target = (namespace.to_string(), set.to_string(), field.to_string());
        if !inner.indexes.contains_key(&target) {
            bail!(
                ErrorKind::QueryFailed,
                "index not found",
                format!("no index on `{field}` in {namespace}.{set}")
            );
        }

        let matches = inner
            .records
            .iter()
            .filter(|(key, record)| {
                key.namespace == namespace && key.set == set && record.get(field) == Some(value)
            })
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();

        Ok(matches)
    }

    async fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;
        inner.closed = true;

        Ok(())
    }
}
