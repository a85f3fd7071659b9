use std::sync::Arc;

use crate::bail;
use crate::error::{ErrorKind, StoreResult};
use crate::store::base::RecordStore;
use crate::types::{IndexSpec, Key, Record, Value};

/// What happens when a faulty operation is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    Panic,
    Error(ErrorKind),
}

/// Faults to inject, per [`RecordStore`] operation. `None` forwards to the wrapped store.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    pub create_index: Option<FaultType>,
    pub put: Option<FaultType>,
    pub get: Option<FaultType>,
    pub query_equal: Option<FaultType>,
    pub close: Option<FaultType>,
}

/// [`RecordStore`] wrapper that fails the operations selected in its [`FaultConfig`].
#[derive(Debug, Clone)]
pub struct FaultInjectingStore<S> {
    inner: S,
    config: Arc<FaultConfig>,
}

impl<S> FaultInjectingStore<S> {
    pub fn wrap(inner: S, config: FaultConfig) -> Self {
        Self {
            inner,
            config: Arc::new(config),
        }
    }

    pub fn get_inner(&self) -> &S {
        &self.inner
    }

    fn trigger_fault(&self, fault: Option<FaultType>, operation: &'static str) -> StoreResult<()> {
        match fault {
            Some(FaultType::Panic) => panic!("panic injected into `{operation}`"),
            Some(FaultType::Error(kind)) => {
                bail!(kind, "injected fault", format!("`{operation}` was configured to fail"))
            }
            None => Ok(()),
        }
    }
}

impl<S> RecordStore for FaultInjectingStore<S>
where
    S: RecordStore + Sync,
{
    async fn create_index(&self, spec: &IndexSpec) -> StoreResult<()> {
        self.trigger_fault(self.config.create_index, "create_index")?;
        self.inner.create_index(spec).await
    }

    async fn put(&self, key: &Key, record: Record) -> StoreResult<()> {
        self.trigger_fault(self.config.put, "put")?;
        self.inner.put(key, record).await
    }

    async fn get(&self, key: &Key) -> StoreResult<Option<Record>> {
        self.trigger_fault(self.config.get, "get")?;
        self.inner.get(key).await
    }

    async fn query_equal(
        &self,
        namespace: &str,
        set: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(Key, Record)>> {
        self.trigger_fault(self.config.query_equal, "query_equal")?;
        self.inner.query_equal(namespace, set, field, value).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.trigger_fault(self.config.close, "close")?;
        self.inner.close().await
    }
}
