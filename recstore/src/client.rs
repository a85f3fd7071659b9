#[cfg(feature = "redis")]
use config::shared::StoreConfig;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, StoreError, StoreResult};
use crate::failpoints::{
    CREATE_INDEX__BEFORE_CREATE, GET_BY_INDEXED_FIELD__BEFORE_QUERY, GET_BY_KEY__BEFORE_READ,
    PUT_RECORD__BEFORE_WRITE, store_fail_point,
};
use crate::store::base::RecordStore;
#[cfg(feature = "redis")]
use crate::store::redis::RedisStore;
use crate::types::{IndexSpec, Key, Record, Value};

/// Outcome of a read through [`RecordStoreClient`].
///
/// Reads never return `Err`: a missing record and a failed read are both expected outcomes
/// that have already been logged by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Record),
    NotFound,
    Failed(StoreError),
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Returns the record, treating a failed read like a missing one.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound | Lookup::Failed(_) => None,
        }
    }

    /// Returns the value of `name` in the found record.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Lookup::Found(record) => record.get(name),
            Lookup::NotFound | Lookup::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Lookup::Failed(err) => Some(err),
            Lookup::Found(_) | Lookup::NotFound => None,
        }
    }
}

/// Facade over a connected [`RecordStore`].
///
/// Every operation logs its own failures. Writes and index creation still return them so the
/// caller can decide whether to go on, reads fold them into a [`Lookup`]. Operations run one
/// at a time: each call is awaited before the next one is issued.
///
/// The connection is released by [`RecordStoreClient::close`], which consumes the client.
#[derive(Debug)]
pub struct RecordStoreClient<S> {
    store: S,
}

#[cfg(feature = "redis")]
impl RecordStoreClient<RedisStore> {
    /// Connects to the Redis hosts listed in `config`.
    ///
    /// A failure is logged together with the host list and returned. Nothing is retried.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let hosts = config.hosts_display();

        match RedisStore::connect(config).await {
            Ok(store) => {
                info!(
                    namespace = %config.namespace,
                    set = %config.set_name,
                    "connected to record store at [{hosts}]"
                );

                Ok(Self::new(store))
            }
            Err(err) => {
                error!(error = %err, "connection error, hosts = [{hosts}]");

                Err(err)
            }
        }
    }
}

impl<S> RecordStoreClient<S>
where
    S: RecordStore,
{
    /// Wraps an already connected store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Declares the equality index `{field}_idx` on `field` of `namespace.set`.
    ///
    /// An index that already exists is reported as [`ErrorKind::IndexAlreadyExists`].
    pub async fn create_index(&self, namespace: &str, set: &str, field: &str) -> StoreResult<IndexSpec> {
        let spec = IndexSpec::new(namespace, set, field);

        let result = async {
            store_fail_point(CREATE_INDEX__BEFORE_CREATE, ErrorKind::IndexCreationFailed)?;
            self.store.create_index(&spec).await
        }
        .await;

        match result {
            Ok(()) => {
                info!(namespace, set, field, index = %spec.name, "index created");

                Ok(spec)
            }
            Err(err) => {
                error!(namespace, set, field, error = %err, "failed to create index on field '{field}'");

                Err(err)
            }
        }
    }

    /// Writes `record` under `key`, replacing whatever was stored there.
    pub async fn put_record(&self, key: &Key, record: Record) -> StoreResult<()> {
        let result = async {
            key.validate()?;
            record.validate()?;
            store_fail_point(PUT_RECORD__BEFORE_WRITE, ErrorKind::WriteFailed)?;
            self.store.put(key, record).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(namespace = %key.namespace, set = %key.set, id = %key.id, "record written");

                Ok(())
            }
            Err(err) => {
                error!(
                    namespace = %key.namespace,
                    set = %key.set,
                    id = %key.id,
                    error = %err,
                    "failed to write record {}",
                    key.id
                );

                Err(err)
            }
        }
    }

    /// Reads the record stored under `key`.
    pub async fn get_by_key(&self, key: &Key) -> Lookup {
        let result = async {
            key.validate()?;
            store_fail_point(GET_BY_KEY__BEFORE_READ, ErrorKind::QueryFailed)?;
            self.store.get(key).await
        }
        .await;

        match result {
            Ok(Some(record)) => Lookup::Found(record),
            Ok(None) => {
                warn!(namespace = %key.namespace, set = %key.set, id = %key.id, "requested non-existent record {}", key.id);

                Lookup::NotFound
            }
            Err(err) if err.is_not_found() => {
                warn!(namespace = %key.namespace, set = %key.set, id = %key.id, "requested non-existent record {}", key.id);

                Lookup::NotFound
            }
            Err(err) => {
                error!(
                    namespace = %key.namespace,
                    set = %key.set,
                    id = %key.id,
                    error = %err,
                    "failed to read record {}",
                    key.id
                );

                Lookup::Failed(err)
            }
        }
    }

    /// Reads the first record of `namespace.set` whose `field` equals `value`.
    ///
    /// Matches are ordered by identifier, integers first. The returned record keeps only the
    /// fields listed in `bins`, or every field when `bins` is empty. `field` must be indexed.
    pub async fn get_by_indexed_field(
        &self,
        namespace: &str,
        set: &str,
        field: &str,
        value: &Value,
        bins: &[&str],
    ) -> Lookup {
        let result = async {
            store_fail_point(GET_BY_INDEXED_FIELD__BEFORE_QUERY, ErrorKind::QueryFailed)?;
            self.store.query_equal(namespace, set, field, value).await
        }
        .await;

        match result {
            Ok(matches) => match matches.into_iter().next() {
                Some((key, record)) => {
                    debug!(namespace, set, field, value = %value, id = %key.id, "record matched");

                    Lookup::Found(record.project(bins))
                }
                None => {
                    warn!(namespace, set, field, value = %value, "record with {field} '{value}' is not found");

                    Lookup::NotFound
                }
            },
            Err(err) if err.is_not_found() => {
                warn!(namespace, set, field, value = %value, "record with {field} '{value}' is not found");

                Lookup::NotFound
            }
            Err(err) => {
                error!(namespace, set, field, value = %value, error = %err, "failed to query records by {field}");

                Lookup::Failed(err)
            }
        }
    }

    /// Releases the connection.
    pub async fn close(self) -> StoreResult<()> {
        match self.store.close().await {
            Ok(()) => {
                info!("record store connection closed");

                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to close record store connection");

                Err(err)
            }
        }
    }
}
