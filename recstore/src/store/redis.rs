use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config::shared::{HostConfig, StoreConfig};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::prelude::{
    Client, ClientLike, HashesInterface, KeysInterface, Server, ServerConfig, SetsInterface,
};
use fred::types::config::ClusterDiscoveryPolicy;
use fred::types::{Builder, Key as RedisKey};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, StoreError, StoreResult};
use crate::store::base::RecordStore;
use crate::store_error;
use crate::types::{Identifier, IndexSpec, Key, Record, Value};

/// Connect and per-command timeout.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Keys fetched per `SCAN` page while back-filling a new index.
const SCAN_PAGE_SIZE: u32 = 100;

/// What is stored, as JSON, under a record key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    id: Identifier,
    bins: Record,
}

/// [`RecordStore`] backed by a Redis server or cluster.
///
/// Layout, for namespace `ns` and set `set`:
///
/// - `ns:set:rec:{id}` holds the record as a JSON string.
/// - `ns:set:indexes` is a hash mapping an indexed field to its index name.
/// - `ns:set:idx:{index}:{value}` is a set of the identifiers whose field equals `value`.
///
/// `ns`, `set` and `index` are escaped with [`escape_key_part`], so none of them contains a
/// `:`. Identifiers and values always come last and are written as type-tagged tokens, see
/// [`Identifier::token`] and [`Value::token`].
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the seed hosts of `config`.
    ///
    /// A single host gets a centralized connection, several hosts a clustered one. The
    /// first connection attempt fails fast and is not retried.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let server = server_config(&config.hosts);
        let username = config.username.clone();
        let password = config
            .password
            .as_ref()
            .map(|password| password.expose_secret().clone());

        let client = Builder::default_centralized()
            .with_config(|redis_config| {
                redis_config.server = server;
                redis_config.username = username;
                redis_config.password = password;
                redis_config.fail_fast = true;
            })
            .with_connection_config(|config| {
                config.connection_timeout = COMMAND_TIMEOUT;
                config.internal_command_timeout = COMMAND_TIMEOUT;
            })
            .with_performance_config(|config| {
                config.default_command_timeout = COMMAND_TIMEOUT;
            })
            .build()
            .map_err(|err| {
                redis_error(err, ErrorKind::ConnectionFailed, "cannot configure redis client")
            })?;

        debug!("wait for connect");
        let connection_task = client
            .init()
            .await
            .map_err(|err| redis_error(err, ErrorKind::ConnectionFailed, "cannot connect to redis"))?;
        debug!("connected");

        tokio::spawn(async move {
            let _result = connection_task.await;
        });

        Ok(Self { client })
    }

    async fn read(&self, record_key: &str, fallback: ErrorKind) -> StoreResult<Option<StoredRecord>> {
        let raw: Option<String> = self
            .client
            .get(record_key)
            .await
            .map_err(|err| redis_error(err, fallback, "cannot get record from redis"))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn registered_indexes(
        &self,
        namespace: &str,
        set: &str,
    ) -> Result<HashMap<String, String>, RedisError> {
        self.client.hgetall(registry_key(namespace, set)).await
    }

    // Doesn't work with redis cluster, SCAN only walks the node it is sent to.
    async fn backfill_index(&self, spec: &IndexSpec) -> StoreResult<u64> {
        let pattern = format!("{}:rec:*", set_prefix(&spec.namespace, &spec.set));
        let mut cursor = "0".to_string();
        let mut indexed = 0u64;

        loop {
            let (next_cursor, keys): (String, Vec<RedisKey>) = self
                .client
                .scan_page(cursor, pattern.clone(), Some(SCAN_PAGE_SIZE), None)
                .await
                .map_err(|err| {
                    redis_error(err, ErrorKind::IndexCreationFailed, "cannot scan records in redis")
                })?;

            for key in keys {
                let Some(key) = key.into_string() else {
                    continue;
                };
                let Some(stored) = self.read(&key, ErrorKind::IndexCreationFailed).await? else {
                    continue;
                };
                let Some(value) = stored.bins.get(&spec.field) else {
                    continue;
                };

                self.client
                    .sadd::<(), _, _>(
                        index_entry_key(&spec.namespace, &spec.set, &spec.name, value),
                        stored.id.token(),
                    )
                    .await
                    .map_err(|err| {
                        redis_error(err, ErrorKind::IndexCreationFailed, "cannot add index entry in redis")
                    })?;
                indexed += 1;
            }

            cursor = next_cursor;
            if cursor == "0" {
                break;
            }
        }

        Ok(indexed)
    }
}

impl RecordStore for RedisStore {
    async fn create_index(&self, spec: &IndexSpec) -> StoreResult<()> {
        let registered: bool = self
            .client
            .hsetnx(
                registry_key(&spec.namespace, &spec.set),
                spec.field.as_str(),
                spec.name.as_str(),
            )
            .await
            .map_err(|err| {
                redis_error(err, ErrorKind::IndexCreationFailed, "cannot register index in redis")
            })?;

        if !registered {
            bail!(
                ErrorKind::IndexAlreadyExists,
                "index already exists",
                format!("an index already covers field `{}`", spec.field)
            );
        }

        let indexed = self.backfill_index(spec).await?;
        debug!(index = %spec.name, indexed, "index created");

        Ok(())
    }

    async fn put(&self, key: &Key, record: Record) -> StoreResult<()> {
        record.validate()?;

        let record_key = record_key(key);
        let id_token = key.id.token();

        let indexes = self
            .registered_indexes(&key.namespace, &key.set)
            .await
            .map_err(|err| redis_error(err, ErrorKind::WriteFailed, "cannot read index registry from redis"))?;
        let previous = if indexes.is_empty() {
            None
        } else {
            self.read(&record_key, ErrorKind::WriteFailed).await?
        };

        let stored = StoredRecord {
            id: key.id.clone(),
            bins: record,
        };
        // We don't use the JSON module to stay compatible with older versions of redis.
        let payload = serde_json::to_string(&stored).map_err(|err| {
            store_error!(ErrorKind::SerializationError, "cannot serialize record", err, source: err)
        })?;

        let entries = index_entries(key, &indexes, &stored.bins);
        let stale = match &previous {
            Some(previous) => stale_entries(index_entries(key, &indexes, &previous.bins), &entries),
            None => Vec::new(),
        };

        let pipeline = self.client.pipeline();
        let write = async {
            pipeline
                .set::<(), _, _>(record_key.as_str(), payload, None, None, false)
                .await?;
            for entry in &entries {
                pipeline.sadd::<(), _, _>(entry.as_str(), id_token.as_str()).await?;
            }

            pipeline.all::<()>().await
        };
        write
            .await
            .map_err(|err| redis_error(err, ErrorKind::WriteFailed, "cannot write record to redis"))?;

        // The pipeline is not atomic. Old entries are only dropped once the new version is
        // stored, so a failed write leaves extra entries behind, never missing ones, and
        // `query_equal` skips entries whose record no longer matches.
        if !stale.is_empty() {
            let pipeline = self.client.pipeline();
            let cleanup = async {
                for entry in &stale {
                    pipeline.srem::<(), _, _>(entry.as_str(), id_token.as_str()).await?;
                }

                pipeline.all::<()>().await
            };
            cleanup.await.map_err(|err| {
                redis_error(err, ErrorKind::WriteFailed, "cannot remove stale index entries from redis")
            })?;
        }

        Ok(())
    }

    async fn get(&self, key: &Key) -> StoreResult<Option<Record>> {
        let stored = self.read(&record_key(key), ErrorKind::QueryFailed).await?;

        Ok(stored.map(|stored| stored.bins))
    }

    async fn query_equal(
        &self,
        namespace: &str,
        set: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(Key, Record)>> {
        let index: Option<String> = self
            .client
            .hget(registry_key(namespace, set), field)
            .await
            .map_err(|err| redis_error(err, ErrorKind::QueryFailed, "cannot read index registry from redis"))?;
        let Some(index) = index else {
            bail!(
                ErrorKind::QueryFailed,
                "index not found",
                format!("no index on `{field}` in {namespace}.{set}")
            );
        };

        let members: Vec<String> = self
            .client
            .smembers(index_entry_key(namespace, set, &index, value))
            .await
            .map_err(|err| redis_error(err, ErrorKind::QueryFailed, "cannot read index entries from redis"))?;

        let mut ids: Vec<Identifier> = members
            .iter()
            .filter_map(|token| Identifier::from_token(token))
            .collect();
        ids.sort();

        let mut matches = Vec::with_capacity(ids.len());
        for id in ids {
            let key = Key::new(namespace, set, id);
            let Some(stored) = self.read(&record_key(&key), ErrorKind::QueryFailed).await? else {
                continue;
            };
            // Entries can be left over by a failed write or a concurrent writer.
            if stored.bins.get(field) == Some(value) {
                matches.push((key, stored.bins));
            }
        }

        Ok(matches)
    }

    async fn close(&self) -> StoreResult<()> {
        self.client
            .quit()
            .await
            .map_err(|err| redis_error(err, ErrorKind::ConnectionFailed, "cannot close redis connection"))
    }
}

fn server_config(hosts: &[HostConfig]) -> ServerConfig {
    match hosts {
        [single] => ServerConfig::Centralized {
            server: Server::new(single.host.clone(), single.port),
        },
        seeds => ServerConfig::Clustered {
            hosts: seeds
                .iter()
                .map(|seed| Server::new(seed.host.clone(), seed.port))
                .collect(),
            policy: ClusterDiscoveryPolicy::default(),
        },
    }
}

/// Percent-encodes the key separator, the escape character itself and the `SCAN` glob
/// metacharacters.
///
/// The encoding is injective and leaves no `:` behind, so distinct `(namespace, set)` pairs
/// never share a prefix and prefixes are matched literally by `SCAN`.
fn escape_key_part(part: &str) -> Cow<'_, str> {
    fn needs_escape(c: char) -> bool {
        matches!(c, '%' | ':' | '*' | '?' | '[' | ']' | '\\')
    }

    if !part.contains(needs_escape) {
        return Cow::Borrowed(part);
    }

    let mut escaped = String::with_capacity(part.len() + 8);
    for c in part.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", u32::from(c)));
        } else {
            escaped.push(c);
        }
    }

    Cow::Owned(escaped)
}

fn set_prefix(namespace: &str, set: &str) -> String {
    format!("{}:{}", escape_key_part(namespace), escape_key_part(set))
}

fn record_key(key: &Key) -> String {
    format!("{}:rec:{}", set_prefix(&key.namespace, &key.set), key.id.token())
}

fn registry_key(namespace: &str, set: &str) -> String {
    format!("{}:indexes", set_prefix(namespace, set))
}

fn index_entry_key(namespace: &str, set: &str, index: &str, value: &Value) -> String {
    format!(
        "{}:idx:{}:{}",
        set_prefix(namespace, set),
        escape_key_part(index),
        value.token()
    )
}

/// Index entry keys `bins` belongs to, sorted.
fn index_entries(key: &Key, indexes: &HashMap<String, String>, bins: &Record) -> Vec<String> {
    let mut entries: Vec<String> = indexes
        .iter()
        .filter_map(|(field, index)| {
            bins.get(field)
                .map(|value| index_entry_key(&key.namespace, &key.set, index, value))
        })
        .collect();
    entries.sort();

    entries
}

/// Entries of the previous version that the new version no longer belongs to.
fn stale_entries(previous: Vec<String>, current: &[String]) -> Vec<String> {
    previous
        .into_iter()
        .filter(|entry| !current.contains(entry))
        .collect()
}

/// Maps a redis error onto an [`ErrorKind`], keeping connection-level failures distinct from
/// the operation-specific `fallback`.
#[track_caller]
fn redis_error(err: RedisError, fallback: ErrorKind, description: &'static str) -> StoreError {
    let kind = match err.kind() {
        RedisErrorKind::IO | RedisErrorKind::Timeout | RedisErrorKind::Canceled => {
            ErrorKind::ConnectionFailed
        }
        RedisErrorKind::Auth => ErrorKind::AuthenticationError,
        RedisErrorKind::Parse => ErrorKind::DeserializationError,
        _ => fallback,
    };

    store_error!(kind, description, err, source: err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_host_uses_centralized_connection() {
        let config = server_config(&[HostConfig::new("127.0.0.1", 6379)]);

        assert!(matches!(config, ServerConfig::Centralized { .. }));
    }

    #[test]
    fn several_hosts_use_clustered_connection_in_seed_order() {
        let config = server_config(&[HostConfig::new("10.0.0.2", 7000), HostConfig::new("10.0.0.1", 7001)]);

        match config {
            ServerConfig::Clustered { hosts, .. } => {
                assert_eq!(hosts.len(), 2);
                assert_eq!(hosts[0].port, 7000);
                assert_eq!(hosts[1].port, 7001);
            }
            _ => panic!("expected a clustered server config"),
        }
    }

    #[test]
    fn keys_are_namespaced_and_type_tagged() {
        let key = Key::new("test", "phones", 7_i64);

        assert_eq!(record_key(&key), "test:phones:rec:i:7");
        assert_eq!(registry_key("test", "phones"), "test:phones:indexes");
        assert_eq!(
            index_entry_key("test", "phones", "phone_idx", &Value::from("phone_7")),
            "test:phones:idx:phone_idx:s:phone_7"
        );
    }

    #[test]
    fn keys_with_separators_in_their_parts_stay_distinct() {
        let first = Key::new("a:b", "c", 1_i64);
        let second = Key::new("a", "b:c", 1_i64);

        assert_ne!(record_key(&first), record_key(&second));
        assert_ne!(registry_key("a:b", "c"), registry_key("a", "b:c"));
        assert_ne!(
            index_entry_key("a:b", "c", "phone_idx", &Value::from("x")),
            index_entry_key("a", "b:c", "phone_idx", &Value::from("x"))
        );
        assert_eq!(record_key(&first), "a%3Ab:c:rec:i:1");
    }

    #[test]
    fn escaped_parts_contain_no_glob_metacharacters() {
        assert_eq!(escape_key_part("plain"), "plain");
        assert_eq!(escape_key_part("*?[x]\\"), "%2A%3F%5Bx%5D%5C");
        // An already escaped looking part does not collide with its raw form.
        assert_ne!(escape_key_part("a%3Ab"), escape_key_part("a:b"));
    }

    #[test]
    fn only_changed_index_entries_are_stale() {
        let key = Key::new("test", "phones", 1_i64);
        let indexes = HashMap::from([
            ("phone".to_string(), "phone_idx".to_string()),
            ("ltv".to_string(), "ltv_idx".to_string()),
        ]);
        let previous = Record::new().with("phone", "phone_1").with("ltv", "ltv_1");
        let current = Record::new().with("phone", "phone_2").with("ltv", "ltv_1");

        let entries = index_entries(&key, &indexes, &current);
        let stale = stale_entries(index_entries(&key, &indexes, &previous), &entries);

        assert_eq!(
            entries,
            vec![
                "test:phones:idx:ltv_idx:s:ltv_1".to_string(),
                "test:phones:idx:phone_idx:s:phone_2".to_string(),
            ]
        );
        assert_eq!(stale, vec!["test:phones:idx:phone_idx:s:phone_1".to_string()]);
    }

    #[test]
    fn io_errors_map_to_connection_failed() {
        let err = redis_error(
            RedisError::new(RedisErrorKind::IO, "connection refused"),
            ErrorKind::WriteFailed,
            "cannot write record to redis",
        );

        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn other_errors_keep_the_operation_kind() {
        let err = redis_error(
            RedisError::new(RedisErrorKind::Unknown, "WRONGTYPE"),
            ErrorKind::WriteFailed,
            "cannot write record to redis",
        );

        assert_eq!(err.kind(), ErrorKind::WriteFailed);
    }
}
