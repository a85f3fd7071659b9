use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// A seed node of the database cluster.
///
/// Deserializes either from a `host:port` string or from a `{ host, port }` map, so that
/// `APP_STORE__HOSTS=10.0.0.1:3000,10.0.0.2:3000` works as an override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HostEntry")]
pub struct HostConfig {
    /// Hostname or IP address.
    pub host: String,
    /// Port the node listens on.
    pub port: u16,
}

impl HostConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostEntry {
    Address(String),
    Parts { host: String, port: u16 },
}

impl TryFrom<HostEntry> for HostConfig {
    type Error = String;

    fn try_from(entry: HostEntry) -> Result<Self, Self::Error> {
        match entry {
            HostEntry::Parts { host, port } => Ok(HostConfig { host, port }),
            HostEntry::Address(address) => {
                let (host, port) = address
                    .rsplit_once(':')
                    .ok_or_else(|| format!("seed host `{address}` is not in `host:port` form"))?;
                let port = port
                    .parse::<u16>()
                    .map_err(|err| format!("seed host `{address}` has an invalid port: {err}"))?;

                Ok(HostConfig::new(host, port))
            }
        }
    }
}

/// Connection settings for the record store cluster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Ordered seed nodes. The first one is tried first.
    pub hosts: Vec<HostConfig>,
    /// Namespace holding the records.
    pub namespace: String,
    /// Set, within the namespace, holding the records.
    pub set_name: String,
    /// User name, if the cluster requires authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password, if the cluster requires authentication. Redacted in debug output.
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl StoreConfig {
    /// Validates the [`StoreConfig`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hosts.is_empty() {
            return Err(ValidationError::NoHosts);
        }

        for (idx, host) in self.hosts.iter().enumerate() {
            if host.host.trim().is_empty() {
                return Err(ValidationError::EmptyHost(idx));
            }
            if host.port == 0 {
                return Err(ValidationError::PortZero(host.to_string()));
            }
        }

        if self.namespace.trim().is_empty() {
            return Err(ValidationError::EmptyNamespace);
        }

        if self.set_name.trim().is_empty() {
            return Err(ValidationError::EmptySetName);
        }

        Ok(())
    }

    /// Renders the seed list as `a:1, b:2` for log lines.
    pub fn hosts_display(&self) -> String {
        self.hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
