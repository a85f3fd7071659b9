use serde::Deserialize;

use crate::load::Config;
use crate::shared::{StoreConfig, ValidationError};

/// Number of customers seeded when `seed.count` is not configured.
const DEFAULT_SEED_COUNT: u32 = 10;

/// Configuration of the `customers` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CustomersConfig {
    /// Record store connection settings.
    pub store: StoreConfig,
    /// Controls the generated customer records.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl CustomersConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;
        self.seed.validate()
    }
}

impl Config for CustomersConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["store.hosts"];
}

/// How many customers to write and verify.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeedConfig {
    #[serde(default = "default_seed_count")]
    pub count: u32,
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::SeedCountZero);
        }

        Ok(())
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SEED_COUNT,
        }
    }
}

fn default_seed_count() -> u32 {
    DEFAULT_SEED_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_defaults_to_ten_customers() {
        let config: CustomersConfig = serde_json::from_str(
            r#"{"store": {"hosts": ["127.0.0.1:3000"], "namespace": "test", "set_name": "phones"}}"#,
        )
        .unwrap();

        assert_eq!(config.seed.count, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_seed_count_is_rejected() {
        let config: CustomersConfig = serde_json::from_str(
            r#"{
                "store": {"hosts": ["127.0.0.1:3000"], "namespace": "test", "set_name": "phones"},
                "seed": {"count": 0}
            }"#,
        )
        .unwrap();

        assert_eq!(config.validate(), Err(ValidationError::SeedCountZero));
    }
}
