use config::load_config;
use config::shared::CustomersConfig;

/// Loads and validates the `customers` configuration.
pub fn load_customers_config() -> anyhow::Result<CustomersConfig> {
    let config = load_config::<CustomersConfig>()?;
    config.validate()?;

    Ok(config)
}
