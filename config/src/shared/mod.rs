//! Configuration structures shared between the record store crates.

mod base;
mod customers;
mod store;

pub use base::ValidationError;
pub use customers::{CustomersConfig, SeedConfig};
pub use store::{HostConfig, StoreConfig};
