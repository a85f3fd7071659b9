//! Record store client facade.
//!
//! [`client::RecordStoreClient`] wraps a connection to a distributed key-value database and
//! exposes the handful of operations the customer tooling needs: declaring a secondary
//! index, upserting a record by key, fetching a record by key and fetching a record by an
//! equality match on an indexed field.
//!
//! The database is reached through the [`store::base::RecordStore`] trait. The production
//! backend talks to Redis (feature `redis`); [`store::memory::MemoryStore`] keeps everything
//! in memory and is what the test suites run against.

pub mod client;
pub mod error;
pub mod failpoints;
mod macros;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
