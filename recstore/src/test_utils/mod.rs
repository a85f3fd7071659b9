//! Helpers for exercising [`crate::client::RecordStoreClient`] in tests.
//!
//! - [`fault`] wraps a store and injects errors or panics into chosen operations.
//! - [`logs`] captures formatted log output so tests can count emitted lines.
//! - [`failpoints`] configures the client failpoints for the lifetime of a scenario.

pub mod failpoints;
pub mod fault;
pub mod logs;
