//! Customer demonstration binary.
//!
//! Connects to the configured record store, indexes customer phone numbers, writes a batch of
//! generated customers and checks that every one of them reads back by id and by phone.

use std::process::ExitCode;

use telemetry::init_tracing;
use tracing::error;

use crate::config::load_customers_config;
use crate::core::start_customers_with_config;

mod config;
mod core;
mod customer;

/// Exits with a failure status when the store is unreachable or a customer fails verification.
fn main() -> anyhow::Result<ExitCode> {
    let customers_config = load_customers_config()?;

    // Dropped at the end of `main`, which flushes buffered log lines before the process exits.
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(start_customers_with_config(customers_config));

    match outcome {
        Ok(report) if report.is_clean() => Ok(ExitCode::SUCCESS),
        Ok(report) => {
            for mismatch in report.mismatches() {
                error!(%mismatch, "customer verification failed");
            }

            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            error!(error = %err, "customers scenario aborted");

            Ok(ExitCode::FAILURE)
        }
    }
}
