//! Warehouse loader binary.
//!
//! Loads the bronze extracts of the source database into the silver and gold layers of the
//! warehouse. The run mode is chosen on the command line, connections and layer schemas
//! come from the configuration files.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Once;

use crate::cli::Cli;
use crate::config::load_loader_config;
use crate::core::start_loader_with_config;
use crate::error::{LoaderError, LoaderResult};
use dwh_telemetry::tracing::init_tracing;

mod cli;
mod config;
mod core;
mod error;
mod migrations;

/// Ensures the crypto provider is only installed once.
static INIT_CRYPTO: Once = Once::new();

/// Installs the AWS LC provider as the process wide default for rustls.
fn install_crypto_provider() {
    INIT_CRYPTO.call_once(|| {
        // Another provider installed first is kept.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration, initializes tracing and runs the requested load on a fresh runtime.
fn run(cli: Cli) -> LoaderResult<()> {
    let config = load_loader_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(LoaderError::config)?;

    install_crypto_provider();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_loader_with_config(config, cli))
}
