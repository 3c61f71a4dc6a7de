use std::sync::Once;

use dwh_config::environment::{Environment, UnknownEnvironment};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable enabling log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] UnknownEnvironment),

    #[error("failed to install the global tracing subscriber: {0}")]
    Init(#[source] tracing_subscriber::util::TryInitError),
}

/// Flushes buffered log lines when dropped.
///
/// Must be held until the process exits, otherwise the last lines may be lost.
#[must_use = "dropping the flusher stops log output"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global subscriber for a binary.
///
/// Logs go to stdout through a non-blocking writer. Development renders human readable
/// lines, production renders JSON. The filter defaults to `info` for the application and
/// the `dwh` crates and can be overridden with `RUST_LOG`.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load().map_err(TracingError::Environment)?;
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(app_name).into());

    let registry = tracing_subscriber::registry().with(filter);
    match environment {
        Environment::Dev => registry
            .with(fmt::layer().with_writer(writer))
            .try_init()
            .map_err(TracingError::Init)?,
        Environment::Prod => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
            .map_err(TracingError::Init)?,
    }

    Ok(LogFlusher { _guard: guard })
}

/// Installs a test writer subscriber once per process when `ENABLE_TRACING` is set.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
        return;
    }

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

fn default_filter(app_name: &str) -> String {
    let app_target = app_name.replace('-', "_");
    format!("{app_target}=info,dwh=info,dwh_config=info")
}
