use dwh::error::EtlError;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::{self, Write};

pub type LoaderResult<T> = Result<T, LoaderError>;

/// What failed in the loader process.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Load(EtlError),

    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn Error + Send + Sync>),

    #[error("migration error: {0}")]
    Migration(#[source] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[source] std::io::Error),
}

/// Error of the loader binary.
///
/// Load failures carry their own backtrace inside the [`EtlError`]. The other failures
/// capture one here.
#[derive(Debug)]
pub struct LoaderError {
    failure: Failure,
    backtrace: Option<Backtrace>,
}

impl LoaderError {
    fn new(failure: Failure) -> Self {
        let backtrace = match failure {
            Failure::Load(_) => None,
            _ => Some(Backtrace::capture()),
        };

        Self { failure, backtrace }
    }

    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        Self::new(Failure::Config(Box::new(err)))
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    pub fn category(&self) -> &'static str {
        match self.failure {
            Failure::Load(_) => "load error",
            Failure::Config(_) => "configuration error",
            Failure::Migration(_) => "migration error",
            Failure::Io(_) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &self.failure {
            Failure::Load(err) => err.backtrace(),
            _ => self.backtrace.as_ref(),
        }
    }

    /// Multi line rendering for the terminal: the error, its chain of causes and the
    /// backtrace when one was captured.
    pub fn render_report(&self) -> String {
        let mut out = format!("dwh-loader failed\ncategory: {}\nerror: {self}\n", self.category());

        let causes = std::iter::successors(Error::source(self), |&err| err.source());
        for (position, cause) in causes.enumerate() {
            let _ = writeln!(out, "cause {}: {cause}", position + 1);
        }

        if let Some(backtrace) = self
            .backtrace()
            .filter(|backtrace| backtrace.status() == BacktraceStatus::Captured)
        {
            let _ = writeln!(out, "backtrace:\n{}", backtrace.to_string().trim_end());
        }

        out
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.failure, f)
    }
}

impl Error for LoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failure.source()
    }
}

impl From<sqlx::Error> for LoaderError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(Failure::Migration(err))
    }
}

impl From<sqlx::migrate::MigrateError> for LoaderError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::new(Failure::Migration(err.into()))
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        Self::new(Failure::Io(err))
    }
}

impl From<EtlError> for LoaderError {
    fn from(err: EtlError) -> Self {
        Self::new(Failure::Load(err))
    }
}
