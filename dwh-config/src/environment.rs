use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Variable naming the runtime environment. Unset means [`Environment::Dev`].
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

/// Runtime environment of the loader.
///
/// Picks the configuration file layered over `base` and the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

/// An environment name other than `dev` or `prod`.
#[derive(Debug, Error)]
#[error("unsupported environment `{0}`, expected `dev` or `prod`")]
pub struct UnknownEnvironment(String);

impl Environment {
    /// Reads [`ENVIRONMENT_VARIABLE`].
    pub fn load() -> Result<Environment, UnknownEnvironment> {
        match std::env::var(ENVIRONMENT_VARIABLE) {
            Ok(name) => name.parse(),
            Err(_) => Ok(Environment::default()),
        }
    }

    /// Name of the environment, also the stem of its configuration file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        [Environment::Dev, Environment::Prod]
            .into_iter()
            .find(|environment| name.trim().eq_ignore_ascii_case(environment.as_str()))
            .ok_or_else(|| UnknownEnvironment(name.to_string()))
    }
}
