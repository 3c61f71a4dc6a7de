use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::{Environment, UnknownEnvironment};

/// Directory holding the configuration files, relative to the working directory.
pub const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried for every configuration file, in order.
const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Prefix of environment variable overrides, e.g. `APP_WAREHOUSE__HOST`.
const ENV_PREFIX: &str = "APP";

/// Separator for nested keys in environment variable overrides.
const ENV_NESTING: &str = "__";

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{}` does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no `{stem}` configuration file in `{}` (tried {})", .directory.display(), EXTENSIONS.join(", "))]
    MissingFile {
        stem: &'static str,
        directory: PathBuf,
    },

    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),

    #[error("failed to merge configuration sources: {0}")]
    Build(#[source] config::ConfigError),

    #[error("configuration does not match the expected shape: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads a configuration value of type `T` from `./configuration`.
///
/// Later sources override earlier ones: `base.{yaml,yml,json}`, then the file named after
/// the [`Environment`], then `APP_`-prefixed environment variables where `__` separates
/// nested keys (`APP_WAREHOUSE__PASSWORD`).
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let directory = std::env::current_dir()
        .map_err(LoadConfigError::CurrentDir)?
        .join(CONFIGURATION_DIR);

    load_config_from(&directory, Environment::load()?)
}

fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingDirectory(directory.to_path_buf()));
    }

    let mut builder = config::Config::builder();
    for stem in ["base", environment.as_str()] {
        builder = builder.add_source(config::File::from(locate(directory, stem)?));
    }

    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_NESTING),
        )
        .build()
        .map_err(LoadConfigError::Build)?
        .try_deserialize()
        .map_err(LoadConfigError::Deserialization)
}

/// First existing `{stem}.{extension}` in `directory`.
fn locate(directory: &Path, stem: &'static str) -> Result<PathBuf, LoadConfigError> {
    EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
        .ok_or_else(|| LoadConfigError::MissingFile {
            stem,
            directory: directory.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        batch: u32,
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let directory =
            std::env::temp_dir().join(format!("dwh-config-{label}-{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        directory
    }

    #[test]
    fn missing_directory_is_reported() {
        let directory = std::env::temp_dir().join("dwh-config-does-not-exist");
        let err = load_config_from::<serde::de::IgnoredAny>(&directory, Environment::Dev)
            .unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingDirectory(_)));
    }

    #[test]
    fn missing_base_file_names_the_extensions() {
        let directory = scratch_dir("empty");

        let err = locate(&directory, "base").unwrap_err();
        assert!(err.to_string().starts_with("no `base` configuration file in"));
        assert!(err.to_string().contains("yaml, yml, json"));

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn environment_file_overrides_base() {
        let directory = scratch_dir("layered");
        std::fs::write(directory.join("base.yaml"), "name: base\nbatch: 10\n").unwrap();
        std::fs::write(directory.join("prod.json"), r#"{ "batch": 500 }"#).unwrap();

        let sample: Sample = load_config_from(&directory, Environment::Prod).unwrap();
        assert_eq!(sample.name, "base");
        assert_eq!(sample.batch, 500);

        std::fs::remove_dir_all(&directory).unwrap();
    }
}
