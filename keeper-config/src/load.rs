use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use rust_cli_config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions probed, in order, for every configuration file stem.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of environment variables overriding file values.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys, e.g. `APP_SYNCHRONIZER__SYNC_INTERVAL_MS`.
const ENV_SEPARATOR: &str = "__";

const LIST_SEPARATOR: &str = ",";

/// Implemented by top-level configuration structures that can be loaded with [`load_config`].
pub trait Config {
    /// Keys whose environment variable values are split on commas into lists.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Errors raised while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    #[error("could not locate the base configuration in `{directory}`; attempted: {attempted}")]
    BaseConfigurationMissing { directory: PathBuf, attempted: String },

    #[error("failed to load {kind} from `{path}`: {source}")]
    ConfigurationFileLoad {
        kind: String,
        path: PathBuf,
        source: rust_cli_config::ConfigError,
    },

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("failed to build configuration: {0}")]
    Builder(#[source] rust_cli_config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] rust_cli_config::ConfigError),
}

#[derive(Debug, Clone, Copy)]
enum ConfigFileKind {
    Base,
    Environment(Environment),
}

impl ConfigFileKind {
    fn stem(&self) -> &'static str {
        match self {
            ConfigFileKind::Base => "base",
            ConfigFileKind::Environment(env) => env.as_str(),
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::Base => f.write_str("base configuration"),
            ConfigFileKind::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Loads configuration from `./configuration`.
///
/// `base.(yaml|yml|json)` is mandatory. `{environment}.(yaml|yml|json)` is layered on top
/// when present, and `APP_`-prefixed environment variables are applied last.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load()?;

    load_config_from(&base_path.join(CONFIGURATION_DIR), environment)
}

/// Loads configuration from an explicit directory and environment.
pub fn load_config_from<T>(
    configuration_directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    if !configuration_directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            configuration_directory.to_path_buf(),
        ));
    }

    let Some(base_file) = find_configuration_file(configuration_directory, ConfigFileKind::Base)
    else {
        return Err(LoadConfigError::BaseConfigurationMissing {
            directory: configuration_directory.to_path_buf(),
            attempted: attempted_paths(configuration_directory, ConfigFileKind::Base),
        });
    };

    let builder = rust_cli_config::Config::builder()
        .add_source(rust_cli_config::File::from(base_file.clone()));
    validate_source(&builder, ConfigFileKind::Base, &base_file)?;

    let environment_kind = ConfigFileKind::Environment(environment);
    let builder = match find_configuration_file(configuration_directory, environment_kind) {
        Some(environment_file) => {
            let builder =
                builder.add_source(rust_cli_config::File::from(environment_file.clone()));
            validate_source(&builder, environment_kind, &environment_file)?;
            builder
        }
        None => builder,
    };

    let mut environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    if !T::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in T::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn candidate_paths(directory: &Path, kind: ConfigFileKind) -> impl Iterator<Item = PathBuf> + '_ {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(move |extension| directory.join(format!("{}.{extension}", kind.stem())))
}

fn find_configuration_file(directory: &Path, kind: ConfigFileKind) -> Option<PathBuf> {
    candidate_paths(directory, kind).find(|path| path.is_file())
}

fn attempted_paths(directory: &Path, kind: ConfigFileKind) -> String {
    candidate_paths(directory, kind)
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_source(
    builder: &ConfigBuilder<DefaultState>,
    kind: ConfigFileKind,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map(|_| ())
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            kind: kind.to_string(),
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{KeeperNodeConfig, StoreConfig};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "keeper-config-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const BASE: &str = r#"{
        "job": {
            "job_id": 42,
            "contract_address": "0x00000000000000000000000000000000000000aa",
            "from_address": "0x00000000000000000000000000000000000000cc"
        },
        "synchronizer": { "sync_interval_ms": 1000 },
        "store": "memory"
    }"#;

    #[test]
    fn loads_base_configuration_without_environment_file() {
        let dir = scratch_dir("base-only");
        std::fs::write(dir.join("base.json"), BASE).unwrap();

        let config: KeeperNodeConfig = load_config_from(&dir, Environment::Prod).unwrap();

        assert_eq!(config.job.job_id, 42);
        assert_eq!(config.synchronizer.sync_interval_ms, 1000);
        assert_eq!(
            config.synchronizer.sync_upkeep_queue_size,
            crate::shared::SynchronizerConfig::DEFAULT_SYNC_UPKEEP_QUEUE_SIZE
        );
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = scratch_dir("override");
        std::fs::write(dir.join("base.json"), BASE).unwrap();
        std::fs::write(
            dir.join("staging.json"),
            r#"{ "synchronizer": { "sync_upkeep_queue_size": 3 } }"#,
        )
        .unwrap();

        let config: KeeperNodeConfig = load_config_from(&dir, Environment::Staging).unwrap();

        assert_eq!(config.synchronizer.sync_interval_ms, 1000);
        assert_eq!(config.synchronizer.sync_upkeep_queue_size, 3);
    }

    #[test]
    fn missing_base_configuration_is_reported() {
        let dir = scratch_dir("missing");

        let err = load_config_from::<KeeperNodeConfig>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::BaseConfigurationMissing { .. }));
    }
}
