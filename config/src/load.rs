use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use rust_cli_config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration file.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys, e.g. `APP_STORE__NAMESPACE`.
const ENV_SEPARATOR: &str = "__";

/// Separator for list values, e.g. `APP_STORE__HOSTS=10.0.0.1:3000,10.0.0.2:3000`.
const LIST_SEPARATOR: &str = ",";

/// Implemented by top-level configuration structures.
pub trait Config {
    /// Dotted keys whose environment overrides are split on [`LIST_SEPARATOR`].
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Which layer of configuration a file provides.
#[derive(Debug, Clone, Copy)]
enum ConfigLayer {
    Base,
    Environment(Environment),
}

impl ConfigLayer {
    fn file_stem(&self) -> Cow<'static, str> {
        match self {
            ConfigLayer::Base => Cow::Borrowed("base"),
            ConfigLayer::Environment(env) => Cow::Borrowed(env.as_str()),
        }
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::Base => f.write_str("base configuration"),
            ConfigLayer::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    #[error("could not locate {layer} in `{directory}`; attempted: {attempted}")]
    ConfigurationFileMissing {
        layer: String,
        directory: PathBuf,
        attempted: String,
    },

    #[error("failed to load {layer} from `{path}`: {source}")]
    ConfigurationFileLoad {
        layer: String,
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

/// Loads configuration for the environment named by `APP_ENVIRONMENT` from
/// `./configuration`.
///
/// Reads `base.(yaml|yml|json)`, then `{environment}.(yaml|yml|json)`, then applies
/// `APP_`-prefixed environment variables on top.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load()?;

    load_config_from(&base_path, environment)
}

/// Same as [`load_config`] with an explicit application root and environment.
pub fn load_config_from<T>(base_path: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let directory = base_path.join(CONFIGURATION_DIR);
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(directory));
    }

    let mut builder = rust_cli_config::Config::builder();
    for layer in [ConfigLayer::Base, ConfigLayer::Environment(environment)] {
        let path = find_configuration_file(&directory, layer)?;
        builder = builder.add_source(rust_cli_config::File::from(path.clone()));
        // Building after each file pins parse errors to the file that caused them.
        check_layer(&builder, layer, &path)?;
    }

    let settings = builder
        .add_source(environment_overrides::<T>())
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn environment_overrides<T: Config>() -> rust_cli_config::Environment {
    let mut source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    if !T::LIST_PARSE_KEYS.is_empty() {
        source = source.try_parsing(true).list_separator(LIST_SEPARATOR);
        for key in T::LIST_PARSE_KEYS {
            source = source.with_list_parse_key(key);
        }
    }

    source
}

fn find_configuration_file(directory: &Path, layer: ConfigLayer) -> Result<PathBuf, LoadConfigError> {
    let stem = layer.file_stem();
    let candidates: Vec<PathBuf> = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .collect();

    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }

    let attempted = candidates
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::ConfigurationFileMissing {
        layer: layer.to_string(),
        directory: directory.to_path_buf(),
        attempted,
    })
}

fn check_layer(
    builder: &ConfigBuilder<DefaultState>,
    layer: ConfigLayer,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map(|_| ())
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            layer: layer.to_string(),
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct SampleConfig {
        name: String,
        port: u16,
    }

    impl Config for SampleConfig {
        const LIST_PARSE_KEYS: &'static [&'static str] = &[];
    }

    fn write_configuration(root: &Path, files: &[(&str, &str)]) {
        let directory = root.join(CONFIGURATION_DIR);
        fs::create_dir_all(&directory).unwrap();
        for (name, contents) in files {
            fs::write(directory.join(name), contents).unwrap();
        }
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let root = tempfile::tempdir().unwrap();
        write_configuration(
            root.path(),
            &[
                ("base.yaml", "name: base\nport: 3000\n"),
                ("prod.yaml", "port: 4000\n"),
            ],
        );

        let config: SampleConfig = load_config_from(root.path(), Environment::Prod).unwrap();

        assert_eq!(config.name, "base");
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn json_files_are_accepted() {
        let root = tempfile::tempdir().unwrap();
        write_configuration(
            root.path(),
            &[
                ("base.json", r#"{"name": "json", "port": 3000}"#),
                ("dev.json", "{}"),
            ],
        );

        let config: SampleConfig = load_config_from(root.path(), Environment::Dev).unwrap();

        assert_eq!(config.name, "json");
    }

    #[test]
    fn missing_environment_file_lists_attempted_paths() {
        let root = tempfile::tempdir().unwrap();
        write_configuration(root.path(), &[("base.yaml", "name: base\nport: 1\n")]);

        let err = load_config_from::<SampleConfig>(root.path(), Environment::Dev).unwrap_err();

        match err {
            LoadConfigError::ConfigurationFileMissing { attempted, .. } => {
                assert!(attempted.contains("dev.yaml"));
                assert!(attempted.contains("dev.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();

        let err = load_config_from::<SampleConfig>(root.path(), Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingConfigurationDirectory(_)));
    }

    #[test]
    fn malformed_file_names_the_failing_layer() {
        let root = tempfile::tempdir().unwrap();
        write_configuration(
            root.path(),
            &[("base.yaml", "name: base\nport: 1\n"), ("dev.yaml", "port: [\n")],
        );

        let err = load_config_from::<SampleConfig>(root.path(), Environment::Dev).unwrap_err();

        match err {
            LoadConfigError::ConfigurationFileLoad { layer, .. } => {
                assert_eq!(layer, "dev environment configuration");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
