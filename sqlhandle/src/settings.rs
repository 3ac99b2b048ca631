use crate::config::ConnectionConfig;
use anyhow::Result;
use config::{Config, Environment, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

pub(crate) static DEFAULT_CONFIG: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/sqlhandle.toml"));

/// Prefix of environment variables that override settings
/// (e.g. `SQLHANDLE_CONNECTION__HOST`)
pub const ENVIRONMENT_PREFIX: &str = "SQLHANDLE";

/// Settings loaded from the built-in defaults, an optional configuration file and the
/// environment, in increasing order of precedence.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub log: LogSettings,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub auto_reconnect: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("database", &self.database)
            .field("auto_reconnect", &self.auto_reconnect)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

impl From<&ConnectionSettings> for ConnectionConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        ConnectionConfig::builder()
            .with_scheme(settings.scheme.as_str())
            .with_host(settings.host.as_str())
            .with_port(settings.port)
            .with_username(settings.username.as_str())
            .with_password(settings.password.as_str())
            .with_database(settings.database.as_str())
            .with_auto_reconnect(settings.auto_reconnect)
            .build()
    }
}

impl Settings {
    /// Create a loader for the settings.
    #[must_use]
    pub fn loader() -> SettingsLoader {
        SettingsLoader::default()
    }

    /// The connection configuration described by these settings.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::from(&self.connection)
    }
}

/// A builder that loads [Settings].
#[derive(Clone, Debug, Default)]
pub struct SettingsLoader {
    config_file: Option<PathBuf>,
    environment: Option<HashMap<String, String>>,
}

impl SettingsLoader {
    /// Read overrides from the given TOML file, which must exist. Without a file, a
    /// `sqlhandle.toml` in the working directory is used when present.
    #[must_use]
    pub fn with_config_file<P: Into<PathBuf>>(mut self, config_file: P) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    /// Read environment overrides from the given variables instead of the process
    /// environment.
    #[must_use]
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Load the [Settings].
    ///
    /// # Errors
    /// * If a configuration source cannot be read or a value has the wrong type
    pub fn load(self) -> Result<Settings> {
        let file = match &self.config_file {
            Some(config_file) => {
                debug!("Configuration file: {}", config_file.display());
                config::File::from(config_file.as_path())
                    .format(FileFormat::Toml)
                    .required(true)
            }
            None => config::File::new("sqlhandle", FileFormat::Toml).required(false),
        };

        debug!("Configuration environment prefix: {ENVIRONMENT_PREFIX}");
        let environment = Environment::with_prefix(ENVIRONMENT_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(self.environment);

        let config = Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(file)
            .add_source(environment)
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
