use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What to do with books already added when an import source fails
/// part-way through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadErrorPolicy {
    /// Remove every book added by the failed import, leaving the catalog as
    /// it was before the import started.
    #[default]
    RollBack,
    /// Keep the books that were read before the failure.
    KeepPartial,
}

/// Configuration for the catalog front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// How imports react to a read error in the middle of a file.
    pub on_read_error: ReadErrorPolicy,

    /// Whether mutating commands require a logged-in, authorized user.
    ///
    /// When `false` (the default) no credentials are checked.
    pub require_authorization: bool,

    /// Where the catalog snapshot lives, if not given on the command line.
    pub data: Option<PathBuf>,
}

/// Errors that can occur when loading or saving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this configuration.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration, falling back to the defaults if the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        on_read_error: ReadErrorPolicy,

        #[serde(default)]
        require_authorization: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<PathBuf>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                on_read_error,
                require_authorization,
                data,
            } => Self {
                on_read_error,
                require_authorization,
                data,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            on_read_error: config.on_read_error,
            require_authorization: config.require_authorization,
            data: config.data,
        }
    }
}
