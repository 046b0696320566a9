//! TOML configuration of the rotation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};

use crate::util::retention::RetentionConfig;

/// Config file read when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mssql-backup/rotate.toml";

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Configuration of the backup rotation.
pub struct Config {
    /// Backup directory written by the SQL Server backup job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Backups are stored in one folder per database.
    pub per_database: bool,

    /// Retention config.
    pub retention: RetentionConfig,
}

#[derive(Debug, Display, Error, From)]
/// Errors on loading the [Config].
pub enum ConfigError {
    /// The config file doesn't exist.
    #[from(ignore)]
    #[display("Config file not found: {}", _0.display())]
    NotFound(#[error(ignore)] PathBuf),
    /// Reading the config file failed.
    #[display("Reading the config file failed: {_0}")]
    Read(io::Error),
    /// The config file isn't valid.
    #[display("Parsing the config file failed: {_0}")]
    Parse(toml::de::Error),
}

impl Config {
    /// Reads the config from `path`.
    ///
    /// A missing file yields the default config unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(config_str) => Ok(toml::from_str(&config_str)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if required {
                    Err(ConfigError::NotFound(path.to_path_buf()))
                } else {
                    log::debug!(target: "config", "No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
