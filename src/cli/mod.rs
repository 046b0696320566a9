use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::config::Config;
use crate::rotation::DEFAULT_BACKUP_DIR;
use crate::util::retention::{RetentionConfig, RetentionMode};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,

    /// Config file. Defaults to /etc/mssql-backup/rotate.toml if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Only report which backups would be deleted.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the default config and exit.
    #[arg(long)]
    pub print_default_config: bool,

    /// Number of newest backups (or days of backups) to keep.
    #[arg(long, short = 'k', env = "MSSQL_BACKUP_KEEP", allow_negative_numbers = true)]
    pub keep: Option<i64>,

    /// Whether `--keep` counts backups or days.
    #[arg(long, value_enum)]
    pub mode: Option<RetentionMode>,

    /// Only rotate files whose name matches this regular expression.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Rotate each database folder inside the backup directory separately.
    #[arg(long)]
    pub per_database: bool,

    /// Backup directory written by the SQL Server backup job.
    #[arg(env = "MSSQL_BACKUP_DIR")]
    pub directory: Option<PathBuf>,
}

impl Cli {
    /// Backup directory, falling back to the config and then the default location.
    pub fn directory(&self, config: &Config) -> PathBuf {
        self.directory
            .clone()
            .or_else(|| config.directory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR))
    }

    /// Retention of the config overridden by command line arguments.
    pub fn retention(&self, config: &Config) -> RetentionConfig {
        let base = &config.retention;
        RetentionConfig {
            keep: self.keep.unwrap_or(base.keep),
            mode: self.mode.unwrap_or(base.mode),
            pattern: self.pattern.clone().or_else(|| base.pattern.clone()),
        }
    }

    pub fn per_database(&self, config: &Config) -> bool {
        self.per_database || config.per_database
    }
}
