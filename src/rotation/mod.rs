//! Rotation of backup files produced by the SQL Server backup job.
//!
//! A [RetentionPolicy] describes which directory to rotate and how many
//! backups to keep. The [Rotator] snapshots the directory, orders the
//! backups newest first and deletes everything beyond the retention count
//! through a [Remover].

use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};
use regex::Regex;

mod rotator;
mod scan;

pub use rotator::{
    rotate, rotate_per_database, DeletionFailure, RotationResult, Rotations, Rotator,
};
pub use scan::BackupFile;

use crate::util::retention::{RetentionConfig, RetentionMode};

/// Default location of backups written by the SQL Server backup job.
pub const DEFAULT_BACKUP_DIR: &str = "/var/opt/mssql/backups";

/// Errors aborting a rotation before any file is deleted.
#[derive(Debug, Display, Error)]
pub enum RotationError {
    /// The retention count is negative.
    #[display("Invalid retention policy: keep count must not be negative (got {_0})")]
    InvalidPolicy(#[error(ignore)] i64),
    /// The file name pattern is not a valid regular expression.
    #[display("Invalid retention policy: file name pattern is invalid: {_0}")]
    InvalidPattern(regex::Error),
    /// The backup directory doesn't exist.
    #[display("Backup directory not found: {}", _0.display())]
    DirectoryNotFound(#[error(ignore)] PathBuf),
    /// The backup directory is a file or something else that isn't a directory.
    #[display("Backup path is not a directory: {}", _0.display())]
    NotADirectory(#[error(ignore)] PathBuf),
    /// Listing the backup directory failed.
    #[display("Scanning backup directory {} failed: {source}", path.display())]
    Scan { path: PathBuf, source: io::Error },
}

/// Which backups in [`directory`](Self::directory) are retained.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    directory: PathBuf,
    keep: usize,
    mode: RetentionMode,
    pattern: Option<Regex>,
}

impl RetentionPolicy {
    /// Keep the newest `keep` files of `directory`.
    ///
    /// Fails with [RotationError::InvalidPolicy] for a negative `keep`.
    pub fn new(directory: impl Into<PathBuf>, keep: i64) -> Result<Self, RotationError> {
        let keep = usize::try_from(keep).map_err(|_| RotationError::InvalidPolicy(keep))?;

        Ok(Self {
            directory: directory.into(),
            keep,
            mode: RetentionMode::default(),
            pattern: None,
        })
    }

    /// Builds the policy for `directory` out of a [RetentionConfig].
    pub fn from_config(
        directory: impl Into<PathBuf>,
        cfg: &RetentionConfig,
    ) -> Result<Self, RotationError> {
        let policy = Self::new(directory, cfg.keep)?.with_mode(cfg.mode);
        match &cfg.pattern {
            Some(pattern) => policy.with_pattern(pattern),
            None => Ok(policy),
        }
    }

    pub fn with_mode(mut self, mode: RetentionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restrict rotation to files whose name matches `pattern`.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, RotationError> {
        let pattern = Regex::new(pattern).map_err(RotationError::InvalidPattern)?;
        self.pattern = Some(pattern);
        Ok(self)
    }

    /// Same retention applied to another directory.
    pub fn for_directory(&self, directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..self.clone()
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    pub fn mode(&self) -> RetentionMode {
        self.mode
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

/// Deletes backup files selected by a rotation.
pub trait Remover {
    /// Removes the file at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Whether [`remove`](Self::remove) leaves the filesystem untouched.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Deletes files from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Only logs which files would be deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl Remover for DryRun {
    fn remove(&self, path: &Path) -> io::Result<()> {
        log::info!(target: "rotation", "Would delete {}", path.display());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
