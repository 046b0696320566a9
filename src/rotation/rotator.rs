use std::io;
use std::path::PathBuf;

use derive_more::{Display, Error};

use super::scan::{self, BackupFile};
use super::{FsRemover, Remover, RetentionPolicy, RotationError};
use crate::util::retention::Retention;

/// A backup that couldn't be deleted.
#[derive(Debug, Display, Error)]
#[display("Deleting {} failed: {error}", file.path().display())]
pub struct DeletionFailure {
    #[error(ignore)]
    pub file: BackupFile,
    #[error(source)]
    pub error: io::Error,
}

impl DeletionFailure {
    pub fn is_permission_denied(&self) -> bool {
        self.error.kind() == io::ErrorKind::PermissionDenied
    }
}

/// Outcome of rotating a single directory.
#[derive(Debug, Default)]
pub struct RotationResult {
    /// The rotated directory.
    pub directory: PathBuf,
    /// Retained backups, newest first.
    pub kept: Vec<BackupFile>,
    /// Deleted backups in order of deletion.
    ///
    /// On a dry run these are the backups that would have been deleted.
    pub deleted: Vec<BackupFile>,
    /// Backups whose deletion failed.
    pub failed: Vec<DeletionFailure>,
    pub dry_run: bool,
}

impl RotationResult {
    /// Every selected backup was deleted.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rotates `policy.directory()`, deleting from the filesystem.
pub fn rotate(policy: &RetentionPolicy) -> Result<RotationResult, RotationError> {
    Rotator::new(FsRemover).rotate(policy)
}

/// Rotates every database folder in `policy.directory()`, deleting from the filesystem.
pub fn rotate_per_database(policy: &RetentionPolicy) -> Result<Rotations, RotationError> {
    Rotator::new(FsRemover).rotate_per_database(policy)
}

/// Outcome of rotating one or more directories.
#[derive(Debug, Default)]
pub struct Rotations {
    /// Results of the rotated directories.
    pub results: Vec<RotationResult>,
    /// Database folders that couldn't be rotated.
    pub errors: Vec<RotationError>,
}

impl Rotations {
    /// Every directory was rotated and every selected backup deleted.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.results.iter().all(RotationResult::is_success)
    }
}

impl From<RotationResult> for Rotations {
    fn from(result: RotationResult) -> Self {
        Self {
            results: vec![result],
            errors: Vec::new(),
        }
    }
}

/// Applies [RetentionPolicy]s, deleting through a [Remover].
#[derive(Debug, Clone, Default)]
pub struct Rotator<R> {
    remover: R,
}

impl<R: Remover> Rotator<R> {
    pub fn new(remover: R) -> Self {
        Self { remover }
    }

    /// Deletes all but the newest backups directly inside `policy.directory()`.
    ///
    /// The directory is listed once up front. A failed deletion is recorded
    /// in [RotationResult::failed] and doesn't stop the remaining deletions.
    pub fn rotate(&self, policy: &RetentionPolicy) -> Result<RotationResult, RotationError> {
        let directory = policy.directory();
        scan::check_directory(directory)?;

        log::info!(
            target: "rotation",
            "Rotate backups in {} keeping {} ({})",
            directory.display(),
            policy.keep(),
            policy.mode()
        );

        let files = scan::snapshot(directory, policy.pattern())?;
        let (kept, remove) = partition(files, policy);

        let mut result = RotationResult {
            directory: directory.to_path_buf(),
            kept,
            dry_run: self.remover.is_dry_run(),
            ..Default::default()
        };

        for file in remove {
            match self.remover.remove(file.path()) {
                Ok(()) => {
                    log::debug!(target: "rotation", "Deleted {}", file.path().display());
                    result.deleted.push(file);
                }
                Err(error) => {
                    let failure = DeletionFailure { file, error };
                    log::error!(target: "rotation", "{failure}");
                    result.failed.push(failure);
                }
            }
        }

        log::info!(
            target: "rotation",
            "Finished rotation of {}: {} kept, {} deleted, {} failed",
            directory.display(),
            result.kept.len(),
            result.deleted.len(),
            result.failed.len()
        );

        Ok(result)
    }

    /// Rotates every subdirectory of `policy.directory()` on its own.
    ///
    /// Backups directly inside `policy.directory()` are left alone. Only errors
    /// on the root abort; a database folder that can't be rotated is recorded
    /// in [Rotations::errors] and the remaining folders are still rotated.
    pub fn rotate_per_database(
        &self,
        policy: &RetentionPolicy,
    ) -> Result<Rotations, RotationError> {
        let root = policy.directory();
        scan::check_directory(root)?;

        let mut rotations = Rotations::default();
        for database_dir in scan::subdirectories(root)? {
            match self.rotate(&policy.for_directory(&database_dir)) {
                Ok(result) => rotations.results.push(result),
                Err(RotationError::DirectoryNotFound(dir)) => {
                    log::warn!(target: "rotation", "Database folder vanished: {}", dir.display());
                }
                Err(RotationError::Scan { path, source })
                    if source.kind() == io::ErrorKind::NotFound =>
                {
                    log::warn!(target: "rotation", "Database folder vanished: {}", path.display());
                }
                Err(e) => {
                    log::error!(target: "rotation", "{e}");
                    rotations.errors.push(e);
                }
            }
        }

        Ok(rotations)
    }
}

/// Splits backups ordered newest first into retained and removed ones.
fn partition(
    files: Vec<BackupFile>,
    policy: &RetentionPolicy,
) -> (Vec<BackupFile>, Vec<BackupFile>) {
    let mut retention = Retention::new(policy.keep(), policy.mode());
    files
        .into_iter()
        .partition(|file| retention.retain(file.modified()))
}
