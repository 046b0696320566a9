use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use regex::Regex;

use super::RotationError;

/// A backup file found in the rotated directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    path: PathBuf,
    modified: SystemTime,
}

impl BackupFile {
    pub(crate) fn new(path: PathBuf, modified: SystemTime) -> Self {
        Self { path, modified }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last modification, used as the age of the backup.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }

    /// Modification time formatted as RFC 3339 in local time.
    pub fn modified_rfc3339(&self) -> String {
        DateTime::<Local>::from(self.modified).to_rfc3339()
    }
}

/// Makes sure `dir` exists and is a directory.
pub(super) fn check_directory(dir: &Path) -> Result<(), RotationError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(RotationError::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RotationError::DirectoryNotFound(dir.to_path_buf()))
        }
        Err(source) => Err(RotationError::Scan {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Lists the regular files directly inside `dir`, newest first.
///
/// Subdirectories and symbolic links are skipped. Equal modification times
/// are ordered by file name.
pub(super) fn snapshot(
    dir: &Path,
    pattern: Option<&Regex>,
) -> Result<Vec<BackupFile>, RotationError> {
    let scan_err = |source: io::Error| RotationError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let path = entry.path();

        if let Some(pattern) = pattern {
            let name = entry.file_name();
            if !pattern.is_match(&name.to_string_lossy()) {
                log::trace!(target: "rotation::scan", "Ignoring {}: name doesn't match", path.display());
                continue;
            }
        }

        // DirEntry::metadata doesn't follow symlinks
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!(target: "rotation::scan", "Skipping {}: {e}", path.display());
                continue;
            }
        };
        if !metadata.is_file() {
            log::trace!(target: "rotation::scan", "Ignoring {}: not a regular file", path.display());
            continue;
        }

        let modified = metadata.modified().map_err(scan_err)?;
        files.push(BackupFile::new(path, modified));
    }

    sort_newest_first(&mut files);
    log::debug!(target: "rotation::scan", "Found {} backup(s) in {}", files.len(), dir.display());

    Ok(files)
}

/// Lists the directories directly inside `dir`, ordered by name.
pub(super) fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, RotationError> {
    let scan_err = |source: io::Error| RotationError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    Ok(dirs)
}

pub(super) fn sort_newest_first(files: &mut [BackupFile]) {
    files.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.file_name().cmp(b.file_name()))
    });
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn backup(name: &str, secs: u64) -> BackupFile {
        BackupFile::new(
            PathBuf::from("/backups").join(name),
            SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        )
    }

    fn touch(dir: &Path, name: &str, secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn names(files: &[BackupFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn sorts_by_modification_then_name() {
        let mut files = vec![
            backup("b.bak", 100),
            backup("c.bak", 300),
            backup("a.bak", 100),
        ];
        sort_newest_first(&mut files);

        assert_eq!(names(&files), ["c.bak", "a.bak", "b.bak"]);
    }

    #[test]
    fn snapshot_skips_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "db1.bak", 100);
        touch(temp_dir.path(), "db2.bak", 200);
        fs::create_dir(temp_dir.path().join("northwind")).unwrap();
        touch(&temp_dir.path().join("northwind"), "nested.bak", 300);

        let files = snapshot(temp_dir.path(), None).unwrap();
        assert_eq!(names(&files), ["db2.bak", "db1.bak"]);
    }

    #[cfg(unix)]
    #[test]
    fn snapshot_skips_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(outside.path(), "foreign.bak", 100);
        std::os::unix::fs::symlink(
            outside.path().join("foreign.bak"),
            temp_dir.path().join("link.bak"),
        )
        .unwrap();

        let files = snapshot(temp_dir.path(), None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn snapshot_applies_pattern() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "db.bak", 100);
        touch(temp_dir.path(), "db.trn", 200);
        touch(temp_dir.path(), "notes.txt", 300);

        let pattern = Regex::new(r"\.(bak|trn)$").unwrap();
        let files = snapshot(temp_dir.path(), Some(&pattern)).unwrap();
        assert_eq!(names(&files), ["db.trn", "db.bak"]);
    }

    #[test]
    fn check_directory_errors() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "file.bak", 100);

        assert!(check_directory(temp_dir.path()).is_ok());
        assert!(matches!(
            check_directory(&temp_dir.path().join("missing")),
            Err(RotationError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            check_directory(&temp_dir.path().join("file.bak")),
            Err(RotationError::NotADirectory(_))
        ));
    }

    #[test]
    fn subdirectories_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("pubs")).unwrap();
        fs::create_dir(temp_dir.path().join("northwind")).unwrap();
        touch(temp_dir.path(), "top.bak", 100);

        let dirs = subdirectories(temp_dir.path()).unwrap();
        assert_eq!(
            dirs,
            [temp_dir.path().join("northwind"), temp_dir.path().join("pubs")]
        );
    }
}
