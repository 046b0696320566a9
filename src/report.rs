//! Summaries of a rotation for the operator.

use std::fmt;

use crate::rotation::{BackupFile, RotationResult, Rotations};

/// Human readable summary of a [RotationResult].
pub struct Summary<'a>(pub &'a RotationResult);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let deleted = if result.dry_run {
            "would delete"
        } else {
            "deleted"
        };

        write!(
            f,
            "{}: kept {}, {deleted} {}, failed {}",
            result.directory.display(),
            result.kept.len(),
            result.deleted.len(),
            result.failed.len()
        )?;

        for file in &result.deleted {
            write!(f, "\n  {deleted}: {}", file.path().display())?;
        }
        for failure in &result.failed {
            write!(f, "\n  failed: {}: {}", failure.file.path().display(), failure.error)?;
        }

        Ok(())
    }
}

/// Machine readable summary of a [RotationResult].
#[derive(Debug, serde::Serialize)]
pub struct Report {
    pub directory: String,
    pub dry_run: bool,
    pub kept: Vec<FileEntry>,
    pub deleted: Vec<FileEntry>,
    pub failed: Vec<FailureEntry>,
}

#[derive(Debug, serde::Serialize)]
pub struct FileEntry {
    pub path: String,
    pub modified: String,
}

#[derive(Debug, serde::Serialize)]
pub struct FailureEntry {
    pub path: String,
    pub error: String,
}

impl From<&BackupFile> for FileEntry {
    fn from(file: &BackupFile) -> Self {
        Self {
            path: file.path().display().to_string(),
            modified: file.modified_rfc3339(),
        }
    }
}

impl From<&RotationResult> for Report {
    fn from(result: &RotationResult) -> Self {
        Self {
            directory: result.directory.display().to_string(),
            dry_run: result.dry_run,
            kept: result.kept.iter().map(FileEntry::from).collect(),
            deleted: result.deleted.iter().map(FileEntry::from).collect(),
            failed: result
                .failed
                .iter()
                .map(|failure| FailureEntry {
                    path: failure.file.path().display().to_string(),
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Machine readable summary of [Rotations].
#[derive(Debug, serde::Serialize)]
pub struct RunReport {
    pub rotations: Vec<Report>,
    pub errors: Vec<String>,
}

impl From<&Rotations> for RunReport {
    fn from(rotations: &Rotations) -> Self {
        Self {
            rotations: rotations.results.iter().map(Report::from).collect(),
            errors: rotations.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Renders [Rotations] as text or, with `json` set, as pretty JSON.
pub fn render(rotations: &Rotations, json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(&RunReport::from(rotations));
    }

    let mut lines: Vec<String> = rotations
        .results
        .iter()
        .map(|result| Summary(result).to_string())
        .collect();
    lines.extend(rotations.errors.iter().map(|e| format!("error: {e}")));

    Ok(lines.join("\n"))
}
