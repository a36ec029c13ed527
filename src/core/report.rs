use crate::core::policy::Action;
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAction {
    pub action: Action,
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub path: PathBuf,
    pub message: String,
}

/// Files left behind in a collection folder after the user declined every
/// option for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedFiles {
    pub folder: PathBuf,
    pub files: Vec<String>,
}

/// Outcome of one reconciliation pass, fed back by every policy operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub applied: Vec<AppliedAction>,
    pub skipped: Vec<PathBuf>,
    pub errors: Vec<ReportedError>,
    pub unmatched: Vec<UnmatchedFiles>,
}

impl ReconciliationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&mut self, action: Action, source: &Path, destination: &Path) {
        log::info!(
            "{:?}: {} -> {}",
            action,
            source.display(),
            destination.display()
        );
        self.applied.push(AppliedAction {
            action,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }

    pub fn skipped(&mut self, path: &Path) {
        log::debug!("Skipped {}", path.display());
        self.skipped.push(path.to_path_buf());
    }

    pub fn failed(&mut self, path: &Path, error: impl Display) {
        log::error!("{}: {}", path.display(), error);
        self.errors.push(ReportedError {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    pub fn unmatched(&mut self, folder: &Path, files: Vec<String>) {
        if files.is_empty() {
            return;
        }
        log::warn!(
            "{} unmatched file(s) left in {}",
            files.len(),
            folder.display()
        );
        self.unmatched.push(UnmatchedFiles {
            folder: folder.to_path_buf(),
            files,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
            && self.skipped.is_empty()
            && self.errors.is_empty()
            && self.unmatched.is_empty()
    }
}
