use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Duplicate scan root is missing or not a directory. Aborts the scan.
    #[error("Invalid root directory: {}", path.display())]
    InvalidRoot { path: PathBuf },

    /// An archive could not be extracted. Reported per archive.
    #[error("Failed to extract {}: {message}", archive.display())]
    Extraction { archive: PathBuf, message: String },

    /// A rename target already exists and overwriting it is not allowed.
    #[error("Target directory {} already exists", path.display())]
    DestinationExists { path: PathBuf },

    /// The library collaborator could not list its targets.
    #[error("Failed to list library '{library}': {message}")]
    Library { library: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
