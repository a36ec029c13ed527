use crate::core::error::{ReconcileError, ReconcileResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem mutations the policy asks for.
///
/// None of these clear a conflicting destination on their own; callers pair
/// them with [`Executor::remove_if_exists`] where last-write-wins applies.
pub trait Executor {
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Move `src` into `dest_dir`, keeping its name. Returns the new path.
    fn move_into(&self, src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
        let name = src
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no name"))?;
        let dest = dest_dir.join(name);
        self.rename(src, &dest)?;
        Ok(dest)
    }

    /// Extract `archive` into `dest_dir`, returning the number of entries.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> ReconcileResult<usize>;

    fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Remove a file or a whole directory tree. `Ok(false)` when nothing was
    /// there.
    fn remove_if_exists(&self, path: &Path) -> io::Result<bool>;

    /// Whether both paths refer to the same underlying file.
    fn same_file(&self, a: &Path, b: &Path) -> bool;
}

/// [`Executor`] over the local filesystem.
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for LocalExecutor {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if src == dst {
            return Ok(());
        }
        fs::rename(src, dst)
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> ReconcileResult<usize> {
        let extraction_error = |message: String| ReconcileError::Extraction {
            archive: archive.to_path_buf(),
            message,
        };

        let file = fs::File::open(archive)
            .map_err(|e| extraction_error(format!("Failed to open archive: {e}")))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| extraction_error(format!("Invalid or corrupt ZIP: {e}")))?;

        fs::create_dir_all(dest_dir)?;
        let count = zip.len();
        zip.extract(dest_dir)
            .map_err(|e| extraction_error(e.to_string()))?;

        log::debug!("Extracted {} entries into {}", count, dest_dir.display());
        Ok(count)
    }

    fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::hard_link(src, dst)
    }

    fn remove_if_exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
            Ok(_) => fs::remove_file(path).map(|_| true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[cfg(unix)]
    fn same_file(&self, a: &Path, b: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;
        match (fs::metadata(a), fs::metadata(b)) {
            (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn same_file(&self, a: &Path, b: &Path) -> bool {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(ca), Ok(cb)) => ca == cb,
            _ => false,
        }
    }
}
