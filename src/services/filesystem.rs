use crate::core::asset::{EntryKind, file_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

/// Read-only view of the tree being reconciled.
pub trait FileTree {
    /// Direct children of `path`, sorted by name.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<Entry>>;

    /// `None` when nothing exists at `path`.
    fn classify(&self, path: &Path) -> Option<EntryKind>;

    /// Every directory under `root` (root included at depth 0) with its
    /// depth, in sorted depth-first order. Directories whose basename is in
    /// `ignore` are skipped together with their contents, and entries that
    /// cannot be read are logged and left out.
    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<(PathBuf, usize)>>;

    fn exists(&self, path: &Path) -> bool {
        self.classify(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.classify(path) == Some(EntryKind::Dir)
    }
}

/// [`FileTree`] over the local filesystem. Zip archives are told apart from
/// plain files by opening them.
pub struct LocalFileTree;

impl LocalFileTree {
    pub fn new() -> Self {
        Self
    }

    fn is_zip(path: &Path) -> bool {
        fs::File::open(path)
            .ok()
            .and_then(|f| zip::ZipArchive::new(f).ok())
            .is_some()
    }
}

impl Default for LocalFileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree for LocalFileTree {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let path = entry?.path();
            if let Some(kind) = self.classify(&path) {
                entries.push(Entry { path, kind });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn classify(&self, path: &Path) -> Option<EntryKind> {
        let meta = fs::metadata(path).ok()?;
        if meta.is_dir() {
            Some(EntryKind::Dir)
        } else if meta.is_file() {
            if Self::is_zip(path) {
                Some(EntryKind::Archive)
            } else {
                Some(EntryKind::File)
            }
        } else {
            None
        }
    }

    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<(PathBuf, usize)>> {
        let mut dirs = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !ignore
                        .iter()
                        .any(|i| e.file_name().to_string_lossy().as_ref() == i.as_str())
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                dirs.push((entry.path().to_path_buf(), entry.depth()));
            }
        }
        Ok(dirs)
    }
}
