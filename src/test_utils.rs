//! In-memory stand-ins for the filesystem, prompts and library service.

use crate::core::asset::EntryKind;
use crate::core::error::{ReconcileError, ReconcileResult};
use crate::services::executor::Executor;
use crate::services::filesystem::{Entry, FileTree};
use crate::services::library::{Library, LibraryProvider, TargetIndex};
use crate::services::prompt::{Answer, Confirm};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { id: u64 },
    Archive { id: u64, entries: Vec<String>, corrupt: bool },
}

/// A whole directory tree held in a map. Implements both [`FileTree`] and
/// [`Executor`], so policy code sees its own mutations.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    next_id: Cell<u64>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, path.display().to_string())
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn add_ancestors(&self, path: &Path) {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.nodes
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_insert(Node::Dir);
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.add_ancestors(path);
        let id = self.fresh_id();
        self.nodes
            .borrow_mut()
            .insert(path.to_path_buf(), Node::File { id });
    }

    pub fn add_archive(&self, path: impl AsRef<Path>, entries: &[&str]) {
        self.insert_archive(path.as_ref(), entries, false);
    }

    /// An archive that looks valid but fails half way through extraction.
    pub fn add_corrupt_archive(&self, path: impl AsRef<Path>) {
        self.insert_archive(path.as_ref(), &[], true);
    }

    fn insert_archive(&self, path: &Path, entries: &[&str], corrupt: bool) {
        self.add_ancestors(path);
        let id = self.fresh_id();
        self.nodes.borrow_mut().insert(
            path.to_path_buf(),
            Node::Archive {
                id,
                entries: entries.iter().map(|e| e.to_string()).collect(),
                corrupt,
            },
        );
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        matches!(
            self.nodes.borrow().get(path.as_ref()),
            Some(Node::File { .. } | Node::Archive { .. })
        )
    }

    /// Names of the direct children of `dir`, sorted.
    pub fn children(&self, dir: impl AsRef<Path>) -> Vec<String> {
        self.list_entries(dir.as_ref())
            .map(|entries| entries.iter().map(Entry::name).collect())
            .unwrap_or_default()
    }

    /// Every file under `root`, relative to it, sorted.
    pub fn files_under(&self, root: impl AsRef<Path>) -> Vec<String> {
        let root = root.as_ref();
        self.nodes
            .borrow()
            .iter()
            .filter(|(p, n)| p.starts_with(root) && !matches!(n, Node::Dir))
            .filter_map(|(p, _)| p.strip_prefix(root).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    fn subtree(&self, root: &Path) -> Vec<PathBuf> {
        self.nodes
            .borrow()
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect()
    }

    fn walk_from(&self, dir: &Path, depth: usize, ignore: &[String], out: &mut Vec<(PathBuf, usize)>) {
        out.push((dir.to_path_buf(), depth));
        for entry in self.list_entries(dir).unwrap_or_default() {
            if entry.kind == EntryKind::Dir && !ignore.contains(&entry.name()) {
                self.walk_from(&entry.path, depth + 1, ignore, out);
            }
        }
    }
}

impl FileTree for MemoryFs {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<Entry>> {
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        let nodes = self.nodes.borrow();
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, n)| Entry {
                path: p.clone(),
                kind: match n {
                    Node::Dir => EntryKind::Dir,
                    Node::File { .. } => EntryKind::File,
                    Node::Archive { .. } => EntryKind::Archive,
                },
            })
            .collect())
    }

    fn classify(&self, path: &Path) -> Option<EntryKind> {
        self.nodes.borrow().get(path).map(|n| match n {
            Node::Dir => EntryKind::Dir,
            Node::File { .. } => EntryKind::File,
            Node::Archive { .. } => EntryKind::Archive,
        })
    }

    fn walk(&self, root: &Path, ignore: &[String]) -> io::Result<Vec<(PathBuf, usize)>> {
        if !self.is_dir(root) {
            return Err(not_found(root));
        }
        let mut out = Vec::new();
        self.walk_from(root, 0, ignore, &mut out);
        Ok(out)
    }
}

impl Executor for MemoryFs {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        match self.classify(path) {
            Some(EntryKind::Dir) => Ok(()),
            Some(_) => Err(already_exists(path)),
            None => {
                self.add_dir(path);
                Ok(())
            }
        }
    }

    fn rename(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if src == dst {
            return Ok(());
        }
        if !self.exists(src) {
            return Err(not_found(src));
        }
        if !dst.parent().is_some_and(|p| self.is_dir(p)) {
            return Err(not_found(dst));
        }
        if self.is_dir(dst) {
            return Err(already_exists(dst));
        }
        let moved = self.subtree(src);
        let mut nodes = self.nodes.borrow_mut();
        nodes.remove(dst);
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let rel = old.strip_prefix(src).unwrap_or(Path::new(""));
                let new = if rel.as_os_str().is_empty() {
                    dst.to_path_buf()
                } else {
                    dst.join(rel)
                };
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> ReconcileResult<usize> {
        let node = self.nodes.borrow().get(archive).cloned();
        match node {
            Some(Node::Archive { entries, corrupt: false, .. }) => {
                self.add_dir(dest_dir);
                for entry in &entries {
                    self.add_file(dest_dir.join(entry));
                }
                Ok(entries.len())
            }
            Some(Node::Archive { corrupt: true, .. }) => Err(ReconcileError::Extraction {
                archive: archive.to_path_buf(),
                message: "unexpected end of archive".to_string(),
            }),
            _ => Err(ReconcileError::Extraction {
                archive: archive.to_path_buf(),
                message: "not an archive".to_string(),
            }),
        }
    }

    fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let node = self.nodes.borrow().get(src).cloned();
        match node {
            Some(node @ Node::File { .. }) => {
                if self.exists(dst) {
                    return Err(already_exists(dst));
                }
                if !dst.parent().is_some_and(|p| self.is_dir(p)) {
                    return Err(not_found(dst));
                }
                self.nodes.borrow_mut().insert(dst.to_path_buf(), node);
                Ok(())
            }
            _ => Err(not_found(src)),
        }
    }

    fn remove_if_exists(&self, path: &Path) -> io::Result<bool> {
        let doomed = self.subtree(path);
        let mut nodes = self.nodes.borrow_mut();
        for p in &doomed {
            nodes.remove(p);
        }
        Ok(!doomed.is_empty())
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        let nodes = self.nodes.borrow();
        match (nodes.get(a), nodes.get(b)) {
            (Some(Node::File { id: x }), Some(Node::File { id: y })) => x == y,
            _ => false,
        }
    }
}

/// Scripted prompt answers, consumed in order. Once the script runs out every
/// prompt is declined. Prompts are recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    script: RefCell<VecDeque<Answer>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(script: &[Answer]) -> Self {
        Self {
            script: RefCell::new(script.iter().copied().collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }

    fn next(&self, prompt: &str) -> Answer {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.script.borrow_mut().pop_front().unwrap_or(Answer::No)
    }
}

impl Confirm for ScriptedConfirm {
    fn ask(&self, prompt: &str, _default_yes: bool) -> bool {
        self.next(prompt) != Answer::No
    }

    fn choose(&self, prompt: &str, _options: &[&str], _default: usize) -> usize {
        match self.next(prompt) {
            Answer::Yes => 0,
            Answer::No => 1,
            Answer::Force => 2,
        }
    }
}

/// Fixed libraries and target lists. A library without an entry fails to
/// list, like an unreachable server.
#[derive(Debug, Default)]
pub struct StaticLibrary {
    libraries: Vec<Library>,
    targets: BTreeMap<String, Vec<(String, PathBuf)>>,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, library: Library, targets: &[(&str, &str)]) -> Self {
        self.targets.insert(
            library.title.clone(),
            targets
                .iter()
                .map(|(name, root)| (name.to_string(), PathBuf::from(root)))
                .collect(),
        );
        self.libraries.push(library);
        self
    }

    pub fn with_unreachable(mut self, library: Library) -> Self {
        self.libraries.push(library);
        self
    }
}

impl LibraryProvider for StaticLibrary {
    fn libraries(&self) -> Vec<Library> {
        self.libraries.clone()
    }

    fn list_targets(&self, library_title: &str) -> ReconcileResult<TargetIndex> {
        self.targets
            .get(library_title)
            .map(|t| t.iter().cloned().collect())
            .ok_or_else(|| ReconcileError::Library {
                library: library_title.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

/// Targets from bare names, all under one root.
pub fn targets(names: &[&str]) -> TargetIndex {
    names
        .iter()
        .map(|n| (n.to_string(), PathBuf::from("/media")))
        .collect()
}
