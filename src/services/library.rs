use crate::core::asset::EntryKind;
use crate::core::error::{ReconcileError, ReconcileResult};
use crate::services::filesystem::FileTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Movie,
    Show,
}

/// A media library: a title plus the root folders holding its media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub title: String,
    pub kind: LibraryKind,
    #[serde(default)]
    pub locations: Vec<PathBuf>,
}

/// A canonical entry name and every library root it lives under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub roots: Vec<PathBuf>,
}

/// Targets of one library snapshot: unique names in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    targets: Vec<Target>,
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl TargetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` under `root`. Repeated names accumulate roots.
    pub fn insert(&mut self, name: &str, root: PathBuf) {
        match self.by_name.get(name) {
            Some(&idx) => {
                let roots = &mut self.targets[idx].roots;
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
            None => {
                self.by_name.insert(name.to_string(), self.targets.len());
                self.names.push(name.to_string());
                self.targets.push(Target {
                    name: name.to_string(),
                    roots: vec![root],
                });
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.by_name.get(name).map(|&idx| &self.targets[idx])
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for TargetIndex {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        let mut index = TargetIndex::new();
        for (name, root) in iter {
            index.insert(&name, root);
        }
        index
    }
}

pub trait LibraryProvider {
    fn libraries(&self) -> Vec<Library>;

    fn list_targets(&self, library_title: &str) -> ReconcileResult<TargetIndex>;
}

/// Libraries declared in the settings file; a library's targets are the
/// directory names under each of its locations.
pub struct DirectoryLibrary<'a> {
    tree: &'a dyn FileTree,
    libraries: Vec<Library>,
}

impl<'a> DirectoryLibrary<'a> {
    pub fn new(tree: &'a dyn FileTree, libraries: Vec<Library>) -> Self {
        Self { tree, libraries }
    }
}

impl LibraryProvider for DirectoryLibrary<'_> {
    fn libraries(&self) -> Vec<Library> {
        self.libraries.clone()
    }

    fn list_targets(&self, library_title: &str) -> ReconcileResult<TargetIndex> {
        let library = self
            .libraries
            .iter()
            .find(|l| l.title == library_title)
            .ok_or_else(|| ReconcileError::Library {
                library: library_title.to_string(),
                message: "no such library".to_string(),
            })?;

        let mut index = TargetIndex::new();
        for location in &library.locations {
            let entries = self
                .tree
                .list_entries(location)
                .map_err(|e| ReconcileError::Library {
                    library: library_title.to_string(),
                    message: format!("{}: {e}", location.display()),
                })?;
            for entry in entries.iter().filter(|e| e.kind == EntryKind::Dir) {
                index.insert(&entry.name(), location.clone());
            }
        }
        log::debug!("Library '{}' has {} targets", library_title, index.len());
        Ok(index)
    }
}
