//! Duplicate folder detection by name similarity.
//!
//! Folders are bucketed by depth below the scan root and each folder is
//! matched against the rest of its own level only.

use crate::core::asset::file_name;
use crate::core::error::{ReconcileError, ReconcileResult};
use crate::core::matcher::best_match;
use crate::core::score::{Metric, Score};
use crate::services::filesystem::FileTree;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DUPLICATE_CUTOFF: Score = 74;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub path: PathBuf,
    pub duplicate_of: PathBuf,
    pub score: Score,
}

/// Pairs found at one depth level. An empty `pairs` is a reported
/// "no duplicates at this level", not an omission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelReport {
    pub level: usize,
    pub pairs: Vec<DuplicatePair>,
}

impl LevelReport {
    pub fn has_duplicates(&self) -> bool {
        !self.pairs.is_empty()
    }
}

/// Folders at one level that are linked through reported pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub level: usize,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub root: PathBuf,
    pub directory_count: usize,
    pub levels: Vec<LevelReport>,
}

impl DuplicateReport {
    /// Merge each level's pairs into groups of two or more folders.
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        let mut groups = Vec::new();
        for level in &self.levels {
            let mut level_groups: Vec<Vec<PathBuf>> = Vec::new();
            for pair in &level.pairs {
                let hits: Vec<usize> = level_groups
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.contains(&pair.path) || g.contains(&pair.duplicate_of))
                    .map(|(i, _)| i)
                    .collect();

                let mut merged = vec![pair.path.clone(), pair.duplicate_of.clone()];
                for &i in hits.iter().rev() {
                    merged.extend(level_groups.remove(i));
                }
                merged.sort();
                merged.dedup();
                level_groups.push(merged);
            }
            groups.extend(level_groups.into_iter().map(|paths| DuplicateGroup {
                level: level.level,
                paths,
            }));
        }
        groups
    }
}

pub struct DuplicateClusterer {
    cutoff: Score,
    ignore_dirs: Vec<String>,
}

impl DuplicateClusterer {
    pub fn new(cutoff: Score, ignore_dirs: Vec<String>) -> Self {
        Self {
            cutoff,
            ignore_dirs,
        }
    }

    /// Scan every directory below `root` and report likely duplicates per
    /// level. Level 0 holds the root's direct subdirectories.
    ///
    /// Each directory reports at most its single best match among the other
    /// directories of its level, so `A -> B` does not imply `B -> A`.
    pub fn find_duplicates(&self, tree: &dyn FileTree, root: &Path) -> ReconcileResult<DuplicateReport> {
        if !tree.is_dir(root) {
            return Err(ReconcileError::InvalidRoot {
                path: root.to_path_buf(),
            });
        }

        let dirs: Vec<(PathBuf, usize)> = tree
            .walk(root, &self.ignore_dirs)?
            .into_iter()
            .filter(|(_, depth)| *depth > 0)
            .map(|(path, depth)| (path, depth - 1))
            .collect();

        let mut levels = Vec::new();
        if let Some(max_level) = dirs.iter().map(|(_, level)| *level).max() {
            for level in 0..=max_level {
                let current: Vec<&PathBuf> = dirs
                    .iter()
                    .filter(|(_, l)| *l == level)
                    .map(|(p, _)| p)
                    .collect();
                let pairs = self.match_level(&current);
                log::debug!("Level {}: {} folders, {} pairs", level, current.len(), pairs.len());
                levels.push(LevelReport { level, pairs });
            }
        }

        Ok(DuplicateReport {
            root: root.to_path_buf(),
            directory_count: dirs.len(),
            levels,
        })
    }

    fn match_level(&self, current: &[&PathBuf]) -> Vec<DuplicatePair> {
        let mut working: Vec<&PathBuf> = current.to_vec();
        let mut pairs = Vec::new();

        for &dir in current {
            if let Some(pos) = working.iter().position(|p| *p == dir) {
                working.remove(pos);
            }
            if !working.is_empty() {
                let names: Vec<String> = working.iter().map(|p| file_name(p)).collect();
                let result = best_match(&file_name(dir), &names, Metric::TokenSet, self.cutoff, false);
                if let Some(name) = result.target {
                    if let Some(other) = working.iter().find(|p| file_name(p) == name) {
                        pairs.push(DuplicatePair {
                            path: dir.clone(),
                            duplicate_of: (*other).clone(),
                            score: result.score,
                        });
                    }
                }
            }
            // back at the end of the pool, so later ties prefer other folders
            working.push(dir);
        }
        pairs
    }
}

impl Default for DuplicateClusterer {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_CUTOFF, vec!["__MACOSX".to_string()])
    }
}
