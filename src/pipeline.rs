//! Per-library passes: discovery, then `new`, `sync` or `unlinked`, then the
//! optional hardlink step.

use crate::config::Settings;
use crate::core::asset::{Asset, EntryKind, file_name, is_collection_name, media_link_name, tidy_archive_name};
use crate::core::error::{ReconcileError, ReconcileResult};
use crate::core::matcher::all_matches;
use crate::core::normalize::strip_extension;
use crate::core::policy::{Action, FolderMode, ReconciliationContext, ReconciliationPolicy, RunOptions};
use crate::core::report::ReconciliationReport;
use crate::core::score::{Metric, Score, token_set_ratio};
use crate::services::executor::Executor;
use crate::services::filesystem::{Entry, FileTree};
use crate::services::library::{Library, LibraryKind, LibraryProvider, TargetIndex};
use crate::services::prompt::Confirm;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Stage loose posters and extract new archives.
    New,
    /// Re-organize existing poster folders.
    Sync,
    /// Rename poster folders that match no target.
    Unlinked,
}

impl Pass {
    pub fn supports(self, kind: LibraryKind) -> bool {
        match self {
            Pass::New | Pass::Sync => true,
            Pass::Unlinked => kind == LibraryKind::Movie,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Library titles to process; empty means every library.
    pub libraries: Vec<String>,
    pub options: RunOptions,
    pub filter: Option<String>,
}

/// Assets found under a library's poster roots, classified once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub archives: Vec<PathBuf>,
    pub folders: Vec<PathBuf>,
    pub loose_files: Vec<PathBuf>,
}

/// Keep the folders whose name scores at least `cutoff` against `filter`,
/// best first. When any folder scores 100 only those are kept.
pub fn filter_folders(folders: &[PathBuf], filter: &str, cutoff: Score) -> Vec<PathBuf> {
    let mut scored: Vec<(&PathBuf, Score)> = folders
        .iter()
        .map(|f| (f, token_set_ratio(filter, &file_name(f))))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let exact = scored.iter().any(|(_, score)| *score == 100);
    scored
        .into_iter()
        .filter(|(_, score)| !exact || *score == 100)
        .map(|(f, _)| f.clone())
        .collect()
}

pub struct Pipeline<'a> {
    settings: &'a Settings,
    provider: &'a dyn LibraryProvider,
    tree: &'a dyn FileTree,
    executor: &'a dyn Executor,
    confirm: &'a dyn Confirm,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        provider: &'a dyn LibraryProvider,
        tree: &'a dyn FileTree,
        executor: &'a dyn Executor,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            settings,
            provider,
            tree,
            executor,
            confirm,
        }
    }

    /// Libraries named in `names` (all of them when empty), plus the names
    /// that matched no library.
    pub fn select_libraries(&self, names: &[String]) -> (Vec<Library>, Vec<String>) {
        let all = self.provider.libraries();
        if names.is_empty() {
            return (all, Vec::new());
        }
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match all.iter().find(|l| &l.title == name) {
                Some(library) => found.push(library.clone()),
                None => missing.push(name.clone()),
            }
        }
        (found, missing)
    }

    /// Run one pass over one library. A failure to list the library's
    /// targets or poster roots aborts this library only.
    pub fn run_library(&self, pass: Pass, library: &Library, request: &RunRequest) -> ReconcileResult<ReconciliationReport> {
        let mut report = ReconciliationReport::new();
        if !pass.supports(library.kind) {
            log::warn!("{:?} is not supported for library '{}'", pass, library.title);
            return Ok(report);
        }

        let targets = self.provider.list_targets(&library.title)?;
        let policy = ReconciliationPolicy::new(ReconciliationContext {
            kind: library.kind,
            targets: &targets,
            options: request.options,
            cutoffs: self.settings.cutoffs,
            collection_markers: self.settings.collection_markers.clone(),
            tree: self.tree,
            executor: self.executor,
            confirm: self.confirm,
        });

        let roots = self.poster_roots(library)?;
        log::info!("Poster roots for '{}': {:?}", library.title, roots);
        let discovery = self.discover(&roots, request.filter.as_deref(), &mut report)?;

        match pass {
            Pass::New => self.run_new(&policy, &discovery, &mut report),
            Pass::Sync => self.run_sync(&policy, &discovery, request.options, &mut report),
            Pass::Unlinked => self.run_unlinked(&policy, &discovery, &targets, &mut report),
        }

        if request.options.copy && pass != Pass::Unlinked {
            // folders may have been created by this pass
            let folders = self.discover(&roots, request.filter.as_deref(), &mut report)?.folders;
            for folder in &folders {
                self.copy_posters(folder, &targets, request.options, &mut report);
            }
        }
        Ok(report)
    }

    /// Children of the poster directory whose name resembles the library
    /// title.
    pub fn poster_roots(&self, library: &Library) -> ReconcileResult<Vec<PathBuf>> {
        let poster_dir = &self.settings.poster_dir;
        let names: Vec<String> = self
            .tree
            .list_entries(poster_dir)?
            .into_iter()
            .filter(|e| e.kind == EntryKind::Dir)
            .map(|e| e.name())
            .collect();

        let threshold = self.settings.cutoffs.poster_root.saturating_add(1);
        Ok(all_matches(&library.title, &names, Metric::Partial, threshold)
            .into_iter()
            .map(|(name, _)| poster_dir.join(name))
            .collect())
    }

    /// Classify every child of the poster roots. Archive names are tidied on
    /// the way.
    pub fn discover(&self, roots: &[PathBuf], filter: Option<&str>, report: &mut ReconciliationReport) -> ReconcileResult<Discovery> {
        let mut discovery = Discovery::default();
        for root in roots {
            for entry in self.tree.list_entries(root)? {
                match Asset::from_entry(entry.path, entry.kind) {
                    Asset::Archive(path) => discovery.archives.push(self.tidy_archive(&path, report)),
                    Asset::PosterFolder(path) => discovery.folders.push(path),
                    Asset::LooseFile(path) => discovery.loose_files.push(path),
                }
            }
        }

        if let Some(filter) = filter {
            discovery.folders = filter_folders(&discovery.folders, filter, self.settings.cutoffs.filter);
            log::info!("Filtered poster folders: {:?}", discovery.folders);
        }
        Ok(discovery)
    }

    fn tidy_archive(&self, path: &Path, report: &mut ReconciliationReport) -> PathBuf {
        let name = file_name(path);
        let tidy = tidy_archive_name(&name);
        if tidy == name {
            return path.to_path_buf();
        }
        let renamed = path.with_file_name(&tidy);
        if self.tree.exists(&renamed) {
            report.failed(path, ReconcileError::DestinationExists { path: renamed });
            return path.to_path_buf();
        }
        match self.executor.rename(path, &renamed) {
            Ok(()) => {
                log::debug!("Renamed archive {name} to {tidy}");
                renamed
            }
            Err(e) => {
                report.failed(path, e);
                path.to_path_buf()
            }
        }
    }

    fn run_new(&self, policy: &ReconciliationPolicy, discovery: &Discovery, report: &mut ReconciliationReport) {
        if policy.context().kind == LibraryKind::Movie {
            for file in &discovery.loose_files {
                self.stage_loose_file(policy, file, report);
            }
        }
        let store = self.settings.archive_dir();
        for archive in &discovery.archives {
            policy.process_archive(archive, &store, report);
        }
    }

    /// Move a loose poster into the staging folder next to it and organize
    /// that folder.
    fn stage_loose_file(&self, policy: &ReconciliationPolicy, file: &Path, report: &mut ReconciliationReport) {
        let custom = &self.settings.custom_dir_name;
        let name = file_name(file);
        let prompt = format!("Move poster file {name} to {custom} posters folder?");
        if !self.confirm.ask(&prompt, false) {
            report.skipped(file);
            return;
        }
        let Some(parent) = file.parent() else {
            report.skipped(file);
            return;
        };

        let staged = parent.components().any(|c| c.as_os_str() == custom.as_str());
        let staging = if staged {
            parent.to_path_buf()
        } else {
            parent.join(custom)
        };

        let result = self.executor.create_dir(&staging).and_then(|_| {
            if staging != parent {
                self.executor.remove_if_exists(&staging.join(&name))?;
            }
            self.executor.move_into(file, &staging)
        });
        match result {
            Ok(moved) => {
                report.applied(Action::AutoApply, file, &moved);
                policy.organize_movie_folder(&staging, report);
            }
            Err(e) => report.failed(file, e),
        }
    }

    fn run_sync(&self, policy: &ReconciliationPolicy, discovery: &Discovery, options: RunOptions, report: &mut ReconciliationReport) {
        for folder in &discovery.folders {
            let files = self.files_in(folder);
            match policy.context().kind {
                LibraryKind::Movie => {
                    if files.is_empty() {
                        continue;
                    }
                    let prompt = format!("Process folder \"{}\"?", folder.display());
                    if options.all || self.confirm.ask(&prompt, false) {
                        policy.reconcile_folder(folder, FolderMode::Direct, report);
                    } else {
                        report.skipped(folder);
                    }
                }
                LibraryKind::Show => {
                    let organized = files.iter().any(|e| strip_extension(&e.name()) == "poster");
                    if !organized {
                        policy.reconcile_folder(folder, FolderMode::Direct, report);
                    }
                }
            }
        }
    }

    /// Poster folders (or their sub-folders) holding posters that are not yet
    /// linked to a target, in path order.
    pub fn unlinked_candidates(&self, folders: &[PathBuf], targets: &TargetIndex) -> Vec<PathBuf> {
        let custom = self.settings.custom_dir_name.as_str();
        let mut found = BTreeSet::new();
        for folder in folders {
            let entries = match self.tree.list_entries(folder) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot list {}: {e}", folder.display());
                    continue;
                }
            };
            for entry in entries {
                if entry.kind != EntryKind::Dir {
                    found.insert(folder.clone());
                    continue;
                }
                let name = entry.name();
                let has_posters = !self.files_in(&entry.path).is_empty();
                let linked = is_collection_name(&name, &self.settings.collection_markers)
                    || targets.names().iter().any(|t| name.contains(t.as_str()));
                let staged = entry.path.components().any(|c| c.as_os_str() == custom);
                if has_posters && !linked && !staged {
                    found.insert(entry.path);
                }
            }
        }
        found.into_iter().collect()
    }

    fn run_unlinked(
        &self,
        policy: &ReconciliationPolicy,
        discovery: &Discovery,
        targets: &TargetIndex,
        report: &mut ReconciliationReport,
    ) {
        let candidates = self.unlinked_candidates(&discovery.folders, targets);
        if candidates.is_empty() {
            log::info!("No unlinked folders found");
            return;
        }
        let prompt = format!("{} unlinked folders found. Start processing them?", candidates.len());
        if !self.confirm.ask(&prompt, false) {
            for folder in &candidates {
                report.skipped(folder);
            }
            return;
        }
        for folder in &candidates {
            if self.tree.is_dir(folder) {
                policy.reconcile_unlinked_folder(folder, report);
            }
        }
    }

    /// Hardlink every poster in `folder` into the media folders of the target
    /// it is named after.
    pub fn copy_posters(&self, folder: &Path, targets: &TargetIndex, options: RunOptions, report: &mut ReconciliationReport) {
        let media_name = file_name(folder);
        let Some(target) = targets.get(&media_name) else {
            return;
        };
        let files = self.files_in(folder);
        if files.is_empty() {
            return;
        }

        let roots: Vec<String> = target.roots.iter().map(|r| r.display().to_string()).collect();
        let prompt = format!("Hardlink posters from [{}] to [{}]?", folder.display(), roots.join(", "));
        if !options.all && !self.confirm.ask(&prompt, false) {
            report.skipped(folder);
            return;
        }

        let mut replace = false;
        for file in &files {
            let link_name = media_link_name(&file.name());
            let link_stem = strip_extension(&link_name);
            for root in &target.roots {
                let media_dir = root.join(&media_name);
                let dest = media_dir.join(&link_name);
                let existing: Vec<Entry> = self
                    .files_in(&media_dir)
                    .into_iter()
                    .filter(|e| strip_extension(&e.name()) == link_stem)
                    .collect();

                if !existing.is_empty() {
                    if self.tree.exists(&dest) && self.executor.same_file(&file.path, &dest) {
                        continue;
                    }
                    let prompt = if options.all {
                        format!("Replace all poster files in {}?", media_dir.display())
                    } else {
                        "Replace existing files?".to_string()
                    };
                    if !replace && !self.confirm.ask(&prompt, false) {
                        log::warn!("Skipping folder {}", media_dir.display());
                        report.skipped(&dest);
                        continue;
                    }
                    replace = true;
                    for old in &existing {
                        if let Err(e) = self.executor.remove_if_exists(&old.path) {
                            report.failed(&old.path, e);
                        }
                    }
                }

                match self.executor.hardlink(&file.path, &dest) {
                    Ok(()) => report.applied(Action::AutoApply, &file.path, &dest),
                    Err(e) => report.failed(&dest, e),
                }
            }
        }
    }

    fn files_in(&self, dir: &Path) -> Vec<Entry> {
        self.tree
            .list_entries(dir)
            .map(|entries| entries.into_iter().filter(|e| e.kind != EntryKind::Dir).collect())
            .unwrap_or_default()
    }
}
