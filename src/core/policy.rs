//! Reconciliation decisions and the filesystem actions that carry them out.
//!
//! Decisions are pure functions of an asset name, the target pool and the run
//! options. Applying them goes through the [`Executor`], and every human
//! decision point goes through [`Confirm`], both reached via the explicit
//! [`ReconciliationContext`].

use crate::core::asset::{MovieFileRole, ShowFileRole, file_name, poster_file_name};
use crate::core::error::ReconcileError;
use crate::core::matcher::{MatchResult, best_match};
use crate::core::normalize::display_stem;
use crate::core::report::ReconciliationReport;
use crate::core::score::{Metric, Score};
use crate::services::executor::Executor;
use crate::services::filesystem::{Entry, FileTree};
use crate::services::library::{LibraryKind, TargetIndex};
use crate::services::prompt::{Answer, Confirm};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Skip,
    AutoApply,
    ProposeConfirm,
    TreatAsCollection,
    ForceRename,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationDecision {
    pub action: Action,
    pub target_name: Option<String>,
    pub score: Score,
}

impl ReconciliationDecision {
    pub fn skip() -> Self {
        Self {
            action: Action::Skip,
            target_name: None,
            score: 0,
        }
    }

    fn named(action: Action, target_name: String, score: Score) -> Self {
        Self {
            action,
            target_name: Some(target_name),
            score,
        }
    }
}

/// Score thresholds used across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cutoffs {
    /// High-confidence match for loose files, archives and unlinked folders.
    pub direct: Score,
    /// Per-item matching inside collection folders.
    pub suggestion: Score,
    pub duplicate: Score,
    /// Poster root selection by library title.
    pub poster_root: Score,
    /// `--filter` narrowing of poster folders.
    pub filter: Score,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self {
            direct: 70,
            suggestion: 60,
            duplicate: crate::core::duplicate::DEFAULT_DUPLICATE_CUTOFF,
            poster_root: 70,
            filter: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Apply each file's own name without consulting the matcher.
    pub force: bool,
    /// Skip per-folder confirmations.
    pub all: bool,
    /// Hardlink organized posters into the media folders.
    pub copy: bool,
}

/// How a poster folder is organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMode {
    /// The folder already belongs to one target.
    Direct,
    /// The folder holds posters for many targets.
    Collection,
}

/// Where an archive should be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchivePlan {
    Direct { target: String, score: Score },
    Collection { folder_name: String, best: MatchResult },
    NoMatch { best: MatchResult },
}

/// Everything a reconciliation pass over one library needs.
pub struct ReconciliationContext<'a> {
    pub kind: LibraryKind,
    pub targets: &'a TargetIndex,
    pub options: RunOptions,
    pub cutoffs: Cutoffs,
    pub collection_markers: Vec<String>,
    pub tree: &'a dyn FileTree,
    pub executor: &'a dyn Executor,
    pub confirm: &'a dyn Confirm,
}

/// Turn a confirmed (or declined) proposal into a final decision. Decisions
/// that were not proposals pass through unchanged.
pub fn resolve(decision: ReconciliationDecision, answer: Answer, own_name: &str) -> ReconciliationDecision {
    if decision.action != Action::ProposeConfirm {
        return decision;
    }
    match (answer, decision.target_name) {
        (Answer::Yes, Some(target)) => ReconciliationDecision::named(Action::AutoApply, target, decision.score),
        (Answer::Force, _) => ReconciliationDecision::named(Action::ForceRename, display_stem(own_name), decision.score),
        _ => ReconciliationDecision::skip(),
    }
}

pub struct ReconciliationPolicy<'a> {
    ctx: ReconciliationContext<'a>,
}

impl<'a> ReconciliationPolicy<'a> {
    pub fn new(ctx: ReconciliationContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ReconciliationContext<'a> {
        &self.ctx
    }

    /// Decide what to do with a single poster file.
    pub fn decide_loose_file(&self, name: &str) -> ReconciliationDecision {
        match MovieFileRole::classify(name, &self.ctx.collection_markers) {
            MovieFileRole::Collection => {
                ReconciliationDecision::named(Action::TreatAsCollection, display_stem(name), 0)
            }
            MovieFileRole::Single if self.ctx.options.force => {
                ReconciliationDecision::named(Action::ForceRename, display_stem(name), 0)
            }
            MovieFileRole::Single => {
                let result = best_match(
                    name,
                    self.ctx.targets.names(),
                    Metric::TokenSort,
                    self.ctx.cutoffs.direct,
                    false,
                );
                log::debug!("{} -> {:?} [{}]", name, result.target, result.score);
                match result.target {
                    Some(target) => ReconciliationDecision::named(Action::ProposeConfirm, target, result.score),
                    None => ReconciliationDecision::skip(),
                }
            }
        }
    }

    /// Decide a file inside a collection folder. Misses come back as `Skip`
    /// and are offered a force rename by the caller.
    pub fn decide_collection_item(&self, name: &str) -> ReconciliationDecision {
        let result = best_match(
            name,
            self.ctx.targets.names(),
            Metric::TokenSort,
            self.ctx.cutoffs.suggestion,
            false,
        );
        log::debug!("{} -> {:?} [{}]", name, result.target, result.score);
        match result.target {
            Some(target) => ReconciliationDecision::named(Action::ProposeConfirm, target, result.score),
            None => ReconciliationDecision::skip(),
        }
    }

    pub fn decide_archive(&self, name: &str) -> ArchivePlan {
        let best = best_match(name, self.ctx.targets.names(), Metric::PartialTokenSort, 1, true);
        log::debug!("{} -> {:?} [{}]", name, best.target, best.score);
        match (self.ctx.kind, best.target.clone()) {
            (LibraryKind::Show, Some(target)) => ArchivePlan::Direct {
                target,
                score: best.score,
            },
            (LibraryKind::Show, None) => ArchivePlan::NoMatch { best },
            (LibraryKind::Movie, Some(target)) if best.score > self.ctx.cutoffs.direct => ArchivePlan::Direct {
                target,
                score: best.score,
            },
            (LibraryKind::Movie, _) => ArchivePlan::Collection {
                folder_name: display_stem(name),
                best,
            },
        }
    }

    /// Organize an existing poster folder according to the library type.
    pub fn reconcile_folder(&self, folder: &Path, mode: FolderMode, report: &mut ReconciliationReport) {
        match (self.ctx.kind, mode) {
            (LibraryKind::Show, _) => self.organize_show_folder(folder, report),
            (LibraryKind::Movie, FolderMode::Direct) => self.organize_movie_folder(folder, report),
            (LibraryKind::Movie, FolderMode::Collection) => self.organize_collection_folder(folder, report),
        }
    }

    /// Give every poster file in `folder` its own subfolder named after its
    /// matched target, holding it as `poster.<ext>`.
    pub fn organize_movie_folder(&self, folder: &Path, report: &mut ReconciliationReport) {
        let Some(files) = self.files_in(folder, report) else {
            return;
        };
        for entry in files {
            if !self.ctx.tree.exists(&entry.path) {
                continue;
            }
            let name = entry.name();
            let mut decision = self.decide_loose_file(&name);
            if let (Action::ProposeConfirm, Some(target)) = (decision.action, decision.target_name.as_deref()) {
                let prompt = format!("Matched poster file {name} to movie {target}, proceed?");
                let answer = self.ctx.confirm.answer(&prompt);
                decision = resolve(decision, answer, &name);
            }
            self.apply_file_decision(folder, &entry.path, &name, &decision, report);
        }
    }

    /// Match each file of a collection folder on its own. Files the user
    /// declines stay where they are and are listed in the report.
    pub fn organize_collection_folder(&self, folder: &Path, report: &mut ReconciliationReport) {
        let Some(files) = self.files_in(folder, report) else {
            return;
        };
        log::info!("Processing collection folder: {}", file_name(folder));

        let mut unmatched = Vec::new();
        for entry in files {
            if !self.ctx.tree.exists(&entry.path) {
                continue;
            }
            let name = entry.name();
            let decision = self.decide_collection_item(&name);
            let decision = match (decision.action, decision.target_name.as_deref()) {
                (Action::ProposeConfirm, Some(target)) => {
                    let prompt = format!(
                        "Matched poster file {name} to movie {target} [score: {}], proceed?",
                        decision.score
                    );
                    let answer = self.ctx.confirm.answer(&prompt);
                    resolve(decision, answer, &name)
                }
                _ => {
                    let prompt = format!("No match found for poster file {name}. Force rename?");
                    if self.ctx.confirm.ask(&prompt, false) {
                        ReconciliationDecision::named(Action::ForceRename, display_stem(&name), 0)
                    } else {
                        ReconciliationDecision::skip()
                    }
                }
            };

            if decision.action == Action::Skip {
                unmatched.push(name);
            } else {
                self.apply_file_decision(folder, &entry.path, &name, &decision, report);
            }
        }
        report.unmatched(folder, unmatched);
    }

    /// Rename show posters by content pattern. Running it twice changes
    /// nothing the second time.
    pub fn organize_show_folder(&self, folder: &Path, report: &mut ReconciliationReport) {
        let Some(files) = self.files_in(folder, report) else {
            return;
        };
        for entry in files {
            if !self.ctx.tree.exists(&entry.path) {
                continue;
            }
            let name = entry.name();
            let Some(canonical) = ShowFileRole::classify(&name).canonical_name(&name) else {
                continue;
            };
            if canonical == name {
                continue;
            }
            let dest = folder.join(&canonical);
            let result = self
                .ctx
                .executor
                .remove_if_exists(&dest)
                .and_then(|_| self.ctx.executor.rename(&entry.path, &dest));
            match result {
                Ok(()) => report.applied(Action::AutoApply, &entry.path, &dest),
                Err(e) => report.failed(&entry.path, e),
            }
        }
    }

    /// Extract an archive next to itself, organize the result and offer to
    /// move the archive into `archive_store`.
    pub fn process_archive(&self, archive: &Path, archive_store: &Path, report: &mut ReconciliationReport) {
        let name = file_name(archive);
        let Some(parent) = archive.parent() else {
            report.skipped(archive);
            return;
        };

        let plan = self.decide_archive(&name);
        let kind_label = match self.ctx.kind {
            LibraryKind::Movie => "movie",
            LibraryKind::Show => "show",
        };
        let (dest, mode, action, prompt) = match &plan {
            ArchivePlan::Direct { target, score } => (
                parent.join(target),
                FolderMode::Direct,
                Action::AutoApply,
                format!("Matched zip file {name} to {kind_label} {target} [score: {score}], proceed?"),
            ),
            ArchivePlan::Collection { folder_name, best } => (
                parent.join(folder_name),
                FolderMode::Collection,
                Action::TreatAsCollection,
                match &best.target {
                    Some(target) => format!(
                        "Low match score ({}) for {name} to {target}. Unzip as collection and organize individually?",
                        best.score
                    ),
                    None => format!("No direct match found for {name}. Unzip as collection and organize individually?"),
                },
            ),
            ArchivePlan::NoMatch { .. } => {
                log::warn!("No matching media found for {name}");
                report.skipped(archive);
                return;
            }
        };

        // An extensionless archive can name its own destination; never clear it.
        if dest == archive || (self.ctx.tree.exists(&dest) && !self.ctx.tree.is_dir(&dest)) {
            report.failed(archive, ReconcileError::DestinationExists { path: dest });
            return;
        }

        if !self.ctx.confirm.ask(&prompt, false) {
            report.skipped(archive);
            return;
        }

        if let Err(e) = self.ctx.executor.remove_if_exists(&dest) {
            report.failed(&dest, e);
            return;
        }
        match self.ctx.executor.extract(archive, &dest) {
            Ok(count) => {
                log::debug!("Extracted {count} entries from {name}");
                report.applied(action, archive, &dest);
            }
            Err(e) => {
                report.failed(archive, e);
                return;
            }
        }

        self.reconcile_folder(&dest, mode, report);

        if self.ctx.confirm.ask("Move zip file to archive folder?", false) {
            let stored = archive_store.join(&name);
            let result = self
                .ctx
                .executor
                .create_dir(archive_store)
                .and_then(|_| self.ctx.executor.remove_if_exists(&stored))
                .and_then(|_| self.ctx.executor.move_into(archive, archive_store));
            match result {
                Ok(moved) => report.applied(Action::AutoApply, archive, &moved),
                Err(e) => report.failed(archive, e),
            }
        }
    }

    /// Reconcile a poster folder that is not linked to any target. A folder
    /// with several entries is organized as a collection; otherwise the
    /// folder itself is renamed to its best match by basename.
    pub fn reconcile_unlinked_folder(&self, folder: &Path, report: &mut ReconciliationReport) {
        let entries = match self.ctx.tree.list_entries(folder) {
            Ok(entries) => entries,
            Err(e) => {
                report.failed(folder, e);
                return;
            }
        };
        if entries.len() > 1 {
            log::info!("Organizing complex folder: {}", folder.display());
            self.organize_collection_folder(folder, report);
            return;
        }

        let name = file_name(folder);
        let result = best_match(
            &name,
            self.ctx.targets.names(),
            Metric::TokenSort,
            self.ctx.cutoffs.direct,
            false,
        );
        let Some(target) = result.target else {
            log::warn!("No match found for {name}");
            report.skipped(folder);
            return;
        };

        let prompt = format!("Matched folder {name} to movie {target} [{}], proceed?", result.score);
        if !self.ctx.confirm.ask(&prompt, false) {
            report.skipped(folder);
            return;
        }

        let renamed = folder.with_file_name(&target);
        if self.ctx.tree.exists(&renamed) {
            report.failed(folder, ReconcileError::DestinationExists { path: renamed });
            return;
        }
        match self.ctx.executor.rename(folder, &renamed) {
            Ok(()) => report.applied(Action::AutoApply, folder, &renamed),
            Err(e) => report.failed(folder, e),
        }
    }

    fn files_in(&self, folder: &Path, report: &mut ReconciliationReport) -> Option<Vec<Entry>> {
        match self.ctx.tree.list_entries(folder) {
            Ok(entries) => Some(entries.into_iter().filter(|e| !self.ctx.tree.is_dir(&e.path)).collect()),
            Err(e) => {
                report.failed(folder, e);
                None
            }
        }
    }

    fn apply_file_decision(
        &self,
        folder: &Path,
        source: &Path,
        name: &str,
        decision: &ReconciliationDecision,
        report: &mut ReconciliationReport,
    ) {
        match (decision.action, decision.target_name.as_deref()) {
            (Action::AutoApply | Action::ForceRename | Action::TreatAsCollection, Some(target)) => {
                self.place_as_poster(folder, source, name, target, decision.action, report)
            }
            (Action::Skip | Action::ProposeConfirm, _) | (_, None) => report.skipped(source),
        }
    }

    /// Move `source` to `<folder>/<subfolder>/poster.<ext>`, replacing any
    /// existing subfolder of that name.
    fn place_as_poster(
        &self,
        folder: &Path,
        source: &Path,
        name: &str,
        subfolder: &str,
        action: Action,
        report: &mut ReconciliationReport,
    ) {
        let new_folder = folder.join(subfolder);
        if new_folder == source {
            report.failed(source, ReconcileError::DestinationExists { path: new_folder });
            return;
        }
        let dest = new_folder.join(poster_file_name(name));
        let result = self
            .ctx
            .executor
            .remove_if_exists(&new_folder)
            .and_then(|_| self.ctx.executor.create_dir(&new_folder))
            .and_then(|_| self.ctx.executor.rename(source, &dest));
        match result {
            Ok(()) => report.applied(action, source, &dest),
            Err(e) => report.failed(source, e),
        }
    }
}
