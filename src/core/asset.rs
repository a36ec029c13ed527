//! Asset and file-role classification.
//!
//! Every name-pattern check the policy depends on happens here, once, at
//! discovery time. The policy layer only pattern-matches the resulting enums.

use crate::core::normalize::{display_stem, extension};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Season ([0-9]+)").expect("Invalid regex"));

static RE_SET_BY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b.+ set by \S+").expect("Invalid regex"));

const SEASON_MARKER: &str = "Season";
const SPECIALS_MARKER: &str = "Specials";
const POSTER_STEM: &str = "poster";

/// What a filesystem entry is, as reported by the file tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Archive,
}

/// A discovered unit to reconcile. The variant is fixed at discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Asset {
    LooseFile(PathBuf),
    PosterFolder(PathBuf),
    Archive(PathBuf),
}

impl Asset {
    pub fn from_entry(path: PathBuf, kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Asset::LooseFile(path),
            EntryKind::Dir => Asset::PosterFolder(path),
            EntryKind::Archive => Asset::Archive(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Asset::LooseFile(p) | Asset::PosterFolder(p) | Asset::Archive(p) => p,
        }
    }

    pub fn name(&self) -> String {
        file_name(self.path())
    }
}

/// Role of a file inside a movie poster folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieFileRole {
    /// Name carries a collection marker; never matched against targets.
    Collection,
    Single,
}

impl MovieFileRole {
    pub fn classify(file_name: &str, collection_markers: &[String]) -> Self {
        if is_collection_name(file_name, collection_markers) {
            MovieFileRole::Collection
        } else {
            MovieFileRole::Single
        }
    }
}

/// Role of a file inside a show poster folder, decided by content pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowFileRole {
    Season(u32),
    Specials,
    /// Mentions a season without a `Season N` number, e.g. an already
    /// renamed `Season01.jpg`. Left untouched.
    SeasonUnnumbered,
    Poster,
}

impl ShowFileRole {
    pub fn classify(file_name: &str) -> Self {
        if file_name.contains(SEASON_MARKER) {
            RE_SEASON
                .captures(file_name)
                .and_then(|c| c[1].parse().ok())
                .map_or(ShowFileRole::SeasonUnnumbered, ShowFileRole::Season)
        } else if file_name.contains(SPECIALS_MARKER) {
            ShowFileRole::Specials
        } else {
            ShowFileRole::Poster
        }
    }

    /// The canonical name for this file, keeping its extension. `None` when
    /// the file keeps its current name.
    pub fn canonical_name(&self, file_name: &str) -> Option<String> {
        let ext = extension(file_name);
        match self {
            ShowFileRole::Season(n) => Some(format!("{SEASON_MARKER}{n:02}{ext}")),
            ShowFileRole::Specials => Some(format!("{SEASON_MARKER}00{ext}")),
            ShowFileRole::Poster => Some(format!("{POSTER_STEM}{ext}")),
            ShowFileRole::SeasonUnnumbered => None,
        }
    }
}

/// `poster.<ext>` for a source file name.
pub fn poster_file_name(source_name: &str) -> String {
    format!("{POSTER_STEM}{}", extension(source_name))
}

pub fn is_poster_file(file_name: &str) -> bool {
    display_stem(file_name) == POSTER_STEM
}

pub fn is_collection_name(name: &str, collection_markers: &[String]) -> bool {
    collection_markers.iter().any(|m| name.contains(m.as_str()))
}

/// Name a poster takes when linked into a media folder: `Season00` becomes
/// `season-specials-poster`, other seasons `seasonNN-poster`.
pub fn media_link_name(poster_name: &str) -> String {
    if poster_name.contains("Season00") {
        poster_name.replacen("Season00", "season-specials-poster", 1)
    } else if poster_name.contains(SEASON_MARKER) {
        let mut parts = poster_name.split('.');
        let stem = parts.next().unwrap_or_default().to_lowercase();
        match parts.next() {
            Some(ext) => format!("{stem}-poster.{ext}"),
            None => format!("{stem}-poster"),
        }
    } else {
        poster_name.to_string()
    }
}

/// Tidy a downloaded archive's file name.
///
/// A `<title> set by <creator>` stem is cut right after the creator token.
/// Otherwise everything up to the first `.` is cut at the first `__` and
/// underscores become spaces.
pub fn tidy_archive_name(name: &str) -> String {
    let stem = crate::core::normalize::strip_extension(name);
    if let Some(m) = RE_SET_BY_NAME.find(stem) {
        return format!("{}{}", m.as_str(), extension(name));
    }
    match name.split_once('.') {
        Some((head, rest)) => {
            let head = head.split("__").next().unwrap_or(head);
            format!("{head}.{rest}").replace('_', " ")
        }
        None => name.split("__").next().unwrap_or(name).replace('_', " "),
    }
}

/// Final path segment as an owned string; empty for paths without one.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
