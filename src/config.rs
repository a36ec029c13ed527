use crate::core::policy::Cutoffs;
use crate::services::library::Library;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings loaded from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root holding one poster folder per library.
    pub poster_dir: PathBuf,
    pub archive_dir_name: String,
    /// Staging folder for loose posters, created next to them.
    pub custom_dir_name: String,
    pub ignore_dirs: Vec<String>,
    pub collection_markers: Vec<String>,
    pub cutoffs: Cutoffs,
    pub libraries: Vec<Library>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poster_dir: PathBuf::from("/data/Posters"),
            archive_dir_name: "Archives".to_string(),
            custom_dir_name: "Custom".to_string(),
            ignore_dirs: vec!["__MACOSX".to_string()],
            collection_markers: vec!["Collection".to_string()],
            cutoffs: Cutoffs::default(),
            libraries: Vec::new(),
        }
    }
}

impl Settings {
    /// `<config dir>/posterrs/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("posterrs").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.poster_dir.join(&self.archive_dir_name)
    }
}
