use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Duration;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{NoteError, Result, SortKey, NOTES_KEY, RECENT_WINDOW_DAYS, REMINDERS_KEY, SUGGESTION_LIMIT};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted keys
    pub data_dir: PathBuf,

    /// Key the notes collection is stored under
    pub notes_key: String,

    /// Key the reminders are stored under
    pub reminders_key: String,

    /// Trailing window, in days, of the "recent" filter
    pub recent_window_days: u32,

    /// Sort order used when none is given
    pub default_sort: SortKey,

    /// Maximum number of suggested tags
    pub suggestion_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("notepro-data"));

        Self {
            data_dir,
            notes_key: NOTES_KEY.to_string(),
            reminders_key: REMINDERS_KEY.to_string(),
            recent_window_days: RECENT_WINDOW_DAYS as u32,
            default_sort: SortKey::default(),
            suggestion_limit: SUGGESTION_LIMIT,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "notepro")
}

impl Config {
    /// Location of the configuration file when none is given explicitly
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads the configuration from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| NoteError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration to `path` as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|_| NoteError::DirectoryError {
                    path: parent.to_path_buf(),
                })?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn recent_window(&self) -> Duration {
        Duration::days(i64::from(self.recent_window_days))
    }

    /// Updates one setting from its `key=value` text form
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(NoteError::ConfigError {
                message: format!("expected key=value, got '{}'", assignment),
            });
        };
        let (key, value) = (key.trim(), value.trim());
        let invalid = |message: String| NoteError::ConfigError { message };

        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "notes_key" => self.notes_key = value.to_string(),
            "reminders_key" => self.reminders_key = value.to_string(),
            "recent_window_days" => {
                self.recent_window_days = value
                    .parse()
                    .map_err(|e| invalid(format!("recent_window_days: {}", e)))?
            }
            "default_sort" => self.default_sort = value.parse()?,
            "suggestion_limit" => {
                self.suggestion_limit = value
                    .parse()
                    .map_err(|e| invalid(format!("suggestion_limit: {}", e)))?
            }
            other => return Err(invalid(format!("unknown setting '{}'", other))),
        }
        Ok(())
    }
}
