//! Configuration loading
//!
//! Resolution order:
//! 1. File named by the `TRAINING_LOG_CONFIG` environment variable
//! 2. `training_log.toml` in the working directory
//! 3. Compiled defaults
//!
//! A missing file is not an error; a file that exists but does not parse is.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

pub const CONFIG_ENV_VAR: &str = "TRAINING_LOG_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "training_log.toml";

pub const DEFAULT_PROGRAM_FILE: &str = "training_program.xlsx";
pub const DEFAULT_RUNNING_HISTORY_FILE: &str = "running_history.csv";
pub const DEFAULT_NOTES_FILE: &str = "group_notes.json";
pub const DEFAULT_HISTORY_SHEET: &str = "Strength History";
pub const DEFAULT_RUNNING_GROUP: &str = "Run";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Workbook holding the program days and the strength history sheet
    pub program_file: PathBuf,
    pub running_history_file: PathBuf,
    pub notes_file: PathBuf,
    /// Sheet of `program_file` that stores the strength history
    pub history_sheet: String,
    /// Group label that marks a program day as a running day
    pub running_group: String,
    /// Program sheet name → group label
    pub groups: BTreeMap<String, String>,
    /// Used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let groups = [
            ("Day 1 - Lower A", "Lower 1"),
            ("Day 2 - Upper A", "Upper 1"),
            ("Day 3 - Lower B", "Lower 2"),
            ("Day 4 - Upper B", "Upper 2"),
            ("Run - Friday", DEFAULT_RUNNING_GROUP),
        ]
        .into_iter()
        .map(|(sheet, group)| (sheet.to_string(), group.to_string()))
        .collect();

        Self {
            program_file: PathBuf::from(DEFAULT_PROGRAM_FILE),
            running_history_file: PathBuf::from(DEFAULT_RUNNING_HISTORY_FILE),
            notes_file: PathBuf::from(DEFAULT_NOTES_FILE),
            history_sheet: DEFAULT_HISTORY_SHEET.to_string(),
            running_group: DEFAULT_RUNNING_GROUP.to_string(),
            groups,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn resolve() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Point every file at `dir`, keeping the file names
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        let rebase = |p: &Path| dir.join(p.file_name().unwrap_or(p.as_os_str()));
        self.program_file = rebase(&self.program_file);
        self.running_history_file = rebase(&self.running_history_file);
        self.notes_file = rebase(&self.notes_file);
        self
    }

    pub fn group_for(&self, sheet: &str) -> Option<&str> {
        self.groups.get(sheet).map(String::as_str)
    }

    /// Every group label a note can be attached to
    pub fn known_groups(&self) -> BTreeSet<String> {
        self.groups.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config = AppConfig::from_toml_str(
            r#"
            running_history_file = "data/runs.csv"

            [groups]
            "Monday" = "Upper 1"
            "#,
        )
        .unwrap();
        assert_eq!(config.running_history_file, PathBuf::from("data/runs.csv"));
        assert_eq!(config.history_sheet, DEFAULT_HISTORY_SHEET);
        assert_eq!(config.group_for("Monday"), Some("Upper 1"));
        assert_eq!(config.group_for("Day 1 - Lower A"), None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.known_groups().contains(DEFAULT_RUNNING_GROUP));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "groups = 3").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn rooted_at_moves_every_file() {
        let config = AppConfig::default().rooted_at(Path::new("/tmp/log"));
        assert_eq!(config.program_file, PathBuf::from("/tmp/log/training_program.xlsx"));
        assert_eq!(config.notes_file, PathBuf::from("/tmp/log/group_notes.json"));
    }
}
