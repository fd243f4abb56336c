//! Group notes, one free-form text per group label, kept as pretty JSON

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::Result;
use crate::store::write_file;

pub type GroupNotes = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteSaved {
    Saved,
    /// The stored note already had this text, nothing was written
    Unchanged,
}

#[derive(Clone, Debug)]
pub struct NoteStore {
    path: PathBuf,
    known_groups: BTreeSet<String>,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>, known_groups: BTreeSet<String>) -> Self {
        Self { path: path.into(), known_groups }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn defaults(&self) -> GroupNotes {
        self.known_groups.iter().map(|g| (g.clone(), String::new())).collect()
    }

    /// Every known group mapped to its note. Missing or corrupt files read
    /// as all-empty; a corrupt file is never partially merged.
    pub fn load_notes(&self) -> GroupNotes {
        let mut notes = self.defaults();
        if !self.path.exists() {
            info!(path = %self.path.display(), "No group notes yet");
            return notes;
        }
        let stored = std::fs::read_to_string(&self.path)
            .map_err(crate::Error::from)
            .and_then(|text| Ok(serde_json::from_str::<GroupNotes>(&text)?));
        match stored {
            Ok(stored) => notes.extend(stored),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Group notes are unreadable, showing them empty"),
        }
        notes
    }

    pub fn note(&self, group: &str) -> String {
        self.load_notes().remove(group).unwrap_or_default()
    }

    /// Overwrite the note of `group` with `text`
    pub fn save_note(&self, group: &str, text: &str) -> Result<NoteSaved> {
        let mut notes = self.load_notes();
        if notes.get(group).map(String::as_str) == Some(text) {
            return Ok(NoteSaved::Unchanged);
        }
        notes.insert(group.to_string(), text.to_string());

        let json = serde_json::to_string_pretty(&notes)?;
        if let Err(e) = write_file(&self.path, json.as_bytes()) {
            error!(path = %self.path.display(), error = %e, "Failed to save group note");
            return Err(e);
        }
        info!(group, "Saved group note");
        Ok(NoteSaved::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> NoteStore {
        let groups = ["Lower 1", "Upper 1", "Run"].into_iter().map(String::from).collect();
        NoteStore::new(dir.path().join("notes.json"), groups)
    }

    #[test]
    fn missing_store_defaults_every_group_to_empty() {
        let dir = TempDir::new().unwrap();
        let notes = store(&dir).load_notes();
        assert_eq!(notes.len(), 3);
        assert!(notes.values().all(String::is_empty));
    }

    #[test]
    fn saving_overwrites_the_whole_note() {
        let dir = TempDir::new().unwrap();
        let notes = store(&dir);
        assert_eq!(notes.save_note("Lower 1", "Squat: add 2.5kg").unwrap(), NoteSaved::Saved);
        assert_eq!(notes.save_note("Lower 1", "Deload week").unwrap(), NoteSaved::Saved);
        assert_eq!(notes.note("Lower 1"), "Deload week");
        assert_eq!(notes.note("Upper 1"), "");

        let text = std::fs::read_to_string(notes.path()).unwrap();
        assert!(text.contains("\"Lower 1\": \"Deload week\""));
    }

    #[test]
    fn unchanged_note_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let notes = store(&dir);
        assert_eq!(notes.save_note("Run", "").unwrap(), NoteSaved::Unchanged);
        assert!(!notes.path().exists());
    }

    #[test]
    fn corrupt_store_reads_empty_and_unknown_groups_survive() {
        let dir = TempDir::new().unwrap();
        let notes = store(&dir);
        std::fs::write(notes.path(), "{\"Lower 1\": \"ok\", ").unwrap();
        assert!(notes.load_notes().values().all(String::is_empty));

        std::fs::write(notes.path(), "{\"Cardio\": \"intervals\", \"Run\": \"tempo\"}").unwrap();
        let loaded = notes.load_notes();
        assert_eq!(loaded["Cardio"], "intervals");
        assert_eq!(loaded["Run"], "tempo");
        assert_eq!(loaded["Upper 1"], "");
    }
}
