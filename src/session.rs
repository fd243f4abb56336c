//! The in-memory session: both history tables, their stores and the notes.
//!
//! Every mutation goes through the same cycle: change a copy, save it, then
//! reload from storage so derived fields and row identities are rebuilt from
//! what was actually persisted. A failed save leaves the in-memory table as
//! the source of truth until a later save succeeds.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{NewRun, NewSet, Record, RunRecord, StrengthSet};
use crate::notes::{GroupNotes, NoteSaved, NoteStore};
use crate::routines::ProgramBook;
use crate::store::{self, Backing, FlatFile, LoadStatus, SheetBacking, Workbook};
use crate::table::{RowId, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    NothingSelected,
    Deleted(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetLogged {
    pub performance: f64,
    pub personal_record: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunLogged {
    pub distance_km: f64,
    pub duration_min: f64,
    pub pace_min_per_km: f64,
}

/// One history table together with the store that owns it
pub struct History<R> {
    backing: Box<dyn Backing>,
    table: Table<R>,
    status: LoadStatus,
    dirty: bool,
}

impl<R: Record> History<R> {
    fn open(backing: Box<dyn Backing>, generation: u64) -> Self {
        let loaded = store::load::<R>(backing.as_ref());
        Self {
            backing,
            table: Table::new(loaded.rows, generation),
            status: loaded.status,
            dirty: false,
        }
    }

    pub fn table(&self) -> &Table<R> {
        &self.table
    }

    pub fn rows(&self) -> &[R] {
        self.table.rows()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// True while rows exist only in memory because their save failed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn reload(&mut self, generation: u64) {
        if self.dirty {
            warn!(kind = %R::KIND, "Reloading discards rows that were never saved");
        }
        let loaded = store::load::<R>(self.backing.as_ref());
        self.table = Table::new(loaded.rows, generation);
        self.status = loaded.status;
        self.dirty = false;
    }

    /// A store that exists but failed to load must not be overwritten with
    /// the partial table held in memory. Empty stores and a missing sheet
    /// hold nothing to lose.
    fn ensure_writable(&self) -> Result<()> {
        if !self.status.is_corrupt() {
            return Ok(());
        }
        let path = self.backing.location().to_path_buf();
        match self.backing.read_table() {
            Ok(None) | Err(Error::EmptyStore { .. }) | Err(Error::SheetNotFound(_)) => Ok(()),
            Ok(Some(_)) => Err(Error::ChangedOnDisk { path }),
            Err(e) => {
                warn!(kind = %R::KIND, path = %path.display(), "Refusing to overwrite an unreadable history");
                Err(Error::Unreadable { path, source: Box::new(e) })
            }
        }
    }

    fn save(&mut self, generation: u64) -> Result<()> {
        self.ensure_writable()?;
        store::save(self.table.rows(), self.backing.as_ref())?;
        self.dirty = false;
        self.reload(generation);
        Ok(())
    }

    fn append(&mut self, row: R, generation: u64) -> Result<()> {
        self.table.push(row);
        self.dirty = true;
        self.save(generation)
    }

    fn delete(&mut self, ids: &[RowId], generation: u64) -> Result<DeleteOutcome> {
        if ids.is_empty() {
            return Ok(DeleteOutcome::NothingSelected);
        }
        if self.dirty {
            return Err(Error::UnsavedChanges(R::KIND));
        }
        let ids: BTreeSet<RowId> = ids.iter().copied().collect();
        let remaining = self.table.without(&ids)?;
        self.ensure_writable()?;
        store::save(&remaining, self.backing.as_ref())?;
        self.reload(generation);
        info!(kind = %R::KIND, deleted = ids.len(), "Deleted history rows");
        Ok(DeleteOutcome::Deleted(ids.len()))
    }
}

pub struct Session {
    config: AppConfig,
    notes: NoteStore,
    strength: History<StrengthSet>,
    runs: History<RunRecord>,
    generation: u64,
}

impl Session {
    /// Load both histories. Never fails: unreadable stores come back empty
    /// with their [`LoadStatus`] explaining why.
    pub fn open(config: AppConfig) -> Self {
        let strength_store = SheetBacking::new(Workbook::new(&config.program_file), config.history_sheet.clone());
        let run_store = FlatFile::new(&config.running_history_file);
        let notes = NoteStore::new(&config.notes_file, config.known_groups());
        let session = Self {
            strength: History::open(Box::new(strength_store), 1),
            runs: History::open(Box::new(run_store), 2),
            notes,
            config,
            generation: 2,
        };
        info!(
            sets = session.strength.rows().len(),
            runs = session.runs.rows().len(),
            "Session opened"
        );
        session
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn strength(&self) -> &History<StrengthSet> {
        &self.strength
    }

    pub fn runs(&self) -> &History<RunRecord> {
        &self.runs
    }

    pub fn program(&self) -> ProgramBook {
        ProgramBook::new(&self.config)
    }

    pub fn notes(&self) -> GroupNotes {
        self.notes.load_notes()
    }

    pub fn save_note(&self, group: &str, text: &str) -> Result<NoteSaved> {
        self.notes.save_note(group, text)
    }

    pub fn is_personal_record(&self, exercise: &str, performance: f64) -> bool {
        metrics::is_personal_record(self.strength.rows(), exercise, performance)
    }

    /// Validate, append and persist a set. The record check runs against
    /// the rows loaded before this set was added.
    pub fn log_set(&mut self, new: NewSet) -> Result<SetLogged> {
        let set = new.validate()?;
        let logged = SetLogged {
            performance: set.performance,
            personal_record: self.is_personal_record(&set.exercise, set.performance),
        };
        let generation = self.next_generation();
        self.strength.append(set, generation)?;
        Ok(logged)
    }

    pub fn log_run(&mut self, new: NewRun) -> Result<RunLogged> {
        let run = new.validate()?;
        let logged = RunLogged {
            distance_km: run.distance_km,
            duration_min: run.duration_min,
            pace_min_per_km: run.avg_pace_min_per_km,
        };
        let generation = self.next_generation();
        self.runs.append(run, generation)?;
        Ok(logged)
    }

    /// Retry persisting the strength history after a failed save
    pub fn save_strength(&mut self) -> Result<()> {
        let generation = self.next_generation();
        self.strength.save(generation)
    }

    pub fn save_runs(&mut self) -> Result<()> {
        let generation = self.next_generation();
        self.runs.save(generation)
    }

    pub fn reload_strength(&mut self) {
        let generation = self.next_generation();
        self.strength.reload(generation);
    }

    pub fn reload_runs(&mut self) {
        let generation = self.next_generation();
        self.runs.reload(generation);
    }

    /// Delete sets by identity, persist, and reload. Identities issued
    /// before the reload are rejected afterwards.
    pub fn delete_sets(&mut self, ids: &[RowId]) -> Result<DeleteOutcome> {
        let generation = self.next_generation();
        self.strength.delete(ids, generation)
    }

    pub fn delete_runs(&mut self, ids: &[RowId]) -> Result<DeleteOutcome> {
        let generation = self.next_generation();
        self.runs.delete(ids, generation)
    }
}
