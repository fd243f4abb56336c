//! Backing containers and the load/save cycle for history tables.
//!
//! Loading never fails: a missing store yields an empty table with
//! [`LoadStatus::Missing`], an unreadable one an empty table with
//! [`LoadStatus::Corrupt`]. Saving always reports failures.

pub mod flat;
pub mod workbook;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::models::Record;
use crate::normalize::normalize_records;
use crate::table::RawTable;

pub use flat::FlatFile;
pub use workbook::{SheetBacking, Sheets, Workbook};

/// One logical table in durable storage
pub trait Backing {
    fn location(&self) -> &Path;

    /// Stored table, or `None` when the container does not exist yet
    fn read_table(&self) -> Result<Option<RawTable>>;

    /// Replace the stored table with `table`
    fn write_table(&self, table: RawTable) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// Nothing stored yet, the container is created on first save
    Missing,
    /// The container exists but could not be read
    Corrupt(String),
}

impl LoadStatus {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, LoadStatus::Corrupt(_))
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded => f.write_str("loaded"),
            LoadStatus::Missing => f.write_str("not created yet, it will be created on first save"),
            LoadStatus::Corrupt(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Loaded<R> {
    pub rows: Vec<R>,
    pub status: LoadStatus,
}

/// Read, normalize and derive the history held by `backing`
pub fn load<R: Record>(backing: &dyn Backing) -> Loaded<R> {
    let location = backing.location().display().to_string();
    match backing.read_table() {
        Ok(None) => {
            info!(kind = %R::KIND, %location, "No stored history yet");
            Loaded { rows: Vec::new(), status: LoadStatus::Missing }
        }
        Ok(Some(raw)) => {
            let (rows, canonical) = normalize_records::<R>(&raw);
            debug!(
                kind = %R::KIND,
                %location,
                rows = rows.len(),
                dropped = canonical.dropped_rows,
                "Loaded history"
            );
            Loaded { rows, status: LoadStatus::Loaded }
        }
        Err(e) => {
            warn!(kind = %R::KIND, %location, error = %e, "Stored history is unreadable, starting empty");
            Loaded { rows: Vec::new(), status: LoadStatus::Corrupt(e.to_string()) }
        }
    }
}

/// Persisted projection of `rows`: derived columns stripped, canonical order
pub fn persisted_table<R: Record>(rows: &[R]) -> RawTable {
    let headers = R::KIND.persisted_columns().map(|c| c.name.to_string()).collect();
    let mut table = RawTable::new(headers);
    for row in rows {
        table.push_row(row.persisted_cells());
    }
    table
}

pub fn save<R: Record>(rows: &[R], backing: &dyn Backing) -> Result<()> {
    let result = backing.write_table(persisted_table(rows));
    match &result {
        Ok(()) => info!(
            kind = %R::KIND,
            location = %backing.location().display(),
            rows = rows.len(),
            "Saved history"
        ),
        Err(e) => error!(
            kind = %R::KIND,
            location = %backing.location().display(),
            error = %e,
            "Failed to save history"
        ),
    }
    result
}

/// Windows reports a file held open by another program as a sharing or
/// lock violation rather than a permission error.
fn is_locked(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    cfg!(windows) && matches!(e.raw_os_error(), Some(32) | Some(33))
}

fn map_io(path: &Path, e: io::Error) -> Error {
    if is_locked(&e) {
        Error::PermissionDenied { path: path.to_path_buf() }
    } else {
        Error::Io(e)
    }
}

/// Write a fully serialized file in one go, creating parent directories
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| map_io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| map_io(path, e))
}
