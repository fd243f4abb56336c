//! Error types for the training log

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::RecordKind;
use crate::table::RowId;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or one of its sheets could not be parsed
    #[error("Workbook read error: {0}")]
    WorkbookRead(#[from] calamine::Error),

    /// The workbook could not be serialized
    #[error("Workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file exists but is not valid TOML for `AppConfig`
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Destination is locked or read-only, usually because it is open in another program
    #[error("Permission denied writing {}: close it in any other program and retry", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("{} is empty", .path.display())]
    EmptyStore { path: PathBuf },

    /// An existing container could not be read, so writing it would lose what it holds
    #[error("Cannot read {} before saving, refusing to overwrite it: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Invalid user input, rejected before anything reaches storage
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Row {0} was issued by an earlier load; reload the history before deleting")]
    StaleIdentity(RowId),

    #[error("Row {0} does not exist in the loaded history")]
    UnknownIdentity(RowId),

    #[error("{0} history has rows that were not saved yet; save them before deleting")]
    UnsavedChanges(RecordKind),

    /// A store that was unreadable at load time can be read now
    #[error("{} changed since it was loaded; reload the history before saving", .path.display())]
    ChangedOnDisk { path: PathBuf },
}

impl Error {
    /// True when the failure is a lock/permission problem the user can fix and retry
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::PermissionDenied { .. } => true,
            Error::Unreadable { source, .. } => source.is_permission_denied(),
            _ => false,
        }
    }
}
