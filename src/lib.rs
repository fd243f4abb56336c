//! Training log: a workout program read from a spreadsheet, strength sets
//! kept in a sheet of the same workbook, runs kept in a CSV file.
//!
//! Stored histories are ingested leniently ([`normalize`]), derived fields
//! are recomputed on every load ([`metrics`]), and saving merges one table
//! back into its container without touching anything else ([`store`]).

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod notes;
pub mod report;
pub mod routines;
pub mod schema;
pub mod session;
pub mod store;
pub mod table;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use models::{NewRun, NewSet, Record, RunRecord, StrengthSet};
pub use schema::RecordKind;
pub use session::{DeleteOutcome, Session};
pub use store::LoadStatus;
pub use table::{RowId, Table};
