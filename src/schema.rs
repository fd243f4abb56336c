//! Column contracts for the two record kinds.
//!
//! Each kind owns an ordered list of [`ColumnSpec`]s. The normalizer walks that
//! list to build canonical rows, the writer walks it again (skipping derived
//! columns) to build the persisted table, so the order here is the order on
//! disk and the order of every canonical row in memory.

use std::fmt;

use chrono::NaiveDate;

use crate::table::Cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Strength,
    Run,
}

impl RecordKind {
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            RecordKind::Strength => STRENGTH_COLUMNS,
            RecordKind::Run => RUN_COLUMNS,
        }
    }

    /// Columns written to the backing container, in canonical order
    pub fn persisted_columns(self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.columns().iter().filter(|c| c.persisted)
    }

    /// Position of `name` in the canonical column list
    pub fn position(self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Strength => f.write_str("Strength"),
            RecordKind::Run => f.write_str("Run"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    Text,
    Real,
    Integer,
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    /// Headers accepted in place of `name` (older Italian workbooks)
    pub aliases: &'static [&'static str],
    pub ty: ColumnType,
    /// Derived columns are recomputed on load and never written
    pub persisted: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, aliases: &'static [&'static str], ty: ColumnType) -> Self {
        Self { name, aliases, ty, persisted: true }
    }

    const fn derived(name: &'static str, ty: ColumnType) -> Self {
        Self { name, aliases: &[], ty, persisted: false }
    }

    pub fn matches(&self, header: &str) -> bool {
        header_matches(header, self.name, self.aliases)
    }

    /// Value synthesized for a missing column. Dates have none: a row
    /// without a parseable date is dropped instead.
    pub fn default_value(&self) -> Option<Value> {
        match self.ty {
            ColumnType::Date => None,
            ColumnType::Text => Some(Value::Text(String::new())),
            ColumnType::Real => Some(Value::Real(0.0)),
            ColumnType::Integer => Some(Value::Integer(0)),
        }
    }
}

pub const DATE: &str = "Date";
pub const EXERCISE: &str = "Exercise";
pub const WEIGHT: &str = "Weight";
pub const REPS: &str = "Reps";
pub const EFFORT: &str = "Effort";
pub const PERFORMANCE: &str = "Performance";
pub const RUN_TYPE: &str = "RunType";
pub const DISTANCE_KM: &str = "DistanceKm";
pub const DURATION_MIN: &str = "DurationMin";
pub const AVG_PACE: &str = "AvgPaceMinPerKm";
pub const AVG_HEART_RATE: &str = "AvgHeartRateBpm";
pub const NOTES: &str = "Notes";

pub const DATE_ALIASES: &[&str] = &["Data"];
pub const EXERCISE_ALIASES: &[&str] = &["Esercizio"];

pub const STRENGTH_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new(DATE, DATE_ALIASES, ColumnType::Date),
    ColumnSpec::new(EXERCISE, EXERCISE_ALIASES, ColumnType::Text),
    ColumnSpec::new(WEIGHT, &["Peso"], ColumnType::Real),
    ColumnSpec::new(REPS, &["Ripetizioni"], ColumnType::Integer),
    ColumnSpec::new(EFFORT, &["Sforzo"], ColumnType::Integer),
    ColumnSpec::derived(PERFORMANCE, ColumnType::Real),
];

pub const RUN_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new(DATE, DATE_ALIASES, ColumnType::Date),
    ColumnSpec::new(RUN_TYPE, &["Tipo Corsa"], ColumnType::Text),
    ColumnSpec::new(DISTANCE_KM, &["Distanza (km)"], ColumnType::Real),
    ColumnSpec::new(DURATION_MIN, &["Tempo (min)"], ColumnType::Real),
    ColumnSpec::new(AVG_PACE, &["Passo Medio (min/km)"], ColumnType::Real),
    ColumnSpec::new(AVG_HEART_RATE, &["Battiti Medi (BPM)"], ColumnType::Integer),
    ColumnSpec::new(EFFORT, &["Sforzo"], ColumnType::Integer),
    ColumnSpec::new(NOTES, &["Note"], ColumnType::Text),
];

/// Header comparison used everywhere a column is looked up by name
pub fn header_matches(header: &str, name: &str, aliases: &[&str]) -> bool {
    let header = header.trim();
    header.eq_ignore_ascii_case(name) || aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
}

/// A coerced canonical cell. Unlike [`Cell`] it always has the semantic
/// type its column declares.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Date(NaiveDate),
    Text(String),
    Real(f64),
    Integer(i64),
}

impl Value {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Value::Text(s) => s,
            _ => "",
        }
    }

    pub fn as_real(&self) -> f64 {
        match self {
            Value::Real(n) => *n,
            Value::Integer(n) => *n as f64,
            _ => 0.0,
        }
    }

    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Integer(n) => *n,
            Value::Real(n) => n.trunc() as i64,
            _ => 0,
        }
    }

    pub fn to_cell(&self) -> Cell {
        match self {
            Value::Date(d) => Cell::Date(*d),
            Value::Text(s) if s.is_empty() => Cell::Empty,
            Value::Text(s) => Cell::Text(s.clone()),
            Value::Real(n) => Cell::Number(*n),
            Value::Integer(n) => Cell::Number(*n as f64),
        }
    }
}
