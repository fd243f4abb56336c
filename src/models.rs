//models.rs
use std::fmt::Debug;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::metrics;
use crate::schema::{RecordKind, Value};
use crate::table::Cell;

pub const MIN_EFFORT: u8 = 1;
pub const MAX_EFFORT: u8 = 10;
pub const MAX_HEART_RATE: u32 = 250;
pub const UNSPECIFIED_RUN_TYPE: &str = "Unspecified";

/// A row type with a canonical column contract.
///
/// `from_values` receives values already coerced to the column types of
/// `KIND.columns()`, in that order.
pub trait Record: Clone + Debug {
    const KIND: RecordKind;

    fn from_values(values: &[Value]) -> Self;

    /// Full canonical row, derived columns included
    fn to_values(&self) -> Vec<Value>;

    fn date(&self) -> NaiveDate;

    /// Recompute every derived field from the raw ones
    fn refresh_derived(&mut self);

    /// One-line description used when listing rows for deletion
    fn summary(&self) -> String;

    /// Cells written to storage, in persisted column order
    fn persisted_cells(&self) -> Vec<Cell> {
        Self::KIND
            .columns()
            .iter()
            .zip(self.to_values())
            .filter(|(spec, _)| spec.persisted)
            .map(|(_, value)| value.to_cell())
            .collect()
    }
}

fn value(values: &[Value], index: usize) -> &Value {
    static MISSING: Value = Value::Integer(0);
    values.get(index).unwrap_or(&MISSING)
}

fn clamp_u32(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

fn clamp_u8(n: i64) -> u8 {
    u8::try_from(n).unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrengthSet {
    pub date: NaiveDate,
    pub exercise: String,
    pub weight: f64,
    pub reps: u32,
    pub effort: u8,
    pub performance: f64,
}

impl StrengthSet {
    pub fn new(date: NaiveDate, exercise: &str, weight: f64, reps: u32, effort: u8) -> Self {
        let mut set = Self {
            date,
            exercise: exercise.to_string(),
            weight,
            reps,
            effort,
            performance: 0.0,
        };
        set.refresh_derived();
        set
    }
}

impl Record for StrengthSet {
    const KIND: RecordKind = RecordKind::Strength;

    fn from_values(values: &[Value]) -> Self {
        Self {
            date: value(values, 0).as_date().unwrap_or_default(),
            exercise: value(values, 1).as_text().to_string(),
            weight: value(values, 2).as_real(),
            reps: clamp_u32(value(values, 3).as_integer()),
            effort: clamp_u8(value(values, 4).as_integer()),
            performance: value(values, 5).as_real(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.exercise.clone()),
            Value::Real(self.weight),
            Value::Integer(i64::from(self.reps)),
            Value::Integer(i64::from(self.effort)),
            Value::Real(self.performance),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn refresh_derived(&mut self) {
        self.performance = metrics::performance(self.weight, self.reps, self.effort);
    }

    fn summary(&self) -> String {
        format!(
            "{} | {}kg x {} reps | RPE:{}",
            self.exercise, self.weight, self.reps, self.effort
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    pub date: NaiveDate,
    pub run_type: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub avg_pace_min_per_km: f64,
    /// `None` when not measured; stored as an empty cell
    pub avg_heart_rate: Option<u32>,
    pub effort: u8,
    pub notes: String,
}

impl Record for RunRecord {
    const KIND: RecordKind = RecordKind::Run;

    fn from_values(values: &[Value]) -> Self {
        let heart_rate = clamp_u32(value(values, 5).as_integer());
        Self {
            date: value(values, 0).as_date().unwrap_or_default(),
            run_type: value(values, 1).as_text().to_string(),
            distance_km: value(values, 2).as_real(),
            duration_min: value(values, 3).as_real(),
            avg_pace_min_per_km: value(values, 4).as_real(),
            avg_heart_rate: (heart_rate > 0).then_some(heart_rate),
            effort: clamp_u8(value(values, 6).as_integer()),
            notes: value(values, 7).as_text().to_string(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.run_type.clone()),
            Value::Real(self.distance_km),
            Value::Real(self.duration_min),
            Value::Real(self.avg_pace_min_per_km),
            Value::Integer(i64::from(self.avg_heart_rate.unwrap_or(0))),
            Value::Integer(i64::from(self.effort)),
            Value::Text(self.notes.clone()),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn refresh_derived(&mut self) {
        self.avg_pace_min_per_km = metrics::pace_min_per_km(self.distance_km, self.duration_min);
    }

    fn summary(&self) -> String {
        format!(
            "{} | {:.1}km / {:.1}min | Pace:{:.2} | RPE:{}",
            self.run_type, self.distance_km, self.duration_min, self.avg_pace_min_per_km, self.effort
        )
    }

    fn persisted_cells(&self) -> Vec<Cell> {
        let pace = (self.avg_pace_min_per_km * 1000.0).round() / 1000.0;
        vec![
            Cell::Date(self.date),
            Value::Text(self.run_type.clone()).to_cell(),
            Cell::Number(self.distance_km),
            Cell::Number(self.duration_min),
            Cell::Number(pace),
            self.avg_heart_rate.map_or(Cell::Empty, |bpm| Cell::Number(f64::from(bpm))),
            Cell::Number(f64::from(self.effort)),
            Value::Text(self.notes.clone()).to_cell(),
        ]
    }
}

fn check_effort(effort: u8) -> Result<()> {
    if !(MIN_EFFORT..=MAX_EFFORT).contains(&effort) {
        return Err(Error::InvalidInput(format!(
            "Effort must be between {MIN_EFFORT} and {MAX_EFFORT} (got {effort})"
        )));
    }
    Ok(())
}

/// A set as submitted by the user, before validation
#[derive(Clone, Debug)]
pub struct NewSet {
    pub date: NaiveDate,
    pub exercise: String,
    pub weight: f64,
    pub reps: u32,
    pub effort: u8,
}

impl NewSet {
    pub fn validate(self) -> Result<StrengthSet> {
        let exercise = self.exercise.trim();
        if exercise.is_empty() {
            return Err(Error::InvalidInput("Select an exercise before logging a set".into()));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Weight must be zero or more kilograms (got {})",
                self.weight
            )));
        }
        if self.reps == 0 {
            return Err(Error::InvalidInput("Reps must be at least 1".into()));
        }
        check_effort(self.effort)?;
        Ok(StrengthSet::new(self.date, exercise, self.weight, self.reps, self.effort))
    }
}

/// A run as submitted by the user, before validation.
/// A heart rate of 0 means "not measured".
#[derive(Clone, Debug)]
pub struct NewRun {
    pub date: NaiveDate,
    pub run_type: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub avg_heart_rate: u32,
    pub effort: u8,
    pub notes: String,
}

impl NewRun {
    pub fn validate(self) -> Result<RunRecord> {
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Distance must be greater than 0 km (got {})",
                self.distance_km
            )));
        }
        if !self.duration_min.is_finite() || self.duration_min <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Duration must be greater than 0 minutes (got {})",
                self.duration_min
            )));
        }
        if self.avg_heart_rate > MAX_HEART_RATE {
            return Err(Error::InvalidInput(format!(
                "Average heart rate must be at most {MAX_HEART_RATE} bpm, or 0 if not measured (got {})",
                self.avg_heart_rate
            )));
        }
        check_effort(self.effort)?;

        let run_type = match self.run_type.trim() {
            "" => UNSPECIFIED_RUN_TYPE.to_string(),
            t => t.to_string(),
        };
        let mut run = RunRecord {
            date: self.date,
            run_type,
            distance_km: self.distance_km,
            duration_min: self.duration_min,
            avg_pace_min_per_km: 0.0,
            avg_heart_rate: (self.avg_heart_rate > 0).then_some(self.avg_heart_rate),
            effort: self.effort,
            notes: self.notes.trim().to_string(),
        };
        run.refresh_derived();
        Ok(run)
    }
}
