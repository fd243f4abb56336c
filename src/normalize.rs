//! Lenient ingestion of raw tables into canonical rows.
//!
//! Row-level defects never fail a load: a row without a parseable date is
//! dropped, an unparseable number becomes 0, and a missing column is
//! synthesized from its [`ColumnSpec`] default.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use tracing::{debug, warn};

use crate::metrics;
use crate::models::Record;
use crate::schema::{self, ColumnSpec, ColumnType, RecordKind, Value};
use crate::table::{Cell, RawTable};

/// Spreadsheet serial day 0
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Largest serial a spreadsheet can display (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Output of [`normalize`]: canonical rows plus what was repaired on the way
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalTable {
    pub kind: RecordKind,
    /// Each row holds one value per column of `kind.columns()`, in order
    pub rows: Vec<Vec<Value>>,
    pub missing_columns: Vec<&'static str>,
    pub dropped_rows: usize,
}

impl CanonicalTable {
    pub fn into_records<R: Record>(self) -> Vec<R> {
        debug_assert_eq!(self.kind, R::KIND);
        self.rows.iter().map(|values| R::from_values(values)).collect()
    }
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    excel_epoch().checked_add_days(Days::new(serial.floor() as u64))
}

pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial with its fraction of a day, rounded to the second
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    excel_epoch().and_time(NaiveTime::default()).checked_add_signed(TimeDelta::seconds(seconds))
}

pub fn datetime_to_excel_serial(datetime: NaiveDateTime) -> f64 {
    date_to_excel_serial(datetime.date()) + time_to_excel_serial(datetime.time())
}

pub fn time_to_excel_serial(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

/// Cell for a spreadsheet date/time serial. Serials below one day are
/// times of day, whole serials are dates, everything else keeps its time.
pub fn serial_cell(serial: f64) -> Cell {
    let Some(datetime) = excel_serial_to_datetime(serial) else {
        return Cell::Number(serial);
    };
    if datetime.date() == excel_epoch() {
        Cell::Time(datetime.time())
    } else if datetime.time() == NaiveTime::default() {
        Cell::Date(datetime.date())
    } else {
        Cell::DateTime(datetime)
    }
}

/// ISO text as stored by some writers; a bare date stays a date
pub fn iso_cell(text: &str) -> Cell {
    let trimmed = text.trim();
    if let Some(datetime) =
        DATETIME_FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(trimmed, f).ok())
    {
        return if datetime.time() == NaiveTime::default() { Cell::Date(datetime.date()) } else { Cell::DateTime(datetime) };
    }
    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f") {
        return Cell::Time(time);
    }
    parse_date_text(trimmed).map_or_else(|| Cell::Text(text.to_string()), Cell::Date)
}

pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn coerce_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date_text(s),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Empty | Cell::Bool(_) | Cell::Time(_) => None,
    }
}

/// Numeric coercion: anything unparseable or non-finite is 0
pub fn coerce_number(cell: &Cell) -> f64 {
    let n = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Cell::Bool(b) => f64::from(u8::from(*b)),
        Cell::Empty | Cell::Date(_) | Cell::DateTime(_) | Cell::Time(_) => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

pub fn coerce_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn coerce(spec: &ColumnSpec, cell: &Cell) -> Option<Value> {
    Some(match spec.ty {
        ColumnType::Date => Value::Date(coerce_date(cell)?),
        ColumnType::Text => Value::Text(coerce_text(cell)),
        ColumnType::Real => Value::Real(coerce_number(cell)),
        ColumnType::Integer => Value::Integer(coerce_number(cell).trunc() as i64),
    })
}

/// Build the canonical table for `kind` out of an arbitrary raw table
pub fn normalize(raw: &RawTable, kind: RecordKind) -> CanonicalTable {
    let columns = kind.columns();
    let positions: Vec<Option<usize>> =
        columns.iter().map(|spec| raw.find_column(|h| spec.matches(h))).collect();

    let missing_columns: Vec<&'static str> = columns
        .iter()
        .zip(&positions)
        .filter(|(spec, pos)| spec.persisted && pos.is_none())
        .map(|(spec, _)| spec.name)
        .collect();

    let mut rows = Vec::with_capacity(raw.rows.len());
    let mut dropped_rows = 0;
    for row in 0..raw.rows.len() {
        let values: Option<Vec<Value>> = columns
            .iter()
            .zip(&positions)
            .map(|(spec, pos)| match pos {
                Some(col) => coerce(spec, raw.cell(row, *col)),
                None => spec.default_value(),
            })
            .collect();
        match values {
            Some(mut values) => {
                if kind == RecordKind::Run {
                    refresh_pace(&mut values);
                }
                rows.push(values);
            }
            None => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        debug!(%kind, dropped_rows, "Dropped rows without a valid date");
    }

    CanonicalTable { kind, rows, missing_columns, dropped_rows }
}

/// Canonical rows decoded into records with their derived fields refreshed
pub fn normalize_records<R: Record>(raw: &RawTable) -> (Vec<R>, CanonicalTable) {
    let canonical = normalize(raw, R::KIND);
    for column in &canonical.missing_columns {
        warn!(kind = %R::KIND, column, "Column missing from stored history, using defaults");
    }
    let mut records: Vec<R> = canonical.clone().into_records();
    records.iter_mut().for_each(R::refresh_derived);
    (records, canonical)
}

/// Stored pace is never trusted
fn refresh_pace(values: &mut [Value]) {
    let kind = RecordKind::Run;
    let (Some(distance), Some(duration), Some(pace)) = (
        kind.position(schema::DISTANCE_KM),
        kind.position(schema::DURATION_MIN),
        kind.position(schema::AVG_PACE),
    ) else {
        return;
    };
    let computed = metrics::pace_min_per_km(values[distance].as_real(), values[duration].as_real());
    values[pace] = Value::Real(computed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunRecord, StrengthSet};

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn raw(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable { headers: headers.iter().map(|h| h.to_string()).collect(), rows }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn serials_keep_their_time_of_day() {
        let rest = NaiveTime::from_hms_opt(0, 1, 30).unwrap();
        let evening = d(2024, 1, 5).and_hms_opt(18, 30, 0).unwrap();
        assert_eq!(serial_cell(time_to_excel_serial(rest)), Cell::Time(rest));
        assert_eq!(serial_cell(datetime_to_excel_serial(evening)), Cell::DateTime(evening));
        assert_eq!(serial_cell(45296.0), Cell::Date(d(2024, 1, 5)));
        assert_eq!(serial_cell(-3.0), Cell::Number(-3.0));
        assert_eq!(coerce_date(&Cell::DateTime(evening)), Some(d(2024, 1, 5)));
        assert_eq!(coerce_date(&Cell::Time(rest)), None);
    }

    #[test]
    fn slashed_dates_are_day_first() {
        assert_eq!(parse_date_text("05/01/2024"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_text("13/02/2024"), Some(d(2024, 2, 13)));
        assert_eq!(parse_date_text("02/13/2024"), None);
    }

    #[test]
    fn missing_columns_are_synthesized_in_canonical_order() {
        let table = raw(
            &["Reps", "Exercise", "Date", "Comment"],
            vec![vec![Cell::Number(5.0), text("Squat"), text("2024-01-05"), text("felt good")]],
        );
        let canonical = normalize(&table, RecordKind::Strength);
        assert_eq!(canonical.missing_columns, vec!["Weight", "Effort"]);
        assert_eq!(
            canonical.rows[0],
            vec![
                Value::Date(d(2024, 1, 5)),
                Value::Text("Squat".into()),
                Value::Real(0.0),
                Value::Integer(5),
                Value::Integer(0),
                Value::Real(0.0),
            ]
        );
    }

    #[test]
    fn rows_with_unparseable_dates_are_dropped() {
        let table = raw(
            &["Date", "Exercise"],
            vec![
                vec![text("not a date"), text("Squat")],
                vec![Cell::Empty, text("Bench")],
                vec![text("05/01/2024"), text("Row")],
            ],
        );
        let canonical = normalize(&table, RecordKind::Strength);
        assert_eq!(canonical.dropped_rows, 2);
        assert_eq!(canonical.rows.len(), 1);
        assert_eq!(canonical.rows[0][0], Value::Date(d(2024, 1, 5)));
    }

    #[test]
    fn numbers_are_coerced_and_integers_truncated() {
        let table = raw(
            &["Date", "Exercise", "Weight", "Reps", "Effort"],
            vec![vec![text("2024-01-05 18:30:00"), text("Squat"), text("abc"), text("7.9"), text("inf")]],
        );
        let (records, _) = normalize_records::<StrengthSet>(&table);
        let set = &records[0];
        assert_eq!(set.date, d(2024, 1, 5));
        assert_eq!(set.weight, 0.0);
        assert_eq!(set.reps, 7);
        assert_eq!(set.effort, 0);
        assert_eq!(set.performance, 0.0);
    }

    #[test]
    fn spreadsheet_serials_and_date_cells_parse() {
        assert_eq!(coerce_date(&Cell::Number(45296.0)), Some(d(2024, 1, 5)));
        assert_eq!(coerce_date(&Cell::Date(d(2023, 2, 1))), Some(d(2023, 2, 1)));
        assert_eq!(coerce_date(&Cell::Number(-3.0)), None);
        assert_eq!(date_to_excel_serial(d(2024, 1, 5)), 45296.0);
    }

    #[test]
    fn stored_pace_is_recomputed() {
        let table = raw(
            &["Date", "RunType", "DistanceKm", "DurationMin", "AvgPaceMinPerKm", "AvgHeartRateBpm", "Effort", "Notes"],
            vec![
                vec![text("2024-01-05"), text("Easy"), text("5"), text("30"), text("99"), text(""), text("6"), Cell::Empty],
                vec![text("2024-01-06"), text("Easy"), text("0"), text("30"), text("4.5"), text("150"), text("6"), Cell::Empty],
            ],
        );
        let (runs, canonical) = normalize_records::<RunRecord>(&table);
        assert!(canonical.missing_columns.is_empty());
        assert_eq!(runs[0].avg_pace_min_per_km, 6.0);
        assert_eq!(runs[0].avg_heart_rate, None);
        assert_eq!(runs[1].avg_pace_min_per_km, 0.0);
        assert_eq!(runs[1].avg_heart_rate, Some(150));
    }

    #[test]
    fn legacy_italian_headers_are_accepted() {
        let table = raw(
            &["Data", "Tipo Corsa", "Distanza (km)", "Tempo (min)", "Sforzo", "Note"],
            vec![vec![text("2024-03-01"), text("Lungo"), text("10"), text("55"), text("7"), text("pioggia")]],
        );
        let (runs, canonical) = normalize_records::<RunRecord>(&table);
        assert_eq!(canonical.missing_columns, vec!["AvgPaceMinPerKm", "AvgHeartRateBpm"]);
        assert_eq!(runs[0].run_type, "Lungo");
        assert_eq!(runs[0].avg_pace_min_per_km, 5.5);
        assert_eq!(runs[0].notes, "pioggia");
    }

    #[test]
    fn missing_date_column_drops_every_row() {
        let table = raw(&["Exercise"], vec![vec![text("Squat")]]);
        let canonical = normalize(&table, RecordKind::Strength);
        assert!(canonical.rows.is_empty());
        assert_eq!(canonical.dropped_rows, 1);
        assert!(canonical.missing_columns.contains(&"Date"));
    }
}
