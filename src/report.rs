//! Read-only projections of the loaded histories for trend views and the
//! deletion picker.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::models::{Record, RunRecord, StrengthSet};
use crate::table::{RowId, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrengthMetric {
    Weight,
    Performance,
    Reps,
    Effort,
}

impl StrengthMetric {
    pub const ALL: [StrengthMetric; 4] =
        [StrengthMetric::Weight, StrengthMetric::Performance, StrengthMetric::Reps, StrengthMetric::Effort];

    pub fn label(self) -> &'static str {
        match self {
            StrengthMetric::Weight => "Weight lifted (kg)",
            StrengthMetric::Performance => "Volume (weight x reps x effort)",
            StrengthMetric::Reps => "Reps",
            StrengthMetric::Effort => "Effort (RPE)",
        }
    }

    fn value(self, set: &StrengthSet) -> f64 {
        match self {
            StrengthMetric::Weight => set.weight,
            StrengthMetric::Performance => set.performance,
            StrengthMetric::Reps => f64::from(set.reps),
            StrengthMetric::Effort => f64::from(set.effort),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMetric {
    Distance,
    Duration,
    Pace,
    HeartRate,
    Effort,
}

impl RunMetric {
    pub const ALL: [RunMetric; 5] =
        [RunMetric::Distance, RunMetric::Duration, RunMetric::Pace, RunMetric::HeartRate, RunMetric::Effort];

    pub fn label(self) -> &'static str {
        match self {
            RunMetric::Distance => "Distance (km)",
            RunMetric::Duration => "Duration (min)",
            RunMetric::Pace => "Average pace (min/km)",
            RunMetric::HeartRate => "Average heart rate (bpm)",
            RunMetric::Effort => "Effort (RPE)",
        }
    }

    /// Pace improves as it goes down, so its axis is drawn inverted
    pub fn lower_is_better(self) -> bool {
        self == RunMetric::Pace
    }

    /// Zero means "not measured" for these, not a real sample
    fn skips_zero(self) -> bool {
        matches!(self, RunMetric::Pace | RunMetric::HeartRate)
    }

    fn value(self, run: &RunRecord) -> f64 {
        match self {
            RunMetric::Distance => run.distance_km,
            RunMetric::Duration => run.duration_min,
            RunMetric::Pace => run.avg_pace_min_per_km,
            RunMetric::HeartRate => run.avg_heart_rate.map_or(0.0, f64::from),
            RunMetric::Effort => f64::from(run.effort),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

fn sorted_points(mut points: Vec<TrendPoint>) -> Vec<TrendPoint> {
    points.sort_by_key(|p| p.date);
    points
}

pub fn exercises_with_data(rows: &[StrengthSet]) -> Vec<String> {
    rows.iter()
        .map(|r| r.exercise.clone())
        .filter(|e| !e.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn run_types(rows: &[RunRecord]) -> Vec<String> {
    rows.iter()
        .map(|r| r.run_type.clone())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn strength_trend(rows: &[StrengthSet], exercise: &str, metric: StrengthMetric) -> Vec<TrendPoint> {
    sorted_points(
        rows.iter()
            .filter(|r| r.exercise == exercise)
            .map(|r| TrendPoint { date: r.date, value: metric.value(r) })
            .collect(),
    )
}

/// Points for `metric`, optionally restricted to one run type
pub fn run_trend(rows: &[RunRecord], run_type: Option<&str>, metric: RunMetric) -> Vec<TrendPoint> {
    sorted_points(
        rows.iter()
            .filter(|r| run_type.map_or(true, |t| r.run_type == t))
            .map(|r| TrendPoint { date: r.date, value: metric.value(r) })
            .filter(|p| !(metric.skips_zero() && p.value <= 0.0))
            .collect(),
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListingEntry {
    pub id: RowId,
    pub label: String,
}

/// The `limit` most recent rows, newest first, labelled with their identity
pub fn deletion_listing<R: Record>(table: &Table<R>, limit: usize) -> Vec<ListingEntry> {
    let mut rows: Vec<(RowId, &R)> = table.identified().collect();
    rows.sort_by(|(a_id, a), (b_id, b)| b.date().cmp(&a.date()).then(b_id.index().cmp(&a_id.index())));
    rows.into_iter()
        .take(limit)
        .map(|(id, row)| ListingEntry {
            id,
            label: format!("{id} | {} | {}", row.date().format("%Y-%m-%d"), row.summary()),
        })
        .collect()
}

/// `mm:ss` per kilometre; seconds are truncated
pub fn format_pace(pace_min_per_km: f64) -> String {
    if !pace_min_per_km.is_finite() || pace_min_per_km <= 0.0 {
        return "--:--".to_string();
    }
    let minutes = pace_min_per_km.trunc();
    let seconds = ((pace_min_per_km - minutes) * 60.0).trunc();
    format!("{:02}:{:02}", minutes as u64, seconds as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn run(day: u32, run_type: &str, distance_km: f64, heart_rate: Option<u32>) -> RunRecord {
        let mut r = RunRecord {
            date: d(day),
            run_type: run_type.into(),
            distance_km,
            duration_min: 30.0,
            avg_pace_min_per_km: 0.0,
            avg_heart_rate: heart_rate,
            effort: 6,
            notes: String::new(),
        };
        r.refresh_derived();
        r
    }

    #[test]
    fn strength_trend_is_sorted_by_date() {
        let rows = vec![
            StrengthSet::new(d(9), "Squat", 105.0, 5, 8),
            StrengthSet::new(d(2), "Squat", 100.0, 5, 8),
            StrengthSet::new(d(4), "Bench", 80.0, 5, 8),
        ];
        let points = strength_trend(&rows, "Squat", StrengthMetric::Weight);
        assert_eq!(points, vec![TrendPoint { date: d(2), value: 100.0 }, TrendPoint { date: d(9), value: 105.0 }]);
        assert_eq!(exercises_with_data(&rows), vec!["Bench", "Squat"]);
    }

    #[test]
    fn unmeasured_heart_rate_and_pace_are_left_out() {
        let rows = vec![run(1, "Easy", 5.0, None), run(2, "Tempo", 6.0, Some(160)), run(3, "Easy", 0.0, Some(150))];
        let hr = run_trend(&rows, None, RunMetric::HeartRate);
        assert_eq!(hr.iter().map(|p| p.value).collect::<Vec<_>>(), vec![160.0, 150.0]);
        let pace = run_trend(&rows, Some("Easy"), RunMetric::Pace);
        assert_eq!(pace, vec![TrendPoint { date: d(1), value: 6.0 }]);
        let distance = run_trend(&rows, Some("Easy"), RunMetric::Distance);
        assert_eq!(distance.len(), 2);
        assert_eq!(run_types(&rows), vec!["Easy", "Tempo"]);
    }

    #[test]
    fn listing_is_newest_first_and_carries_load_positions() {
        let table = Table::new(
            vec![
                StrengthSet::new(d(2), "Squat", 100.0, 5, 8),
                StrengthSet::new(d(9), "Bench", 80.0, 8, 7),
                StrengthSet::new(d(2), "Row", 60.5, 10, 6),
            ],
            7,
        );
        let listing = deletion_listing(&table, 2);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, table.id(1).unwrap());
        assert_eq!(listing[0].label, "ID:1 | 2024-01-09 | Bench | 80kg x 8 reps | RPE:7");
        assert_eq!(listing[1].label, "ID:2 | 2024-01-02 | Row | 60.5kg x 10 reps | RPE:6");
    }

    #[test]
    fn pace_formats_as_minutes_and_seconds() {
        assert_eq!(format_pace(6.0), "06:00");
        assert_eq!(format_pace(6.5), "06:30");
        assert_eq!(format_pace(4.25), "04:15");
        assert_eq!(format_pace(0.0), "--:--");
    }
}
