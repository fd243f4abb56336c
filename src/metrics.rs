//! Derived fields and personal records

use crate::models::StrengthSet;

/// `weight * reps * effort`
pub fn performance(weight: f64, reps: u32, effort: u8) -> f64 {
    let value = weight * f64::from(reps) * f64::from(effort);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Minutes per kilometre, or 0 unless both inputs are positive
pub fn pace_min_per_km(distance_km: f64, duration_min: f64) -> f64 {
    if distance_km > 0.0 && duration_min > 0.0 {
        let pace = duration_min / distance_km;
        if pace.is_finite() {
            return pace;
        }
    }
    0.0
}

/// Overwrites every performance value with the one derived from the row
pub fn recompute_performance(rows: &mut [StrengthSet]) {
    for row in rows {
        row.performance = performance(row.weight, row.reps, row.effort);
    }
}

/// Best performance logged for `exercise`, if any
pub fn best_performance(rows: &[StrengthSet], exercise: &str) -> Option<f64> {
    rows.iter()
        .filter(|r| r.exercise == exercise)
        .map(|r| r.performance)
        .fold(None, |best, p| Some(best.map_or(p, |b: f64| b.max(p))))
}

/// A value is a personal record when nothing was logged for the exercise yet
/// or it beats the best so far. Ties do not count.
pub fn is_personal_record(rows: &[StrengthSet], exercise: &str, candidate: f64) -> bool {
    best_performance(rows, exercise).map_or(true, |best| candidate > best)
}
