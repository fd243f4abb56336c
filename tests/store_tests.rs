use chrono::NaiveDate;
use tempfile::TempDir;

use training_log::store::{self, FlatFile, LoadStatus, SheetBacking, Workbook};
use training_log::table::{Cell, RawTable};
use training_log::{RunRecord, StrengthSet};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

#[test]
fn legacy_run_csv_is_read_and_rewritten_canonically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("running_history.csv");
    std::fs::write(
        &path,
        "Data,Tipo Corsa,Distanza (km),Tempo (min),Passo Medio (min/km),Battiti Medi (BPM),Sforzo,Note\n\
         2024-03-01,Lungo,12,72,99,150,7,Pioggia\n\
         not a date,Easy,5,30,6,140,5,\n\
         03/04/2024,Ripetute,8.5,40.5,0,,8,\n",
    )
    .unwrap();
    let flat = FlatFile::new(&path);

    let loaded = store::load::<RunRecord>(&flat);
    assert_eq!(loaded.status, LoadStatus::Loaded);
    assert_eq!(loaded.rows.len(), 2);
    let long = &loaded.rows[0];
    assert_eq!(long.date, date(1));
    assert_eq!(long.run_type, "Lungo");
    assert_eq!(long.avg_pace_min_per_km, 6.0);
    assert_eq!(long.avg_heart_rate, Some(150));
    assert_eq!(long.notes, "Pioggia");
    assert_eq!(loaded.rows[1].avg_heart_rate, None);

    store::save(&loaded.rows, &flat).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines[0],
        "Date,RunType,DistanceKm,DurationMin,AvgPaceMinPerKm,AvgHeartRateBpm,Effort,Notes"
    );
    assert_eq!(lines[1], "2024-03-01,Lungo,12,72,6,150,7,Pioggia");
    assert_eq!(lines.len(), 3);

    let again = store::load::<RunRecord>(&flat);
    assert_eq!(again.rows, loaded.rows);
}

#[test]
fn empty_csv_is_reported_as_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("running_history.csv");
    std::fs::write(&path, "").unwrap();

    let loaded = store::load::<RunRecord>(&FlatFile::new(&path));
    assert!(loaded.status.is_corrupt());
    assert!(loaded.rows.is_empty());
}

#[test]
fn missing_stores_load_empty() {
    let dir = TempDir::new().unwrap();
    let flat = FlatFile::new(dir.path().join("nope.csv"));
    let sheet = SheetBacking::new(Workbook::new(dir.path().join("nope.xlsx")), "History");

    assert_eq!(store::load::<RunRecord>(&flat).status, LoadStatus::Missing);
    assert_eq!(store::load::<StrengthSet>(&sheet).status, LoadStatus::Missing);
}

#[test]
fn garbage_workbook_loads_empty_and_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("program.xlsx");
    std::fs::write(&path, b"PK but not really").unwrap();

    let loaded = store::load::<StrengthSet>(&SheetBacking::new(Workbook::new(&path), "History"));
    assert!(loaded.status.is_corrupt());
    assert!(loaded.rows.is_empty());
}

#[test]
fn legacy_strength_sheet_is_normalized_on_load() {
    let dir = TempDir::new().unwrap();
    let workbook = Workbook::new(dir.path().join("program.xlsx"));
    let mut legacy = RawTable::new(
        ["Data", "Esercizio", "Peso", "Ripetizioni", "Sforzo", "Performance"].map(String::from).to_vec(),
    );
    legacy.push_row(vec![Cell::Date(date(2)), text("Squat"), Cell::Number(100.0), Cell::Number(5.9), Cell::Number(8.0), Cell::Number(1.0)]);
    legacy.push_row(vec![text("2024-03-03 18:30:00"), text("Bench"), text("heavy"), Cell::Number(8.0), Cell::Number(7.0)]);
    legacy.push_row(vec![Cell::Empty, text("Row"), Cell::Number(60.0), Cell::Number(10.0), Cell::Number(6.0)]);
    let sheets = [("History".to_string(), legacy)].into_iter().collect();
    workbook.write_all_tables(&sheets).unwrap();

    let backing = SheetBacking::new(workbook.clone(), "History");
    let loaded = store::load::<StrengthSet>(&backing);
    assert_eq!(loaded.status, LoadStatus::Loaded);
    assert_eq!(loaded.rows.len(), 2);

    let squat = &loaded.rows[0];
    assert_eq!(squat.date, date(2));
    assert_eq!(squat.reps, 5);
    assert_eq!(squat.performance, 4000.0);

    let bench = &loaded.rows[1];
    assert_eq!(bench.date, date(3));
    assert_eq!(bench.weight, 0.0);
    assert_eq!(bench.performance, 0.0);

    store::save(&loaded.rows, &backing).unwrap();
    let stored = workbook.read_sheet("History").unwrap();
    assert_eq!(stored.headers, vec!["Date", "Exercise", "Weight", "Reps", "Effort"]);
    assert_eq!(stored.rows.len(), 2);
    assert_eq!(stored.rows[1][0], Cell::Date(date(3)));
}

#[test]
fn saving_one_sheet_renormalizes_dates_in_its_siblings() {
    let dir = TempDir::new().unwrap();
    let workbook = Workbook::new(dir.path().join("program.xlsx"));
    let mut sibling = RawTable::new(vec!["Date".into(), "Weight".into()]);
    sibling.push_row(vec![text("2024-03-05 07:00:00"), Cell::Number(81.5)]);
    let mut day = RawTable::new(vec!["Exercise".into(), "Sets".into()]);
    day.push_row(vec![text("Squat"), Cell::Number(4.0)]);
    let sheets = [("Bodyweight".to_string(), sibling), ("Day 1".to_string(), day.clone())]
        .into_iter()
        .collect();
    workbook.write_all_tables(&sheets).unwrap();

    let rows = vec![StrengthSet::new(date(6), "Squat", 100.0, 5, 8)];
    store::save(&rows, &SheetBacking::new(workbook.clone(), "History")).unwrap();

    let after = workbook.read_all_tables().unwrap();
    assert_eq!(after.names().collect::<Vec<_>>(), vec!["Bodyweight", "Day 1", "History"]);
    assert_eq!(after.get("Bodyweight").unwrap().rows[0], vec![Cell::Date(date(5)), Cell::Number(81.5)]);
    assert_eq!(after.get("Day 1"), Some(&day));
}

#[test]
fn times_in_sibling_sheets_survive_a_history_save() {
    let dir = TempDir::new().unwrap();
    let workbook = Workbook::new(dir.path().join("program.xlsx"));
    let rest = chrono::NaiveTime::from_hms_opt(0, 1, 30).unwrap();
    let last_done = date(5).and_hms_opt(18, 30, 0).unwrap();
    let mut day = RawTable::new(vec!["Exercise".into(), "Rest".into(), "Last done".into()]);
    day.push_row(vec![text("Squat"), Cell::Time(rest), Cell::DateTime(last_done)]);
    let sheets = [("Day 1".to_string(), day.clone())].into_iter().collect();
    workbook.write_all_tables(&sheets).unwrap();
    assert_eq!(workbook.read_sheet("Day 1").unwrap(), day);

    let rows = vec![StrengthSet::new(date(6), "Squat", 100.0, 5, 8)];
    store::save(&rows, &SheetBacking::new(workbook.clone(), "History")).unwrap();

    let after = workbook.read_sheet("Day 1").unwrap();
    assert_eq!(after.rows[0], vec![text("Squat"), Cell::Time(rest), Cell::DateTime(last_done)]);
}

#[test]
fn strength_history_round_trips_through_the_workbook() {
    let dir = TempDir::new().unwrap();
    let backing = SheetBacking::new(Workbook::new(dir.path().join("program.xlsx")), "History");
    let rows = vec![
        StrengthSet::new(date(1), "Squat", 102.5, 5, 8),
        StrengthSet::new(date(2), "", 0.0, 1, 1),
        StrengthSet::new(date(2), "Row", 61.25, 12, 6),
        StrengthSet::new(date(31), "Bench", 80.0, 8, 10),
    ];

    store::save(&rows, &backing).unwrap();
    let loaded = store::load::<StrengthSet>(&backing);
    assert_eq!(loaded.status, LoadStatus::Loaded);
    assert_eq!(loaded.rows, rows);

    store::save(&loaded.rows, &backing).unwrap();
    assert_eq!(store::load::<StrengthSet>(&backing).rows, rows);
}
