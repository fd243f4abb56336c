//! Single-table CSV store. One logical table, so saving is a full overwrite.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use super::{write_file, Backing};
use crate::error::{Error, Result};
use crate::table::{Cell, RawTable};

#[derive(Clone, Debug)]
pub struct FlatFile {
    path: PathBuf,
}

impl FlatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn field(cell: &Cell) -> String {
    match cell {
        Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        other => other.to_string(),
    }
}

impl Backing for FlatFile {
    fn location(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<Option<RawTable>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::EmptyStore { path: self.path.clone() });
        }

        let mut table = RawTable::new(headers);
        for record in reader.records() {
            let record = record?;
            let cells: Vec<Cell> = record
                .iter()
                .map(|f| if f.trim().is_empty() { Cell::Empty } else { Cell::Text(f.to_string()) })
                .collect();
            if cells.iter().all(Cell::is_empty) {
                continue;
            }
            table.push_row(cells);
        }
        Ok(Some(table))
    }

    fn write_table(&self, table: RawTable) -> Result<()> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row.iter().map(field))?;
        }
        let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        write_file(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn dates_are_written_as_iso_and_blanks_as_empty_fields() {
        let dir = TempDir::new().unwrap();
        let store = FlatFile::new(dir.path().join("runs.csv"));
        let mut table = RawTable::new(vec!["Date".into(), "AvgHeartRateBpm".into(), "Notes".into()]);
        table.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            Cell::Empty,
            Cell::Text("windy, cold".into()),
        ]);
        store.write_table(table).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Date,AvgHeartRateBpm,Notes", "2024-01-05,,\"windy, cold\""]);

        let read = store.read_table().unwrap().unwrap();
        assert_eq!(read.rows[0][1], Cell::Empty);
        assert_eq!(read.rows[0][2], Cell::Text("windy, cold".into()));
    }

    #[test]
    fn empty_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs.csv");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(FlatFile::new(path).read_table(), Err(Error::EmptyStore { .. })));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(FlatFile::new(dir.path().join("nope.csv")).read_table().unwrap().is_none());
    }
}
