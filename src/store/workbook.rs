//! Multi-sheet spreadsheet container.
//!
//! The xlsx format has no partial update: saving one sheet means reading
//! every sheet, replacing the target and writing the whole workbook again.
//! [`Workbook`] exposes exactly that pair of operations and [`SheetBacking`]
//! builds the per-table merge on top, so sibling sheets cannot be dropped by
//! accident.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use tracing::debug;

use super::{write_file, Backing};
use crate::error::{Error, Result};
use crate::normalize::{
    coerce_date, date_to_excel_serial, datetime_to_excel_serial, iso_cell, serial_cell, time_to_excel_serial,
};
use crate::schema::{self, header_matches};
use crate::table::{Cell, RawTable};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const TIME_FORMAT: &str = "hh:mm:ss";

/// Every sheet of a workbook, in workbook order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheets {
    sheets: Vec<(String, RawTable)>,
}

impl Sheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawTable)> + '_ {
        self.sheets.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Replace the sheet called `name`, keeping its position, or append it
    pub fn insert(&mut self, name: &str, table: RawTable) {
        match self.sheets.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = table,
            None => self.sheets.push((name.to_string(), table)),
        }
    }

    /// Rewrite every `Date` column as pure calendar dates; cells that do
    /// not parse as a date are cleared
    pub fn normalize_dates(&mut self) {
        for (_, table) in &mut self.sheets {
            let Some(col) = table.find_column(|h| header_matches(h, schema::DATE, schema::DATE_ALIASES))
            else {
                continue;
            };
            for row in &mut table.rows {
                if let Some(cell) = row.get_mut(col) {
                    *cell = coerce_date(cell).map_or(Cell::Empty, Cell::Date);
                }
            }
        }
    }
}

impl FromIterator<(String, RawTable)> for Sheets {
    fn from_iter<I: IntoIterator<Item = (String, RawTable)>>(iter: I) -> Self {
        let mut sheets = Sheets::new();
        for (name, table) in iter {
            sheets.insert(&name, table);
        }
        sheets
    }
}

#[derive(Clone, Debug)]
pub struct Workbook {
    path: PathBuf,
}

impl Workbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn sheet_names(&self) -> Result<Vec<String>> {
        let book = open_workbook_auto(&self.path)?;
        Ok(book.sheet_names().to_vec())
    }

    pub fn read_sheet(&self, name: &str) -> Result<RawTable> {
        let mut book = open_workbook_auto(&self.path)?;
        if !book.sheet_names().iter().any(|n| n == name) {
            return Err(Error::SheetNotFound(name.to_string()));
        }
        let range = book.worksheet_range(name)?;
        Ok(table_from_rows(range.rows()))
    }

    pub fn read_all_tables(&self) -> Result<Sheets> {
        let mut book = open_workbook_auto(&self.path)?;
        let names = book.sheet_names().to_vec();
        let mut sheets = Sheets::new();
        for name in names {
            let range = book.worksheet_range(&name)?;
            sheets.insert(&name, table_from_rows(range.rows()));
        }
        debug!(path = %self.path.display(), sheets = sheets.len(), "Read workbook");
        Ok(sheets)
    }

    /// Serialize every sheet and replace the file in a single write
    pub fn write_all_tables(&self, sheets: &Sheets) -> Result<()> {
        let mut book = XlsxWorkbook::new();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
        let time_format = Format::new().set_num_format(TIME_FORMAT);

        for (name, table) in sheets.iter() {
            let sheet = book.add_worksheet();
            sheet.set_name(name)?;
            for (col, header) in table.headers.iter().enumerate() {
                sheet.write_string(0, col as u16, header)?;
            }
            for (r, row) in table.rows.iter().enumerate() {
                let row_num = (r + 1) as u32;
                for (c, cell) in row.iter().enumerate() {
                    let col = c as u16;
                    match cell {
                        Cell::Empty => {}
                        Cell::Text(s) => {
                            sheet.write_string(row_num, col, s)?;
                        }
                        Cell::Number(n) => {
                            sheet.write_number(row_num, col, *n)?;
                        }
                        Cell::Bool(b) => {
                            sheet.write_boolean(row_num, col, *b)?;
                        }
                        Cell::Date(d) => {
                            sheet.write_number_with_format(row_num, col, date_to_excel_serial(*d), &date_format)?;
                        }
                        Cell::DateTime(dt) => {
                            let serial = datetime_to_excel_serial(*dt);
                            sheet.write_number_with_format(row_num, col, serial, &datetime_format)?;
                        }
                        Cell::Time(t) => {
                            sheet.write_number_with_format(row_num, col, time_to_excel_serial(*t), &time_format)?;
                        }
                    }
                }
            }
        }

        let bytes = book.save_to_buffer()?;
        write_file(&self.path, &bytes)?;
        debug!(path = %self.path.display(), sheets = sheets.len(), "Wrote workbook");
        Ok(())
    }
}

fn header_text(index: usize, data: &Data) -> String {
    match cell_from_data(data) {
        Cell::Empty => format!("Unnamed: {index}"),
        cell => cell.to_string().trim().to_string(),
    }
}

/// First row is the header; fully blank rows are skipped
fn table_from_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> RawTable {
    let Some(header) = rows.next() else {
        return RawTable::default();
    };
    let mut table = RawTable::new(header.iter().enumerate().map(|(i, d)| header_text(i, d)).collect());
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(cell_from_data).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row(cells);
    }
    table
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => serial_cell(dt.as_f64()),
        Data::DateTimeIso(s) => iso_cell(s),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// One named sheet of a workbook used as a history table
#[derive(Clone, Debug)]
pub struct SheetBacking {
    workbook: Workbook,
    sheet: String,
}

impl SheetBacking {
    pub fn new(workbook: Workbook, sheet: impl Into<String>) -> Self {
        Self { workbook, sheet: sheet.into() }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

impl Backing for SheetBacking {
    fn location(&self) -> &Path {
        self.workbook.path()
    }

    fn read_table(&self) -> Result<Option<RawTable>> {
        if !self.workbook.exists() {
            return Ok(None);
        }
        self.workbook.read_sheet(&self.sheet).map(Some)
    }

    fn write_table(&self, table: RawTable) -> Result<()> {
        let mut sheets = if self.workbook.exists() {
            self.workbook.read_all_tables().map_err(|e| Error::Unreadable {
                path: self.workbook.path().to_path_buf(),
                source: Box::new(e),
            })?
        } else {
            Sheets::new()
        };
        sheets.insert(&self.sheet, table);
        sheets.normalize_dates();
        self.workbook.write_all_tables(&sheets)
    }
}
