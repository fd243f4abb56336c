//! Raw and canonical tables, plus the session-scoped row identities.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::models::Record;

/// A cell as it comes out of (or goes into) a backing container
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Time of day with no date part, such as a rest interval
    Time(NaiveTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

static EMPTY: Cell = Cell::Empty;

/// Untyped table: a header row and whatever cells followed it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column whose header satisfies `pred`
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| pred(h))
    }

    /// Cell at `(row, col)`; short rows read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }
}

/// Positional identity of a row within one load of a history table.
///
/// Identities are only meaningful against the table they were issued by:
/// the generation records which load that was, so an identity kept across
/// a reload is rejected instead of silently pointing at a different row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId {
    generation: u64,
    index: usize,
}

impl RowId {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID:{}", self.index)
    }
}

/// Canonical table of one record kind, stamped with its load generation
#[derive(Clone, Debug)]
pub struct Table<R> {
    rows: Vec<R>,
    generation: u64,
}

impl<R: Record> Table<R> {
    pub fn new(rows: Vec<R>, generation: u64) -> Self {
        Self { rows, generation }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn id(&self, index: usize) -> Option<RowId> {
        (index < self.rows.len()).then_some(RowId { generation: self.generation, index })
    }

    pub fn get(&self, id: RowId) -> Option<&R> {
        if id.generation != self.generation {
            return None;
        }
        self.rows.get(id.index)
    }

    /// True when `id` was issued by this exact load
    pub fn is_current(&self, id: RowId) -> bool {
        id.generation == self.generation && id.index < self.rows.len()
    }

    pub fn identified(&self) -> impl Iterator<Item = (RowId, &R)> + '_ {
        let generation = self.generation;
        self.rows.iter().enumerate().map(move |(index, row)| (RowId { generation, index }, row))
    }

    pub(crate) fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Rows that survive removing `ids`, in their original order.
    ///
    /// Every identity must come from this exact load; the table itself is
    /// left untouched so a failed save can keep it as the source of truth.
    pub fn without(&self, ids: &BTreeSet<RowId>) -> Result<Vec<R>> {
        for id in ids {
            if id.generation != self.generation {
                return Err(Error::StaleIdentity(*id));
            }
            if id.index >= self.rows.len() {
                return Err(Error::UnknownIdentity(*id));
            }
        }
        let doomed: BTreeSet<usize> = ids.iter().map(|id| id.index).collect();
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter(|(index, _)| !doomed.contains(index))
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrengthSet;

    fn set(exercise: &str) -> StrengthSet {
        StrengthSet::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), exercise, 100.0, 5, 8)
    }

    fn table() -> Table<StrengthSet> {
        Table::new(vec![set("Squat"), set("Bench"), set("Row")], 3)
    }

    #[test]
    fn without_keeps_unselected_rows_in_order() {
        let t = table();
        let ids: BTreeSet<_> = [t.id(0).unwrap(), t.id(2).unwrap()].into_iter().collect();
        let rest = t.without(&ids).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].exercise, "Bench");
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn identities_from_another_load_are_stale() {
        let old = table();
        let stale = old.id(1).unwrap();
        let reloaded = Table::new(old.rows().to_vec(), 4);
        let err = reloaded.without(&[stale].into_iter().collect()).unwrap_err();
        assert!(matches!(err, Error::StaleIdentity(id) if id == stale));
        assert!(reloaded.get(stale).is_none());
    }

    #[test]
    fn out_of_range_identity_is_rejected() {
        let t = table();
        let bogus = RowId { generation: 3, index: 7 };
        assert!(matches!(t.without(&[bogus].into_iter().collect()), Err(Error::UnknownIdentity(_))));
        assert!(t.id(3).is_none());
    }

    #[test]
    fn only_identities_of_this_load_are_current() {
        let old = table();
        let kept = old.id(2).unwrap();
        assert!(old.is_current(kept));
        assert!(!old.is_current(RowId { generation: 3, index: 3 }));

        let reloaded = Table::new(old.rows().to_vec(), 4);
        let mut marked: BTreeSet<RowId> = [kept, reloaded.id(0).unwrap()].into_iter().collect();
        marked.retain(|id| reloaded.is_current(*id));
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![reloaded.id(0).unwrap()]);
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let mut raw = RawTable::new(vec!["A".into(), "B".into()]);
        raw.push_row(vec![Cell::Text("x".into())]);
        assert_eq!(raw.cell(0, 1), &Cell::Empty);
        assert_eq!(raw.cell(5, 0), &Cell::Empty);
    }
}
