use tracing::warn;

use crate::config::AppConfig;
use crate::error::Result;
use crate::normalize::coerce_text;
use crate::schema::{header_matches, EXERCISE, EXERCISE_ALIASES};
use crate::store::Workbook;
use crate::table::RawTable;

const WEIGHTS_COLUMNS: &[&str] = &["Exercise", "Sets", "Reps", "Rest", "Notes"];
const RUNNING_COLUMNS: &[&str] = &["Type", "Goal", "Duration", "Intensity", "Notes", "Exercise"];

#[derive(Clone, Debug, PartialEq)]
pub enum DayKind {
    Weights { exercises: Vec<String> },
    Running,
}

/// One program sheet, read-only
#[derive(Clone, Debug)]
pub struct ProgramDay {
    pub name: String,
    pub group: Option<String>,
    pub kind: DayKind,
    pub table: RawTable,
}

impl ProgramDay {
    pub fn is_running_day(&self) -> bool {
        self.kind == DayKind::Running
    }

    pub fn exercises(&self) -> &[String] {
        match &self.kind {
            DayKind::Weights { exercises } => exercises,
            DayKind::Running => &[],
        }
    }

    /// Indices of the columns worth showing for this kind of day; every
    /// column when none of the preferred ones is present
    pub fn display_columns(&self) -> Vec<usize> {
        let preferred = if self.is_running_day() { RUNNING_COLUMNS } else { WEIGHTS_COLUMNS };
        let picked: Vec<usize> = preferred
            .iter()
            .filter_map(|name| self.table.find_column(|h| h.trim().eq_ignore_ascii_case(name)))
            .collect();
        let has_anchor = if self.is_running_day() {
            !picked.is_empty()
        } else {
            self.table.find_column(|h| h.trim().eq_ignore_ascii_case(EXERCISE)).is_some()
        };
        if has_anchor {
            picked
        } else {
            (0..self.table.headers.len()).collect()
        }
    }
}

/// Distinct, non-empty exercise names in sheet order
pub fn exercises_of(table: &RawTable) -> Vec<String> {
    let Some(col) = table.find_column(|h| header_matches(h, EXERCISE, EXERCISE_ALIASES)) else {
        return Vec::new();
    };
    let mut seen = Vec::new();
    for name in table.column(col).map(coerce_text) {
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// The program workbook seen as a list of days
#[derive(Clone, Debug)]
pub struct ProgramBook {
    workbook: Workbook,
    config: AppConfig,
}

impl ProgramBook {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            workbook: Workbook::new(&config.program_file),
            config: config.clone(),
        }
    }

    /// Every sheet except the strength history; empty if the workbook does not exist yet
    pub fn day_names(&self) -> Result<Vec<String>> {
        if !self.workbook.exists() {
            warn!(path = %self.workbook.path().display(), "Program workbook not found");
            return Ok(Vec::new());
        }
        Ok(self
            .workbook
            .sheet_names()?
            .into_iter()
            .filter(|name| !name.eq_ignore_ascii_case(&self.config.history_sheet))
            .collect())
    }

    pub fn day(&self, name: &str) -> Result<ProgramDay> {
        let table = self.workbook.read_sheet(name)?;
        let group = self.config.group_for(name).map(str::to_string);
        let kind = if group.as_deref() == Some(self.config.running_group.as_str()) {
            DayKind::Running
        } else {
            let exercises = exercises_of(&table);
            if exercises.is_empty() {
                warn!(day = name, "Program day lists no exercises");
            }
            DayKind::Weights { exercises }
        };
        Ok(ProgramDay { name: name.to_string(), group, kind, table })
    }
}
