use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use eframe::{egui, App, CreationContext, Frame};
use egui::{Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, DatePickerButton, TableBuilder};
use tracing::{error, info};

use training_log::notes::NoteSaved;
use training_log::report::{self, RunMetric, StrengthMetric};
use training_log::routines::ProgramDay;
use training_log::{logging, AppConfig, DeleteOutcome, LoadStatus, NewRun, NewSet, RecordKind, RowId, Session};

const MAX_MESSAGES: usize = 6;

fn main() -> Result<(), eframe::Error> {
    let (config, config_error) = match AppConfig::resolve() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e.to_string())),
    };
    logging::init(&config.log_level);
    if let Some(e) = &config_error {
        error!(error = %e, "Configuration file rejected, using defaults");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 820.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Training Log",
        options,
        Box::new(move |cc| Ok(Box::new(TrainingApp::new(cc, config, config_error)))),
    )
}

#[derive(PartialEq, Clone, Copy)]
enum DisplayMode {
    Program,
    Log,
    Trends,
    Records,
}

#[derive(Clone, Copy)]
enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn color(self) -> Color32 {
        match self {
            Level::Info => Color32::LIGHT_BLUE,
            Level::Success => Color32::from_rgb(129, 199, 132),
            Level::Warning => Color32::from_rgb(255, 183, 77),
            Level::Error => Color32::from_rgb(229, 115, 115),
        }
    }
}

struct SetForm {
    exercise: String,
    weight: f64,
    reps: u32,
    effort: u8,
}

struct RunForm {
    run_type: String,
    distance_km: f64,
    duration_min: f64,
    heart_rate: u32,
    effort: u8,
    notes: String,
}

struct TrainingApp {
    session: Session,
    day_names: Vec<String>,
    selected_day: Option<String>,
    day: Option<ProgramDay>,
    note_draft: String,
    display_mode: DisplayMode,
    entry_date: NaiveDate,
    set_form: SetForm,
    run_form: RunForm,
    trend_kind: RecordKind,
    trend_exercise: Option<String>,
    strength_metric: StrengthMetric,
    trend_run_type: Option<String>,
    run_metric: RunMetric,
    delete_kind: RecordKind,
    delete_limit: usize,
    marked: BTreeSet<RowId>,
    messages: Vec<(Level, String)>,
}

fn group_color(group: &str) -> Color32 {
    match group.split_whitespace().next() {
        Some("Upper") => Color32::from_rgb(229, 115, 115),
        Some("Lower") => Color32::from_rgb(129, 199, 132),
        Some("Cardio") => Color32::from_rgb(100, 181, 246),
        Some("HIIT") => Color32::from_rgb(255, 183, 77),
        Some("Run") => Color32::from_rgb(186, 104, 200),
        _ => Color32::from_gray(119),
    }
}

impl TrainingApp {
    fn new(cc: &CreationContext, config: AppConfig, config_error: Option<String>) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::new(17.0, egui::FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Heading,
            egui::FontId::new(26.0, egui::FontFamily::Proportional),
        );
        cc.egui_ctx.set_style(style);

        let session = Session::open(config);
        let mut app = TrainingApp {
            session,
            day_names: Vec::new(),
            selected_day: None,
            day: None,
            note_draft: String::new(),
            display_mode: DisplayMode::Program,
            entry_date: Local::now().date_naive(),
            set_form: SetForm { exercise: String::new(), weight: 20.0, reps: 10, effort: 7 },
            run_form: RunForm {
                run_type: "Standard run".to_string(),
                distance_km: 5.0,
                duration_min: 30.0,
                heart_rate: 0,
                effort: 6,
                notes: String::new(),
            },
            trend_kind: RecordKind::Strength,
            trend_exercise: None,
            strength_metric: StrengthMetric::Weight,
            trend_run_type: None,
            run_metric: RunMetric::Distance,
            delete_kind: RecordKind::Strength,
            delete_limit: 20,
            marked: BTreeSet::new(),
            messages: Vec::new(),
        };

        if let Some(e) = config_error {
            app.push(Level::Error, format!("Configuration file rejected, using defaults: {e}"));
        }
        app.report_status("Strength history", app.session.strength().status().clone());
        app.report_status("Running history", app.session.runs().status().clone());
        match app.session.program().day_names() {
            Ok(names) if names.is_empty() => {
                app.push(Level::Warning, "No program days found in the workbook".to_string());
            }
            Ok(names) => app.day_names = names,
            Err(e) => app.push(Level::Error, format!("Cannot read program days: {e}")),
        }
        app
    }

    fn push(&mut self, level: Level, message: String) {
        self.messages.push((level, message));
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    fn report_status(&mut self, what: &str, status: LoadStatus) {
        match status {
            LoadStatus::Loaded => {}
            LoadStatus::Missing => self.push(Level::Info, format!("{what}: {status}")),
            LoadStatus::Corrupt(_) => self.push(Level::Warning, format!("{what}: {status}")),
        }
    }

    fn select_day(&mut self, name: Option<String>) {
        self.selected_day = name;
        self.day = None;
        self.note_draft.clear();
        let Some(name) = self.selected_day.clone() else {
            return;
        };
        match self.session.program().day(&name) {
            Ok(day) => {
                if let Some(group) = &day.group {
                    self.note_draft = self.session.notes().remove(group).unwrap_or_default();
                }
                if let Some(first) = day.exercises().first() {
                    self.set_form.exercise = first.clone();
                }
                info!(day = %name, "Selected program day");
                self.day = Some(day);
            }
            Err(e) => self.push(Level::Error, format!("Cannot read program day '{name}': {e}")),
        }
    }

    fn show_day_picker(&mut self, ui: &mut Ui) {
        let before = self.selected_day.clone();
        let mut choice = self.selected_day.clone();
        egui::ComboBox::from_label("Program day")
            .selected_text(choice.clone().unwrap_or_else(|| "-- Select day --".to_string()))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut choice, None, "-- Select day --");
                for name in &self.day_names {
                    ui.selectable_value(&mut choice, Some(name.clone()), name.as_str());
                }
            });
        if choice != before {
            self.select_day(choice);
        }
    }

    fn show_program_display(&mut self, ui: &mut Ui) {
        let Some(day) = &self.day else {
            ui.label("Pick a day to see its program and log a workout.");
            let program_file = self.session.config().program_file.display().to_string();
            ui.label(RichText::new(format!("Program workbook: {program_file}")).weak());
            return;
        };

        ui.label(RichText::new(format!("Program: {}", day.name)).heading().strong());
        if day.table.is_empty() {
            ui.label(format!("The sheet '{}' is empty.", day.name));
        } else {
            let columns = day.display_columns();
            ui.push_id("program_table", |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .columns(Column::auto().at_least(90.0), columns.len())
                    .header(24.0, |mut header| {
                        for &col in &columns {
                            header.col(|ui| {
                                ui.strong(day.table.headers[col].as_str());
                            });
                        }
                    })
                    .body(|mut body| {
                        for row in 0..day.table.rows.len() {
                            body.row(22.0, |mut cells| {
                                for &col in &columns {
                                    cells.col(|ui| {
                                        ui.label(day.table.cell(row, col).to_string());
                                    });
                                }
                            });
                        }
                    });
            });
        }

        ui.add_space(20.0);
        let Some(group) = day.group.clone() else {
            ui.label(format!("'{}' is not mapped to any group, so it has no notes.", day.name));
            return;
        };
        ui.horizontal(|ui| {
            ui.label("Notes for group");
            ui.label(RichText::new(format!(" {group} ")).color(Color32::WHITE).background_color(group_color(&group)));
        });
        ui.add(egui::TextEdit::multiline(&mut self.note_draft).desired_rows(4).desired_width(f32::INFINITY));
        if ui.button(format!("Save note for {group}")).clicked() {
            match self.session.save_note(&group, &self.note_draft) {
                Ok(NoteSaved::Saved) => self.push(Level::Success, format!("Note for '{group}' saved")),
                Ok(NoteSaved::Unchanged) => self.push(Level::Info, "The note has no changes to save".to_string()),
                Err(e) => self.push(Level::Error, format!("Could not save the note: {e}")),
            }
        }
    }

    fn show_log_display(&mut self, ui: &mut Ui) {
        let Some(day) = &self.day else {
            ui.label("Pick a day from the program first.");
            return;
        };
        let running = day.is_running_day();
        let exercises = day.exercises().to_vec();

        ui.horizontal(|ui| {
            ui.label("Workout date:");
            ui.add(DatePickerButton::new(&mut self.entry_date));
        });
        ui.add_space(10.0);

        if running {
            self.show_run_form(ui);
        } else if exercises.is_empty() {
            ui.label("This day lists no exercises to log.");
        } else {
            self.show_set_form(ui, &exercises);
        }
    }

    fn show_run_form(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Run details").heading());
        let form = &mut self.run_form;
        egui::Grid::new("run_form").num_columns(2).spacing([20.0, 8.0]).show(ui, |ui| {
            ui.label("Run type");
            ui.text_edit_singleline(&mut form.run_type);
            ui.end_row();
            ui.label("Distance");
            ui.add(egui::DragValue::new(&mut form.distance_km).speed(0.1).range(0.0..=500.0).fixed_decimals(2).suffix(" km"));
            ui.end_row();
            ui.label("Duration");
            ui.add(egui::DragValue::new(&mut form.duration_min).speed(0.5).range(0.0..=1440.0).fixed_decimals(1).suffix(" min"));
            ui.end_row();
            ui.label("Average heart rate (0 if not measured)");
            ui.add(egui::DragValue::new(&mut form.heart_rate).range(0..=250).suffix(" bpm"));
            ui.end_row();
            ui.label("Effort (RPE)");
            ui.add(egui::Slider::new(&mut form.effort, 1..=10));
            ui.end_row();
        });
        ui.label("Notes (gear, feel, weather...)");
        ui.text_edit_multiline(&mut form.notes);

        let pace = training_log::metrics::pace_min_per_km(form.distance_km, form.duration_min);
        if pace > 0.0 {
            ui.label(RichText::new(format!("Average pace {} min/km", report::format_pace(pace))).strong());
        } else {
            ui.label("Enter a distance and a duration above 0 to see the pace.");
        }

        if ui.button("Log run").clicked() {
            let new = NewRun {
                date: self.entry_date,
                run_type: self.run_form.run_type.clone(),
                distance_km: self.run_form.distance_km,
                duration_min: self.run_form.duration_min,
                avg_heart_rate: self.run_form.heart_rate,
                effort: self.run_form.effort,
                notes: self.run_form.notes.clone(),
            };
            match self.session.log_run(new) {
                Ok(logged) => self.push(
                    Level::Success,
                    format!(
                        "Run logged ({:.2} km in {:.1} min, {} min/km)",
                        logged.distance_km,
                        logged.duration_min,
                        report::format_pace(logged.pace_min_per_km)
                    ),
                ),
                Err(e) => self.push(Level::Error, e.to_string()),
            }
        }
    }

    fn show_set_form(&mut self, ui: &mut Ui, exercises: &[String]) {
        ui.label(RichText::new("Set details").heading());
        let form = &mut self.set_form;
        egui::ComboBox::from_label("Exercise")
            .selected_text(form.exercise.clone())
            .show_ui(ui, |ui| {
                for name in exercises {
                    ui.selectable_value(&mut form.exercise, name.clone(), name.as_str());
                }
            });
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut form.weight).speed(0.5).range(0.0..=1000.0).fixed_decimals(1).suffix(" kg"));
            ui.add(egui::DragValue::new(&mut form.reps).range(1..=100).suffix(" reps"));
            ui.add(egui::Slider::new(&mut form.effort, 1..=10).text("RPE"));
        });

        if ui.button("Log set").clicked() {
            let new = NewSet {
                date: self.entry_date,
                exercise: self.set_form.exercise.clone(),
                weight: self.set_form.weight,
                reps: self.set_form.reps,
                effort: self.set_form.effort,
            };
            let summary = format!("{} ({}kg x {} reps)", new.exercise, new.weight, new.reps);
            match self.session.log_set(new) {
                Ok(logged) => {
                    self.push(Level::Success, format!("Logged {summary}, performance {:.0}", logged.performance));
                    if logged.personal_record {
                        self.push(Level::Success, "New personal record for this exercise!".to_string());
                    }
                }
                Err(e) => self.push(Level::Error, e.to_string()),
            }
        }
    }

    fn show_trends_display(&mut self, ui: &mut Ui) {
        let strength = self.session.strength().rows();
        let runs = self.session.runs().rows();
        if strength.is_empty() && runs.is_empty() {
            ui.label("No history yet. Start logging your workouts!");
            return;
        }
        ui.horizontal(|ui| {
            if !strength.is_empty() {
                ui.radio_value(&mut self.trend_kind, RecordKind::Strength, "Strength");
            }
            if !runs.is_empty() {
                ui.radio_value(&mut self.trend_kind, RecordKind::Run, "Running");
            }
        });
        if strength.is_empty() {
            self.trend_kind = RecordKind::Run;
        } else if runs.is_empty() {
            self.trend_kind = RecordKind::Strength;
        }

        let (title, points, lower_is_better) = match self.trend_kind {
            RecordKind::Strength => {
                let exercises = report::exercises_with_data(strength);
                if self.trend_exercise.as_ref().map_or(true, |e| !exercises.contains(e)) {
                    self.trend_exercise = exercises.first().cloned();
                }
                let selected = self.trend_exercise.clone().unwrap_or_default();
                egui::ComboBox::from_label("Exercise ")
                    .selected_text(selected.clone())
                    .show_ui(ui, |ui| {
                        for name in &exercises {
                            ui.selectable_value(&mut self.trend_exercise, Some(name.clone()), name.as_str());
                        }
                    });
                egui::ComboBox::from_label("Metric")
                    .selected_text(self.strength_metric.label())
                    .show_ui(ui, |ui| {
                        for metric in StrengthMetric::ALL {
                            ui.selectable_value(&mut self.strength_metric, metric, metric.label());
                        }
                    });
                let points = report::strength_trend(strength, &selected, self.strength_metric);
                (format!("{} - {}", self.strength_metric.label(), selected), points, false)
            }
            RecordKind::Run => {
                let types = report::run_types(runs);
                egui::ComboBox::from_label("Run type")
                    .selected_text(self.trend_run_type.clone().unwrap_or_else(|| "All".to_string()))
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.trend_run_type, None, "All");
                        for name in &types {
                            ui.selectable_value(&mut self.trend_run_type, Some(name.clone()), name.as_str());
                        }
                    });
                egui::ComboBox::from_label("Metric ")
                    .selected_text(self.run_metric.label())
                    .show_ui(ui, |ui| {
                        for metric in RunMetric::ALL {
                            ui.selectable_value(&mut self.run_metric, metric, metric.label());
                        }
                    });
                let points = report::run_trend(runs, self.trend_run_type.as_deref(), self.run_metric);
                let mut title = self.run_metric.label().to_string();
                if let Some(t) = &self.trend_run_type {
                    title.push_str(&format!(" - {t}"));
                }
                (title, points, self.run_metric.lower_is_better())
            }
        };

        ui.add_space(10.0);
        ui.label(RichText::new(title).strong());
        if lower_is_better {
            ui.label("Lower is better.");
        }
        if points.is_empty() {
            ui.label("No valid points for this metric with the current filters.");
            return;
        }
        let as_pace = self.trend_kind == RecordKind::Run && self.run_metric == RunMetric::Pace;
        ui.push_id("trend_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(110.0))
                .column(Column::remainder())
                .header(24.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("Date");
                    });
                    header.col(|ui| {
                        ui.strong("Value");
                    });
                })
                .body(|mut body| {
                    for point in &points {
                        body.row(22.0, |mut row| {
                            row.col(|ui| {
                                ui.label(point.date.format("%Y-%m-%d").to_string());
                            });
                            row.col(|ui| {
                                if as_pace {
                                    ui.label(report::format_pace(point.value));
                                } else {
                                    ui.label(format!("{:.2}", point.value));
                                }
                            });
                        });
                    }
                });
        });
    }

    fn show_records_display(&mut self, ui: &mut Ui) {
        let previous = self.delete_kind;
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.delete_kind, RecordKind::Strength, "Strength");
            ui.radio_value(&mut self.delete_kind, RecordKind::Run, "Running");
        });
        if previous != self.delete_kind {
            self.marked.clear();
        }

        // Marks from before the last reload would make every delete stale
        let (dirty, corrupt, listing) = match self.delete_kind {
            RecordKind::Strength => {
                let history = self.session.strength();
                self.marked.retain(|id| history.table().is_current(*id));
                let listing = report::deletion_listing(history.table(), self.delete_limit);
                (history.is_dirty(), history.status().is_corrupt(), listing)
            }
            RecordKind::Run => {
                let history = self.session.runs();
                self.marked.retain(|id| history.table().is_current(*id));
                let listing = report::deletion_listing(history.table(), self.delete_limit);
                (history.is_dirty(), history.status().is_corrupt(), listing)
            }
        };

        if corrupt && ui.button("Reload from disk").clicked() {
            match self.delete_kind {
                RecordKind::Strength => self.session.reload_strength(),
                RecordKind::Run => self.session.reload_runs(),
            }
            self.marked.clear();
            let status = match self.delete_kind {
                RecordKind::Strength => self.session.strength().status().clone(),
                RecordKind::Run => self.session.runs().status().clone(),
            };
            if status == LoadStatus::Loaded {
                self.push(Level::Success, "History reloaded".to_string());
            } else {
                self.report_status("History", status);
            }
            return;
        }

        if dirty {
            ui.colored_label(Level::Warning.color(), "Some rows were not saved yet. Save them before deleting.");
            if ui.button("Retry save").clicked() {
                let result = match self.delete_kind {
                    RecordKind::Strength => self.session.save_strength(),
                    RecordKind::Run => self.session.save_runs(),
                };
                match result {
                    Ok(()) => self.push(Level::Success, "History saved".to_string()),
                    Err(e) => self.push(Level::Error, e.to_string()),
                }
            }
            return;
        }
        if listing.is_empty() {
            ui.label("No records to manage.");
            return;
        }

        ui.add(egui::Slider::new(&mut self.delete_limit, 5..=200).text("recent records shown"));
        ScrollArea::vertical().max_height(420.0).show(ui, |ui| {
            for entry in &listing {
                let mut checked = self.marked.contains(&entry.id);
                if ui.checkbox(&mut checked, entry.label.as_str()).changed() {
                    if checked {
                        self.marked.insert(entry.id);
                    } else {
                        self.marked.remove(&entry.id);
                    }
                }
            }
        });

        if ui.button(RichText::new("Delete selected").color(Level::Error.color())).clicked() {
            let ids: Vec<RowId> = self.marked.iter().copied().collect();
            let result = match self.delete_kind {
                RecordKind::Strength => self.session.delete_sets(&ids),
                RecordKind::Run => self.session.delete_runs(&ids),
            };
            match result {
                Ok(DeleteOutcome::NothingSelected) => {
                    self.push(Level::Warning, "No records selected for deletion".to_string())
                }
                Ok(DeleteOutcome::Deleted(n)) => {
                    self.marked.clear();
                    self.push(Level::Success, format!("{n} records deleted"));
                }
                Err(e) => self.push(Level::Error, e.to_string()),
            }
        }
    }
}

impl App for TrainingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::bottom("messages").show(ctx, |ui| {
            for (level, message) in self.messages.iter().rev() {
                ui.colored_label(level.color(), message.as_str());
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                self.show_day_picker(ui);
                ui.separator();
                for (mode, label) in [
                    (DisplayMode::Program, "Program"),
                    (DisplayMode::Log, "Log workout"),
                    (DisplayMode::Trends, "Trends"),
                    (DisplayMode::Records, "Records"),
                ] {
                    if ui.selectable_label(self.display_mode == mode, label).clicked() {
                        self.display_mode = mode;
                    }
                }
            });
            ui.separator();

            ScrollArea::vertical().show(ui, |ui| match self.display_mode {
                DisplayMode::Program => self.show_program_display(ui),
                DisplayMode::Log => self.show_log_display(ui),
                DisplayMode::Trends => self.show_trends_display(ui),
                DisplayMode::Records => self.show_records_display(ui),
            });
        });
    }
}
