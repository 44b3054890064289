use std::mem;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use crossterm::event::KeyCode;
use open::that as open_path;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Tabs, Wrap,
};
use ratatui::Frame;
use tracing::warn;

use crate::backup::backup_to_folder;
use crate::config::Config;
use crate::db::SchoolRepository;
use crate::error::EntityKind;
use crate::models::Counts;
use crate::snapshot::{export_snapshot, import_snapshot, read_snapshot, write_snapshot};

use super::forms::{ConfirmDelete, CourseForm, PersonField, PersonForm, PickPurpose, PickerState};
use super::helpers::{centered_rect, id_list, surface_error};
use super::screens::{Listing, Tab};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows jumped by PageUp/PageDown.
const PAGE_STEP: isize = 10;

/// Modes layered over the tab view.
enum Mode {
    Normal,
    PersonForm {
        kind: EntityKind,
        editing: Option<String>,
        form: PersonForm,
    },
    CourseForm {
        editing: Option<String>,
        form: CourseForm,
    },
    ConfirmDelete(ConfirmDelete),
    ConfirmImport,
    Picking(PickerState),
    Searching(String),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    repo: Box<dyn SchoolRepository>,
    config: Config,
    tab: Tab,
    listing: Listing,
    counts: Counts,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(repo: Box<dyn SchoolRepository>, config: Config) -> Result<Self> {
        let mut app = Self {
            repo,
            config,
            tab: Tab::Students,
            listing: Listing::default(),
            counts: Counts::default(),
            mode: Mode::Normal,
            status: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Route a key press to the active mode. Returns `true` when the user asked
    /// to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        let next = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::PersonForm {
                kind,
                editing,
                form,
            } => self.handle_person_form(code, kind, editing, form),
            Mode::CourseForm { editing, form } => self.handle_course_form(code, editing, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::ConfirmImport => self.handle_confirm_import(code),
            Mode::Picking(picker) => self.handle_picker(code, picker),
            Mode::Searching(query) => self.handle_search(code, query),
        };

        // Store failures land in the footer; the session keeps running.
        self.mode = match next {
            Ok(mode) => mode,
            Err(err) => {
                warn!(error = %err, "key handling failed");
                self.set_status(surface_error(&err), StatusKind::Error);
                Mode::Normal
            }
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let tab = self.tab;
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.listing.filter.is_some() {
                    self.listing.set_filter(None);
                    self.reload()?;
                    self.set_status("Filter cleared.", StatusKind::Info);
                } else {
                    *exit = true;
                }
            }
            KeyCode::Tab | KeyCode::Right => {
                self.tab = tab.next();
                self.clear_status();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.tab = tab.prev();
                self.clear_status();
            }
            KeyCode::Up => self.listing.move_selection(tab, -1),
            KeyCode::Down => self.listing.move_selection(tab, 1),
            KeyCode::PageUp => self.listing.move_selection(tab, -PAGE_STEP),
            KeyCode::PageDown => self.listing.move_selection(tab, PAGE_STEP),
            KeyCode::Home => self.listing.select_first(tab),
            KeyCode::End => self.listing.select_last(tab),
            KeyCode::Char('/') | KeyCode::Char('f') => {
                return Ok(Mode::Searching(
                    self.listing.filter.clone().unwrap_or_default(),
                ));
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(match tab {
                    Tab::Courses => Mode::CourseForm {
                        editing: None,
                        form: CourseForm::default(),
                    },
                    _ => Mode::PersonForm {
                        kind: tab.kind(),
                        editing: None,
                        form: PersonForm::default(),
                    },
                });
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(mode) = self.edit_mode() {
                    self.clear_status();
                    return Ok(mode);
                }
                self.set_status("Nothing selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') | KeyCode::Delete => {
                if let Some((id, label)) = self.listing.current_label(tab) {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(ConfirmDelete {
                        kind: tab.kind(),
                        id,
                        label,
                    }));
                }
                self.set_status("Nothing selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('a') if tab == Tab::Courses => return self.open_picker_assign(),
            KeyCode::Char('r') if tab == Tab::Courses => return self.open_picker_enroll(),
            KeyCode::Char('u') if tab == Tab::Courses => return self.open_picker_unenroll(),
            KeyCode::Char('x') if tab == Tab::Courses => self.clear_selected_instructor()?,
            KeyCode::Char('o') => self.open_data_dir(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn edit_mode(&self) -> Option<Mode> {
        match self.tab {
            Tab::Students => self.listing.current_student().map(|s| Mode::PersonForm {
                kind: EntityKind::Student,
                editing: Some(s.id.clone()),
                form: PersonForm::from_student(s),
            }),
            Tab::Instructors => self.listing.current_instructor().map(|i| Mode::PersonForm {
                kind: EntityKind::Instructor,
                editing: Some(i.id.clone()),
                form: PersonForm::from_instructor(i),
            }),
            Tab::Courses => self.listing.current_course().map(|c| Mode::CourseForm {
                editing: Some(c.id.clone()),
                form: CourseForm::from_course(c),
            }),
        }
    }

    fn handle_person_form(
        &mut self,
        code: KeyCode,
        kind: EntityKind,
        editing: Option<String>,
        mut form: PersonForm,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_person(kind, editing.as_deref(), &form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::PersonForm {
            kind,
            editing,
            form,
        })
    }

    fn handle_course_form(
        &mut self,
        code: KeyCode,
        editing: Option<String>,
        mut form: CourseForm,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_course(editing.as_deref(), &form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::CourseForm { editing, form })
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::Normal)
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_confirm_import(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.import_from_snapshot() {
                    warn!(error = %err, "snapshot import failed");
                    self.set_status(
                        format!("Load failed: {}", surface_error(&err)),
                        StatusKind::Error,
                    );
                }
                Ok(Mode::Normal)
            }
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Load cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmImport),
        }
    }

    fn handle_picker(&mut self, code: KeyCode, mut picker: PickerState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Up => {
                picker.move_selection(-1);
                Ok(Mode::Picking(picker))
            }
            KeyCode::Down => {
                picker.move_selection(1);
                Ok(Mode::Picking(picker))
            }
            KeyCode::Enter => {
                let Some(choice) = picker.current_id().map(str::to_string) else {
                    return Ok(Mode::Normal);
                };
                if let Err(err) = self.apply_pick(&picker.purpose, &choice) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::Picking(picker)),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut query: String) -> Result<Mode> {
        match code {
            KeyCode::Esc => Ok(Mode::Normal),
            KeyCode::Enter => {
                self.listing.set_filter(Some(query));
                self.reload()?;
                match &self.listing.filter {
                    Some(filter) => self.set_status(
                        format!(
                            "Filter \"{filter}\": {} students, {} instructors, {} courses.",
                            self.listing.students.len(),
                            self.listing.instructors.len(),
                            self.listing.courses.len()
                        ),
                        StatusKind::Info,
                    ),
                    None => self.clear_status(),
                }
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                query.pop();
                Ok(Mode::Searching(query))
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                query.push(ch);
                Ok(Mode::Searching(query))
            }
            _ => Ok(Mode::Searching(query)),
        }
    }

    /// Ctrl-S: write the snapshot file.
    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let path = self.config.snapshot_path.clone();
        let outcome = export_snapshot(self.repo.as_ref())
            .and_then(|snapshot| write_snapshot(&path, &snapshot));
        match outcome {
            Ok(()) => self.set_status(format!("Saved {}.", path.display()), StatusKind::Info),
            Err(err) => self.set_status(format!("Save failed: {err}"), StatusKind::Error),
        }
        Ok(())
    }

    /// Ctrl-L: ask before replacing everything with the snapshot contents.
    pub(crate) fn handle_ctrl_l(&mut self) -> Result<()> {
        if matches!(self.mode, Mode::Normal) {
            self.mode = Mode::ConfirmImport;
        }
        Ok(())
    }

    /// Ctrl-B: copy the database into the backup folder.
    pub(crate) fn handle_ctrl_b(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        match backup_to_folder(self.repo.as_ref(), &self.config.backup_dir, &Local::now()) {
            Ok(path) => self.set_status(format!("Backed up to {}.", path.display()), StatusKind::Info),
            Err(err) => self.set_status(format!("Backup failed: {err}"), StatusKind::Error),
        }
        Ok(())
    }

    fn import_from_snapshot(&mut self) -> Result<()> {
        let path: PathBuf = self.config.snapshot_path.clone();
        let snapshot = read_snapshot(&path)?;
        import_snapshot(self.repo.as_ref(), &snapshot)
            .with_context(|| format!("failed to load {}", path.display()))?;
        self.reload()?;
        self.set_status(format!("Loaded {}.", path.display()), StatusKind::Info);
        Ok(())
    }

    fn save_person(&mut self, kind: EntityKind, editing: Option<&str>, form: &PersonForm) -> Result<()> {
        let (id, verb) = match (kind, editing) {
            (EntityKind::Student, None) => {
                (self.repo.create_student(&form.to_new_person()?)?.id, "Added")
            }
            (EntityKind::Student, Some(id)) => {
                (self.repo.update_student(id, &form.to_patch()?)?.id, "Updated")
            }
            (EntityKind::Instructor, None) => {
                (self.repo.create_instructor(&form.to_new_person()?)?.id, "Added")
            }
            (EntityKind::Instructor, Some(id)) => {
                (self.repo.update_instructor(id, &form.to_patch()?)?.id, "Updated")
            }
            (EntityKind::Course, _) => bail!("courses are edited with the course form"),
        };
        self.reload()?;
        self.listing.focus(self.tab, &id);
        self.set_status(format!("{verb} {kind} {id}."), StatusKind::Info);
        Ok(())
    }

    fn save_course(&mut self, editing: Option<&str>, form: &CourseForm) -> Result<()> {
        let (id, verb) = match editing {
            None => (self.repo.create_course(&form.to_new_course())?.id, "Added"),
            Some(id) => (self.repo.update_course(id, &form.to_patch())?.id, "Updated"),
        };
        self.reload()?;
        self.listing.focus(Tab::Courses, &id);
        self.set_status(format!("{verb} course {id}."), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        match confirm.kind {
            EntityKind::Student => self.repo.delete_student(&confirm.id)?,
            EntityKind::Instructor => self.repo.delete_instructor(&confirm.id)?,
            EntityKind::Course => self.repo.delete_course(&confirm.id)?,
        }
        self.reload()?;
        self.set_status(format!("Deleted {}.", confirm.label), StatusKind::Info);
        Ok(())
    }

    fn open_picker_assign(&mut self) -> Result<Mode> {
        let Some(course) = self.listing.current_course() else {
            self.set_status("No course selected.", StatusKind::Error);
            return Ok(Mode::Normal);
        };
        let purpose = PickPurpose::AssignInstructor {
            course_id: course.id.clone(),
        };
        let items: Vec<(String, String)> = self
            .repo
            .instructors()?
            .into_iter()
            .map(|i| (i.id.clone(), i.to_string()))
            .collect();
        self.picker_or_status(purpose, items, "There are no instructors yet.")
    }

    fn open_picker_enroll(&mut self) -> Result<Mode> {
        let Some(course) = self.listing.current_course() else {
            self.set_status("No course selected.", StatusKind::Error);
            return Ok(Mode::Normal);
        };
        let purpose = PickPurpose::Enroll {
            course_id: course.id.clone(),
        };
        let roster = course.students.clone();
        let items: Vec<(String, String)> = self
            .repo
            .students()?
            .into_iter()
            .filter(|s| !roster.contains(&s.id))
            .map(|s| (s.id.clone(), s.to_string()))
            .collect();
        self.picker_or_status(purpose, items, "Every student is already enrolled.")
    }

    fn open_picker_unenroll(&mut self) -> Result<Mode> {
        let Some(course) = self.listing.current_course() else {
            self.set_status("No course selected.", StatusKind::Error);
            return Ok(Mode::Normal);
        };
        let purpose = PickPurpose::Unenroll {
            course_id: course.id.clone(),
        };
        let mut items = Vec::with_capacity(course.students.len());
        for id in course.students.clone() {
            let student = self.repo.student(&id)?;
            items.push((id, student.to_string()));
        }
        self.picker_or_status(purpose, items, "Nobody is enrolled in this course.")
    }

    fn picker_or_status(
        &mut self,
        purpose: PickPurpose,
        items: Vec<(String, String)>,
        empty_message: &str,
    ) -> Result<Mode> {
        if items.is_empty() {
            self.set_status(empty_message, StatusKind::Error);
            Ok(Mode::Normal)
        } else {
            self.clear_status();
            Ok(Mode::Picking(PickerState::new(purpose, items)))
        }
    }

    fn apply_pick(&mut self, purpose: &PickPurpose, choice: &str) -> Result<()> {
        let (course_id, message) = match purpose {
            PickPurpose::AssignInstructor { course_id } => {
                self.repo.assign_instructor(course_id, choice)?;
                (course_id, format!("Assigned {choice} to {course_id}."))
            }
            PickPurpose::Enroll { course_id } => {
                self.repo.enroll_student(course_id, choice)?;
                (course_id, format!("Enrolled {choice} in {course_id}."))
            }
            PickPurpose::Unenroll { course_id } => {
                self.repo.unenroll_student(course_id, choice)?;
                (course_id, format!("Removed {choice} from {course_id}."))
            }
        };
        self.reload()?;
        self.listing.focus(Tab::Courses, course_id);
        self.set_status(message, StatusKind::Info);
        Ok(())
    }

    fn clear_selected_instructor(&mut self) -> Result<()> {
        let Some(course) = self.listing.current_course() else {
            self.set_status("No course selected.", StatusKind::Error);
            return Ok(());
        };
        if course.instructor.is_none() {
            self.set_status("This course has no instructor.", StatusKind::Error);
            return Ok(());
        }
        let course_id = course.id.clone();
        self.repo.clear_instructor(&course_id)?;
        self.reload()?;
        self.set_status(format!("Cleared instructor of {course_id}."), StatusKind::Info);
        Ok(())
    }

    fn open_data_dir(&mut self) {
        match open_path(&self.config.data_dir) {
            Ok(()) => self.set_status(
                format!("Opened {}.", self.config.data_dir.display()),
                StatusKind::Info,
            ),
            Err(err) => self.set_status(
                format!("Failed to open data folder: {err}"),
                StatusKind::Error,
            ),
        }
    }

    fn reload(&mut self) -> Result<()> {
        self.listing
            .reload(self.repo.as_ref())
            .context("failed to load records")?;
        self.counts = self.repo.counts().context("failed to count records")?;
        Ok(())
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Students => self.draw_students(frame, chunks[1]),
            Tab::Instructors => self.draw_instructors(frame, chunks[1]),
            Tab::Courses => self.draw_courses(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::PersonForm {
                kind,
                editing,
                form,
            } => {
                let verb = if editing.is_some() { "Edit" } else { "Add" };
                let title = match kind {
                    EntityKind::Instructor => format!("{verb} Instructor"),
                    _ => format!("{verb} Student"),
                };
                self.draw_person_form(frame, area, &title, form);
            }
            Mode::CourseForm { editing, form } => {
                let title = if editing.is_some() { "Edit Course" } else { "Add Course" };
                self.draw_course_form(frame, area, title, form);
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::ConfirmImport => self.draw_confirm_import(frame, area),
            Mode::Picking(picker) => self.draw_picker(frame, area, picker),
            Mode::Searching(query) => self.draw_search_bar(frame, area, query),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Tab::ALL
            .iter()
            .map(|tab| {
                let count = match tab {
                    Tab::Students => self.counts.students,
                    Tab::Instructors => self.counts.instructors,
                    Tab::Courses => self.counts.courses,
                };
                Line::from(format!(" {} ({count}) ", tab.title()))
            })
            .collect();

        let mut title = String::from("School Manager");
        if let Some(filter) = &self.listing.filter {
            title.push_str(&format!(" - filter \"{filter}\""));
        }

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title(title))
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn render_table(
        &self,
        frame: &mut Frame,
        area: Rect,
        header: &[&'static str],
        widths: &[Constraint],
        rows: Vec<Row<'static>>,
    ) {
        if rows.is_empty() {
            let message = if self.listing.filter.is_some() {
                "No matching records. Press Esc to clear the filter."
            } else {
                "No records yet. Press + to add one."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(header.iter().map(|h| Cell::from(*h)))
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1);
        let table = Table::new(rows, widths.to_vec())
            .header(header)
            .block(Block::default().borders(Borders::ALL))
            .row_highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");

        let mut state = TableState::default();
        state.select(Some(self.listing.selected(self.tab)));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_students(&self, frame: &mut Frame, area: Rect) {
        let rows = self
            .listing
            .students
            .iter()
            .map(|s| {
                Row::new(vec![
                    s.id.clone(),
                    s.name.clone(),
                    s.age.to_string(),
                    s.email.clone(),
                    id_list(&s.courses),
                ])
            })
            .collect();
        self.render_table(
            frame,
            area,
            &["ID", "Name", "Age", "Email", "Courses"],
            &[
                Constraint::Length(10),
                Constraint::Percentage(25),
                Constraint::Length(5),
                Constraint::Percentage(30),
                Constraint::Min(10),
            ],
            rows,
        );
    }

    fn draw_instructors(&self, frame: &mut Frame, area: Rect) {
        let rows = self
            .listing
            .instructors
            .iter()
            .map(|i| {
                Row::new(vec![
                    i.id.clone(),
                    i.name.clone(),
                    i.age.to_string(),
                    i.email.clone(),
                    id_list(&i.courses),
                ])
            })
            .collect();
        self.render_table(
            frame,
            area,
            &["ID", "Name", "Age", "Email", "Teaches"],
            &[
                Constraint::Length(10),
                Constraint::Percentage(25),
                Constraint::Length(5),
                Constraint::Percentage(30),
                Constraint::Min(10),
            ],
            rows,
        );
    }

    fn draw_courses(&self, frame: &mut Frame, area: Rect) {
        let rows = self
            .listing
            .courses
            .iter()
            .map(|c| {
                Row::new(vec![
                    c.id.clone(),
                    c.name.clone(),
                    c.instructor.clone().unwrap_or_else(|| "-".to_string()),
                    id_list(&c.students),
                ])
            })
            .collect();
        self.render_table(
            frame,
            area,
            &["ID", "Name", "Instructor", "Students"],
            &[
                Constraint::Length(10),
                Constraint::Percentage(35),
                Constraint::Length(12),
                Constraint::Min(10),
            ],
            rows,
        );
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: &[(&str, &str)] = match (&self.mode, self.tab) {
            (Mode::Picking(_), _) => &[("[Up/Down]", "Navigate"), ("[Enter]", "Choose"), ("[Esc]", "Cancel")],
            (Mode::Searching(_), _) => &[("[Enter]", "Apply filter"), ("[Esc]", "Cancel")],
            (Mode::Normal, Tab::Courses) => &[
                ("[+/e/-]", "Add/Edit/Delete"),
                ("[a/x]", "Assign/Clear instructor"),
                ("[r/u]", "Enroll/Unenroll"),
                ("[/]", "Filter"),
                ("[^S/^L/^B]", "Save/Load/Backup"),
                ("[q]", "Quit"),
            ],
            (Mode::Normal, _) => &[
                ("[Tab]", "Switch tab"),
                ("[+/e/-]", "Add/Edit/Delete"),
                ("[/]", "Filter"),
                ("[^S/^L/^B]", "Save/Load/Backup"),
                ("[o]", "Open data folder"),
                ("[q]", "Quit"),
            ],
            _ => &[],
        };

        let mut spans = Vec::with_capacity(pairs.len() * 2);
        for (key, action) in pairs {
            spans.push(Span::styled(key.to_string(), key_style));
            spans.push(Span::raw(format!(" {action}   ")));
        }
        Line::from(spans)
    }

    fn draw_person_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &PersonForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let fields = [
            PersonField::Id,
            PersonField::Name,
            PersonField::Age,
            PersonField::Email,
        ];
        let mut lines: Vec<Line> = fields.iter().map(|f| form.build_line(*f)).collect();
        lines.push(Line::from(""));
        lines.push(form_hint(form.error.as_deref()));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let field = form.active;
        let prefix = format!("{}: ", field.label()).len() as u16;
        frame.set_cursor_position((
            inner.x + prefix + form.value_len(field) as u16,
            inner.y + field.row(),
        ));
    }

    fn draw_course_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &CourseForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = form.fields().iter().map(|f| form.build_line(*f)).collect();
        if !form.locked_id {
            lines.push(Line::from(Span::styled(
                "Leave the instructor empty to assign one later.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
        lines.push(form_hint(form.error.as_deref()));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let field = form.active;
        let prefix = format!("{}: ", field.label()).len() as u16;
        frame.set_cursor_position((
            inner.x + prefix + form.value_len(field) as u16,
            inner.y + field.row(),
        ));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete {} {}?", confirm.kind, confirm.label)),
            Line::from(confirm.consequence()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    fn draw_confirm_import(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Load Snapshot").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Replace every record with {}?",
                self.config.snapshot_path.display()
            )),
            Line::from("Consider a backup (Ctrl-B) first."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    fn draw_picker(&self, frame: &mut Frame, area: Rect, picker: &PickerState) {
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(picker.purpose.title())
            .borders(Borders::ALL);
        let items: Vec<ListItem> = picker
            .items
            .iter()
            .map(|(_, label)| ListItem::new(label.clone()))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");

        let mut list_state = ListState::default();
        list_state.select(Some(picker.selected));
        frame.render_stateful_widget(list, popup_area, &mut list_state);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, query: &str) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Filter");
        let paragraph = Paragraph::new(Span::raw(format!("Filter: {query}")))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Filter: ".len() as u16 + query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

/// Error line when the last save failed, key hints otherwise.
fn form_hint(error: Option<&str>) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            "Enter to save, Tab to switch, Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    fn app() -> App {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = Config::with_data_dir(std::env::temp_dir().join("school-manager-ui-test"));
        App::new(Box::new(store), config).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn add_student_through_form() {
        let mut app = app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Ada");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "20");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "ada@uni.edu");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.repo.student("S1").unwrap().name, "Ada");
        assert_eq!(app.counts.students, 1);
    }

    #[test]
    fn invalid_form_stays_open_with_error() {
        let mut app = app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.mode {
            Mode::PersonForm { form, .. } => assert!(form.error.is_some()),
            _ => panic!("form should stay open"),
        }
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = app();
        app.repo
            .create_student(&crate::models::NewPerson::new("S1", "Ada", 20, "ada@uni.edu"))
            .unwrap();
        app.reload().unwrap();

        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('n')).unwrap();
        assert!(app.repo.student("S1").is_ok());

        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(app.repo.student("S1").is_err());
    }

    #[test]
    fn enroll_via_picker() {
        let mut app = app();
        app.repo
            .create_student(&crate::models::NewPerson::new("S1", "Ada", 20, "ada@uni.edu"))
            .unwrap();
        app.repo
            .create_course(&crate::models::NewCourse::new("C1", "Algorithms"))
            .unwrap();
        app.reload().unwrap();

        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Char('r')).unwrap();
        assert!(matches!(app.mode, Mode::Picking(_)));
        app.handle_key(KeyCode::Enter).unwrap();

        assert_eq!(app.repo.course("C1").unwrap().students, vec!["S1".to_string()]);
    }

    #[test]
    fn store_failure_shows_in_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("school.db");
        let store = SqliteStore::open(&path).unwrap();
        store
            .create_student(&crate::models::NewPerson::new("S1", "Ada", 20, "ada@uni.edu"))
            .unwrap();
        let config = Config::with_data_dir(dir.path());
        let mut app = App::new(Box::new(store), config).unwrap();

        app.handle_key(KeyCode::Char('/')).unwrap();
        type_text(&mut app, "ada");
        app.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(app.listing.students.len(), 1);

        let other = rusqlite::Connection::open(&path).unwrap();
        other.execute_batch("DROP TABLE enrollments").unwrap();

        // Clearing the filter reloads and hits the broken schema.
        assert!(!app.handle_key(KeyCode::Esc).unwrap());
        assert!(matches!(app.mode, Mode::Normal));
        let status = app.status.as_ref().expect("error status");
        assert!(matches!(status.kind, StatusKind::Error));
        assert!(!status.text.is_empty());
    }

    #[test]
    fn quit_key_exits() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }
}
