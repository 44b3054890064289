use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::EntityKind;
use crate::models::{Course, CoursePatch, Instructor, NewCourse, NewPerson, PersonPatch, Student};

/// Fields of the person form shared by students and instructors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum PersonField {
    #[default]
    Id,
    Name,
    Age,
    Email,
}

impl PersonField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            PersonField::Id => "ID",
            PersonField::Name => "Name",
            PersonField::Age => "Age",
            PersonField::Email => "Email",
        }
    }

    /// Row offset of the field inside the form popup.
    pub(crate) fn row(self) -> u16 {
        match self {
            PersonField::Id => 0,
            PersonField::Name => 1,
            PersonField::Age => 2,
            PersonField::Email => 3,
        }
    }
}

/// Form state for creating or editing a student or an instructor. While
/// editing the id is locked and focus skips it.
#[derive(Default, Clone, Debug)]
pub(crate) struct PersonForm {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) age: String,
    pub(crate) email: String,
    pub(crate) active: PersonField,
    pub(crate) locked_id: bool,
    pub(crate) error: Option<String>,
}

impl PersonForm {
    pub(crate) fn from_student(student: &Student) -> Self {
        Self::editing(&student.id, &student.name, student.age, &student.email)
    }

    pub(crate) fn from_instructor(instructor: &Instructor) -> Self {
        Self::editing(&instructor.id, &instructor.name, instructor.age, &instructor.email)
    }

    fn editing(id: &str, name: &str, age: u32, email: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age: age.to_string(),
            email: email.to_string(),
            active: PersonField::Name,
            locked_id: true,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            PersonField::Id => PersonField::Name,
            PersonField::Name => PersonField::Age,
            PersonField::Age => PersonField::Email,
            PersonField::Email if self.locked_id => PersonField::Name,
            PersonField::Email => PersonField::Id,
        };
    }

    pub(crate) fn prev_field(&mut self) {
        self.active = match self.active {
            PersonField::Id => PersonField::Email,
            PersonField::Name if self.locked_id => PersonField::Email,
            PersonField::Name => PersonField::Id,
            PersonField::Age => PersonField::Name,
            PersonField::Email => PersonField::Age,
        };
    }

    fn value_mut(&mut self, field: PersonField) -> &mut String {
        match field {
            PersonField::Id => &mut self.id,
            PersonField::Name => &mut self.name,
            PersonField::Age => &mut self.age,
            PersonField::Email => &mut self.email,
        }
    }

    pub(crate) fn value(&self, field: PersonField) -> &str {
        match field {
            PersonField::Id => &self.id,
            PersonField::Name => &self.name,
            PersonField::Age => &self.age,
            PersonField::Email => &self.email,
        }
    }

    /// Append a character to the active field. Ages only take digits and ids
    /// refuse spaces, mirroring the validation rules.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            PersonField::Id => !self.locked_id && !ch.is_whitespace() && !ch.is_control(),
            PersonField::Age => ch.is_ascii_digit() && self.age.len() < 3,
            PersonField::Name | PersonField::Email => !ch.is_control(),
        };
        if accepted {
            let field = self.active;
            self.value_mut(field).push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        if self.active == PersonField::Id && self.locked_id {
            return;
        }
        let field = self.active;
        self.value_mut(field).pop();
    }

    fn parse_age(&self) -> Result<u32> {
        let raw = self.age.trim();
        if raw.is_empty() {
            return Err(anyhow!("Age is required."));
        }
        raw.parse::<u32>().context("Age must be a whole number.")
    }

    /// Typed create request. Field rules are checked again by the store.
    pub(crate) fn to_new_person(&self) -> Result<NewPerson> {
        Ok(NewPerson::new(
            self.id.trim(),
            self.name.trim(),
            self.parse_age()?,
            self.email.trim(),
        ))
    }

    pub(crate) fn to_patch(&self) -> Result<PersonPatch> {
        Ok(PersonPatch {
            name: Some(self.name.trim().to_string()),
            age: Some(self.parse_age()?),
            email: Some(self.email.trim().to_string()),
        })
    }

    pub(crate) fn build_line(&self, field: PersonField) -> Line<'static> {
        let locked = field == PersonField::Id && self.locked_id;
        field_line(field.label(), self.value(field), self.active == field, locked)
    }

    pub(crate) fn value_len(&self, field: PersonField) -> usize {
        self.value(field).chars().count()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum CourseField {
    #[default]
    Id,
    Name,
    Instructor,
}

impl CourseField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            CourseField::Id => "ID",
            CourseField::Name => "Name",
            CourseField::Instructor => "Instructor ID",
        }
    }

    pub(crate) fn row(self) -> u16 {
        match self {
            CourseField::Id => 0,
            CourseField::Name => 1,
            CourseField::Instructor => 2,
        }
    }
}

/// Course form. The instructor field is only offered on creation; later
/// changes go through the assign/clear shortcuts.
#[derive(Default, Clone, Debug)]
pub(crate) struct CourseForm {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) instructor: String,
    pub(crate) active: CourseField,
    pub(crate) locked_id: bool,
    pub(crate) error: Option<String>,
}

impl CourseForm {
    pub(crate) fn from_course(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            instructor: course.instructor.clone().unwrap_or_default(),
            active: CourseField::Name,
            locked_id: true,
            error: None,
        }
    }

    pub(crate) fn fields(&self) -> &'static [CourseField] {
        if self.locked_id {
            &[CourseField::Id, CourseField::Name]
        } else {
            &[CourseField::Id, CourseField::Name, CourseField::Instructor]
        }
    }

    pub(crate) fn next_field(&mut self) {
        if self.locked_id {
            self.active = CourseField::Name;
            return;
        }
        self.active = match self.active {
            CourseField::Id => CourseField::Name,
            CourseField::Name => CourseField::Instructor,
            CourseField::Instructor => CourseField::Id,
        };
    }

    pub(crate) fn prev_field(&mut self) {
        if self.locked_id {
            self.active = CourseField::Name;
            return;
        }
        self.active = match self.active {
            CourseField::Id => CourseField::Instructor,
            CourseField::Name => CourseField::Id,
            CourseField::Instructor => CourseField::Name,
        };
    }

    pub(crate) fn value(&self, field: CourseField) -> &str {
        match field {
            CourseField::Id => &self.id,
            CourseField::Name => &self.name,
            CourseField::Instructor => &self.instructor,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            CourseField::Id if !self.locked_id && !ch.is_whitespace() => self.id.push(ch),
            CourseField::Name => self.name.push(ch),
            CourseField::Instructor if !ch.is_whitespace() => self.instructor.push(ch),
            _ => return false,
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            CourseField::Id if !self.locked_id => {
                self.id.pop();
            }
            CourseField::Name => {
                self.name.pop();
            }
            CourseField::Instructor => {
                self.instructor.pop();
            }
            _ => {}
        }
    }

    pub(crate) fn to_new_course(&self) -> NewCourse {
        let course = NewCourse::new(self.id.trim(), self.name.trim());
        match self.instructor.trim() {
            "" => course,
            instructor => course.with_instructor(instructor),
        }
    }

    pub(crate) fn to_patch(&self) -> CoursePatch {
        CoursePatch {
            name: Some(self.name.trim().to_string()),
        }
    }

    pub(crate) fn build_line(&self, field: CourseField) -> Line<'static> {
        let locked = field == CourseField::Id && self.locked_id;
        field_line(field.label(), self.value(field), self.active == field, locked)
    }

    pub(crate) fn value_len(&self, field: CourseField) -> usize {
        self.value(field).chars().count()
    }
}

/// Render one `Label: value` line with focus and placeholder styling.
fn field_line(label: &str, value: &str, is_active: bool, locked: bool) -> Line<'static> {
    let display = if value.is_empty() {
        "<required>".to_string()
    } else {
        value.to_string()
    };

    let style = if locked {
        Style::default().fg(Color::DarkGray)
    } else if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// Pending delete awaiting a Y/N answer.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmDelete {
    pub(crate) kind: EntityKind,
    pub(crate) id: String,
    pub(crate) label: String,
}

impl ConfirmDelete {
    /// Sentence describing what the cascade will do.
    pub(crate) fn consequence(&self) -> &'static str {
        match self.kind {
            EntityKind::Student => "The student is removed from every course roster.",
            EntityKind::Instructor => "Courses they teach become unassigned.",
            EntityKind::Course => "All enrollments in this course are dropped.",
        }
    }
}

/// What a picker selection will do once confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PickPurpose {
    AssignInstructor { course_id: String },
    Enroll { course_id: String },
    Unenroll { course_id: String },
}

impl PickPurpose {
    pub(crate) fn title(&self) -> String {
        match self {
            PickPurpose::AssignInstructor { course_id } => {
                format!("Assign instructor to {course_id}")
            }
            PickPurpose::Enroll { course_id } => format!("Enroll student in {course_id}"),
            PickPurpose::Unenroll { course_id } => format!("Remove student from {course_id}"),
        }
    }
}

/// A modal list of `(id, label)` choices.
#[derive(Clone, Debug)]
pub(crate) struct PickerState {
    pub(crate) purpose: PickPurpose,
    pub(crate) items: Vec<(String, String)>,
    pub(crate) selected: usize,
}

impl PickerState {
    pub(crate) fn new(purpose: PickPurpose, items: Vec<(String, String)>) -> Self {
        Self {
            purpose,
            items,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn current_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|(id, _)| id.as_str())
    }
}
