//! Domain models that mirror the SQLite schema and travel between the store
//! and the front-ends. Entities are plain data holders; relationship fields
//! hold identifiers rather than nested records so a student never owns a copy
//! of a course that could drift from the database.
//!
//! Writes go through the request types at the bottom of the file. They carry
//! exactly the fields an operation accepts and validate themselves before the
//! persistence layer touches SQL.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SchoolError};

/// Longest identifier we accept for any record type.
pub const MAX_ID_LEN: usize = 32;
/// Upper bound for person ages; anything larger is a typo.
pub const MAX_AGE: u32 = 150;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
/// A student and the ids of the courses they are enrolled in.
pub struct Student {
    /// Primary key. Never changes after creation.
    pub id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    /// Enrolled course ids, sorted.
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An instructor and the ids of the courses they teach.
pub struct Instructor {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    /// Ids of courses whose instructor column points here, sorted.
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A course with at most one instructor and any number of students.
pub struct Course {
    pub id: String,
    /// Course title as shown in tables.
    pub name: String,
    pub instructor: Option<String>,
    /// Enrolled student ids, sorted.
    pub students: Vec<String>,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl fmt::Display for Instructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, self.name)
    }
}

/// Fields required to create a student or an instructor. Both record types
/// share the same person shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
}

impl NewPerson {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        age: u32,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            email: email.into(),
        }
    }

    /// Trim and check every field, returning the normalized request.
    pub fn validated(&self) -> Result<NewPerson> {
        Ok(NewPerson {
            id: validate_id(&self.id)?,
            name: validate_name(&self.name)?,
            age: validate_age(self.age)?,
            email: validate_email(&self.email)?,
        })
    }
}

/// Partial update for a student or an instructor. `None` leaves the stored
/// value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.email.is_none()
    }

    /// Merge the patch over the current values and validate the result.
    pub(crate) fn apply(&self, name: &str, age: u32, email: &str) -> Result<(String, u32, String)> {
        let name = validate_name(self.name.as_deref().unwrap_or(name))?;
        let age = validate_age(self.age.unwrap_or(age))?;
        let email = validate_email(self.email.as_deref().unwrap_or(email))?;
        Ok((name, age, email))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub id: String,
    pub name: String,
    pub instructor: Option<String>,
}

impl NewCourse {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            instructor: None,
        }
    }

    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = Some(instructor.into());
        self
    }

    pub fn validated(&self) -> Result<NewCourse> {
        let instructor = match &self.instructor {
            Some(raw) => Some(validate_id(raw)?),
            None => None,
        };
        Ok(NewCourse {
            id: validate_id(&self.id)?,
            name: validate_name(&self.name)?,
            instructor,
        })
    }
}

/// Partial course update. Instructor changes go through the relationship
/// operations instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub name: Option<String>,
}

impl CoursePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

/// Result of a free-text search across all three tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub students: Vec<Student>,
    pub instructors: Vec<Instructor>,
    pub courses: Vec<Course>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.students.len() + self.instructors.len() + self.courses.len()
    }
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub students: usize,
    pub instructors: usize,
    pub courses: usize,
}

pub fn validate_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(SchoolError::validation("id", "is required"));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(SchoolError::validation("id", "must not contain spaces"));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(SchoolError::validation(
            "id",
            format!("must be at most {MAX_ID_LEN} characters"),
        ));
    }
    Ok(id.to_string())
}

pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        Err(SchoolError::validation("name", "is required"))
    } else {
        Ok(name.to_string())
    }
}

pub fn validate_age(age: u32) -> Result<u32> {
    if age > MAX_AGE {
        Err(SchoolError::validation(
            "age",
            format!("must be between 0 and {MAX_AGE}"),
        ))
    } else {
        Ok(age)
    }
}

pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if EMAIL_PATTERN.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(SchoolError::validation(
            "email",
            format!("'{email}' is not an address like name@example.com"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_fields_are_trimmed() {
        let person = NewPerson::new(" S1 ", "  Ada  ", 20, " ada@uni.edu ")
            .validated()
            .unwrap();
        assert_eq!(person.id, "S1");
        assert_eq!(person.name, "Ada");
        assert_eq!(person.email, "ada@uni.edu");
    }

    #[test]
    fn rejects_bad_person_fields() {
        let cases = [
            NewPerson::new("", "Ada", 20, "ada@uni.edu"),
            NewPerson::new("S 1", "Ada", 20, "ada@uni.edu"),
            NewPerson::new("S1", "   ", 20, "ada@uni.edu"),
            NewPerson::new("S1", "Ada", 200, "ada@uni.edu"),
            NewPerson::new("S1", "Ada", 20, "ada-at-uni"),
            NewPerson::new("S1", "Ada", 20, "ada@uni"),
        ];
        for case in cases {
            assert!(
                matches!(case.validated(), Err(SchoolError::Validation { .. })),
                "{case:?} should be rejected"
            );
        }
    }

    #[test]
    fn long_ids_are_rejected() {
        let id = "X".repeat(MAX_ID_LEN + 1);
        assert!(validate_id(&id).is_err());
        assert!(validate_id(&id[..MAX_ID_LEN]).is_ok());
    }

    #[test]
    fn patch_falls_back_to_current_values() {
        let patch = PersonPatch {
            age: Some(41),
            ..PersonPatch::default()
        };
        let (name, age, email) = patch.apply("Dr. Lee", 40, "lee@uni.edu").unwrap();
        assert_eq!(name, "Dr. Lee");
        assert_eq!(age, 41);
        assert_eq!(email, "lee@uni.edu");
    }

    #[test]
    fn patch_validates_merged_values() {
        let patch = PersonPatch {
            email: Some("broken".into()),
            ..PersonPatch::default()
        };
        assert!(patch.apply("Dr. Lee", 40, "lee@uni.edu").is_err());
    }

    #[test]
    fn course_instructor_id_is_normalized() {
        let course = NewCourse::new("C1", "Algorithms")
            .with_instructor(" I1 ")
            .validated()
            .unwrap();
        assert_eq!(course.instructor.as_deref(), Some("I1"));
    }
}
