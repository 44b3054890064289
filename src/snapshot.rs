//! JSON snapshot of the whole store.
//!
//! The `school.json` document holds three lists keyed `students`,
//! `instructors` and `courses`, with relationships expressed as id lists on
//! both sides. Exports are deterministic (lists sorted by id, fields in
//! declaration order). Imports are validated as a whole before the store is
//! touched, then replace the store contents inside one transaction.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::db::SchoolRepository;
use crate::error::{Result, SchoolError};
use crate::models::{validate_age, validate_email, validate_id, validate_name, NewCourse, NewPerson};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub students: Vec<StudentRecord>,
    pub instructors: Vec<InstructorRecord>,
    pub courses: Vec<CourseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    #[serde(default)]
    pub registered_courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructorRecord {
    pub instructor_id: String,
    pub name: String,
    pub age: u32,
    pub email: String,
    #[serde(default)]
    pub assigned_courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseRecord {
    pub course_id: String,
    pub course_name: String,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub enrolled_students: Vec<String>,
}

impl Snapshot {
    /// Parse a document from JSON text. Syntax errors, missing fields, and
    /// unknown fields all surface as `MalformedSnapshot`.
    pub fn from_json(text: &str) -> Result<Snapshot> {
        serde_json::from_str(text).map_err(|err| SchoolError::malformed(err.to_string()))
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .map_err(|err| SchoolError::io("failed to encode snapshot", err.into()))?;
        // serde_json only ever writes valid UTF-8.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Check the document is internally consistent: ids unique per list, field
    /// values valid, every reference resolvable within the document, and both
    /// sides of every relationship in agreement.
    pub fn validate(&self) -> Result<()> {
        let student_ids = unique_ids(
            "student",
            self.students.iter().map(|s| s.student_id.as_str()),
        )?;
        let instructor_ids = unique_ids(
            "instructor",
            self.instructors.iter().map(|i| i.instructor_id.as_str()),
        )?;
        let course_ids = unique_ids(
            "course",
            self.courses.iter().map(|c| c.course_id.as_str()),
        )?;

        for student in &self.students {
            check_person("student", &student.student_id, &student.name, student.age, &student.email)?;
        }
        for instructor in &self.instructors {
            check_person(
                "instructor",
                &instructor.instructor_id,
                &instructor.name,
                instructor.age,
                &instructor.email,
            )?;
        }
        for course in &self.courses {
            validate_name(&course.course_name).map_err(|err| {
                SchoolError::malformed(format!("course {}: {err}", course.course_id))
            })?;
        }

        // Enrollment, seen from the course side and from the student side.
        let mut from_courses = BTreeSet::new();
        for course in &self.courses {
            for student in &course.enrolled_students {
                if !student_ids.contains(student.as_str()) {
                    return Err(SchoolError::malformed(format!(
                        "course {} lists unknown student {student}",
                        course.course_id
                    )));
                }
                if !from_courses.insert((course.course_id.as_str(), student.as_str())) {
                    return Err(SchoolError::malformed(format!(
                        "course {} lists student {student} twice",
                        course.course_id
                    )));
                }
            }
        }
        let mut from_students = BTreeSet::new();
        for student in &self.students {
            for course in &student.registered_courses {
                if !course_ids.contains(course.as_str()) {
                    return Err(SchoolError::malformed(format!(
                        "student {} lists unknown course {course}",
                        student.student_id
                    )));
                }
                if !from_students.insert((course.as_str(), student.student_id.as_str())) {
                    return Err(SchoolError::malformed(format!(
                        "student {} lists course {course} twice",
                        student.student_id
                    )));
                }
            }
        }
        if let Some((course, student)) = from_courses.symmetric_difference(&from_students).next() {
            return Err(SchoolError::malformed(format!(
                "enrollment of student {student} in course {course} is listed on one side only"
            )));
        }

        // Teaching assignments, seen from both sides.
        let mut taught_by: BTreeMap<&str, &str> = BTreeMap::new();
        for instructor in &self.instructors {
            for course in &instructor.assigned_courses {
                if !course_ids.contains(course.as_str()) {
                    return Err(SchoolError::malformed(format!(
                        "instructor {} lists unknown course {course}",
                        instructor.instructor_id
                    )));
                }
                if let Some(other) =
                    taught_by.insert(course.as_str(), instructor.instructor_id.as_str())
                {
                    if other == instructor.instructor_id {
                        return Err(SchoolError::malformed(format!(
                            "instructor {other} lists course {course} twice"
                        )));
                    }
                    return Err(SchoolError::malformed(format!(
                        "course {course} is assigned to both {other} and {}",
                        instructor.instructor_id
                    )));
                }
            }
        }
        for course in &self.courses {
            let declared = course.instructor.as_deref();
            if let Some(instructor) = declared {
                if !instructor_ids.contains(instructor) {
                    return Err(SchoolError::malformed(format!(
                        "course {} references unknown instructor {instructor}",
                        course.course_id
                    )));
                }
            }
            if declared != taught_by.get(course.course_id.as_str()).copied() {
                return Err(SchoolError::malformed(format!(
                    "instructor of course {} disagrees with the instructors list",
                    course.course_id
                )));
            }
        }

        Ok(())
    }
}

fn unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        let normalized = validate_id(id)
            .map_err(|err| SchoolError::malformed(format!("{kind} {id:?}: {err}")))?;
        if normalized != id {
            return Err(SchoolError::malformed(format!(
                "{kind} id {id:?} has surrounding whitespace"
            )));
        }
        if !seen.insert(id) {
            return Err(SchoolError::malformed(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(seen)
}

fn check_person(kind: &str, id: &str, name: &str, age: u32, email: &str) -> Result<()> {
    validate_name(name)
        .and_then(|_| validate_age(age))
        .and_then(|_| validate_email(email))
        .map(|_| ())
        .map_err(|err| SchoolError::malformed(format!("{kind} {id}: {err}")))
}

/// Read every record through the repository and build a snapshot.
pub fn export_snapshot<R: SchoolRepository + ?Sized>(repo: &R) -> Result<Snapshot> {
    let students = repo
        .students()?
        .into_iter()
        .map(|s| StudentRecord {
            student_id: s.id,
            name: s.name,
            age: s.age,
            email: s.email,
            registered_courses: s.courses,
        })
        .collect();
    let instructors = repo
        .instructors()?
        .into_iter()
        .map(|i| InstructorRecord {
            instructor_id: i.id,
            name: i.name,
            age: i.age,
            email: i.email,
            assigned_courses: i.courses,
        })
        .collect();
    let courses = repo
        .courses()?
        .into_iter()
        .map(|c| CourseRecord {
            course_id: c.id,
            course_name: c.name,
            instructor: c.instructor,
            enrolled_students: c.students,
        })
        .collect();

    Ok(Snapshot {
        students,
        instructors,
        courses,
    })
}

/// Replace the store contents with `snapshot`. The document is validated
/// before anything is written; a failure midway rolls the whole import back.
pub fn import_snapshot<R: SchoolRepository + ?Sized>(repo: &R, snapshot: &Snapshot) -> Result<()> {
    snapshot.validate()?;

    repo.atomically(&mut || {
        repo.clear_all()?;

        for instructor in &snapshot.instructors {
            repo.create_instructor(&NewPerson::new(
                instructor.instructor_id.as_str(),
                instructor.name.as_str(),
                instructor.age,
                instructor.email.as_str(),
            ))?;
        }
        for course in &snapshot.courses {
            repo.create_course(&NewCourse::new(
                course.course_id.as_str(),
                course.course_name.as_str(),
            ))?;
        }
        for student in &snapshot.students {
            repo.create_student(&NewPerson::new(
                student.student_id.as_str(),
                student.name.as_str(),
                student.age,
                student.email.as_str(),
            ))?;
        }

        for course in &snapshot.courses {
            if let Some(instructor) = &course.instructor {
                repo.assign_instructor(&course.course_id, instructor)?;
            }
            for student in &course.enrolled_students {
                repo.enroll_student(&course.course_id, student)?;
            }
        }
        Ok(())
    })?;

    info!(
        students = snapshot.students.len(),
        instructors = snapshot.instructors.len(),
        courses = snapshot.courses.len(),
        "imported snapshot"
    );
    Ok(())
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| SchoolError::io("failed to create snapshot directory", err))?;
    }
    let text = snapshot.to_json()?;
    fs::write(path, text).map_err(|err| {
        SchoolError::io(format!("failed to write snapshot {}", path.display()), err)
    })?;
    info!(path = %path.display(), "wrote snapshot");
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let text = fs::read_to_string(path).map_err(|err| {
        SchoolError::io(format!("failed to read snapshot {}", path.display()), err)
    })?;
    Snapshot::from_json(&text)
}
