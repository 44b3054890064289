use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{EntityKind, Result, SchoolError};
use crate::models::{NewPerson, PersonPatch, Student};

use super::connection::{atomic, collect_ids, exists, map_unique_constraint};

const STUDENT_COURSES: &str =
    "SELECT course_id FROM enrollments WHERE student_id = ?1 ORDER BY course_id";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        email: row.get(3)?,
        courses: Vec::new(),
    })
}

/// Retrieve every student ordered by id, with enrolled course ids attached.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT id, name, age, email FROM students ORDER BY id")?;
    let mut students = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for student in &mut students {
        student.courses = collect_ids(conn, STUDENT_COURSES, &student.id)?;
    }
    Ok(students)
}

pub fn fetch_student(conn: &Connection, id: &str) -> Result<Student> {
    let student = conn
        .query_row(
            "SELECT id, name, age, email FROM students WHERE id = ?1",
            [id],
            student_from_row,
        )
        .optional()?;

    let mut student = student.ok_or_else(|| SchoolError::not_found(EntityKind::Student, id))?;
    student.courses = collect_ids(conn, STUDENT_COURSES, &student.id)?;
    Ok(student)
}

/// Insert a new student row and echo the hydrated struct back.
pub fn create_student(conn: &Connection, request: &NewPerson) -> Result<Student> {
    let person = request.validated()?;

    atomic(conn, |conn| {
        if exists(conn, "students", &person.id)? {
            return Err(SchoolError::duplicate(EntityKind::Student, &person.id));
        }
        conn.execute(
            "INSERT INTO students (id, name, age, email) VALUES (?1, ?2, ?3, ?4)",
            params![person.id, person.name, person.age, person.email],
        )
        .map_err(|err| map_unique_constraint(err, EntityKind::Student, &person.id))?;
        Ok(())
    })?;

    info!(student = %person.id, "created student");
    Ok(Student {
        id: person.id,
        name: person.name,
        age: person.age,
        email: person.email,
        courses: Vec::new(),
    })
}

/// Apply a partial update. Fields left as `None` keep their stored value.
pub fn update_student(conn: &Connection, id: &str, patch: &PersonPatch) -> Result<Student> {
    let updated = atomic(conn, |conn| {
        let current = fetch_student(conn, id)?;
        if patch.is_empty() {
            return Ok(current);
        }

        let (name, age, email) = patch.apply(&current.name, current.age, &current.email)?;
        conn.execute(
            "UPDATE students SET name = ?1, age = ?2, email = ?3 WHERE id = ?4",
            params![name, age, email, id],
        )?;
        Ok(Student {
            name,
            age,
            email,
            ..current
        })
    })?;

    info!(student = %id, "updated student");
    Ok(updated)
}

/// Remove a student. The `enrollments` foreign key cascades, so every course
/// roster drops the student in the same statement.
pub fn delete_student(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM students WHERE id = ?1", [id])?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Student, id))
    } else {
        info!(student = %id, "deleted student");
        Ok(())
    }
}
