use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{EntityKind, Result, SchoolError};
use crate::models::{Instructor, NewPerson, PersonPatch};

use super::connection::{atomic, collect_ids, exists, map_unique_constraint};

const TAUGHT_COURSES: &str = "SELECT id FROM courses WHERE instructor_id = ?1 ORDER BY id";

fn instructor_from_row(row: &Row<'_>) -> rusqlite::Result<Instructor> {
    Ok(Instructor {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        email: row.get(3)?,
        courses: Vec::new(),
    })
}

/// Every instructor ordered by id, each with the courses they teach.
pub fn fetch_instructors(conn: &Connection) -> Result<Vec<Instructor>> {
    let mut stmt = conn.prepare("SELECT id, name, age, email FROM instructors ORDER BY id")?;
    let mut instructors = stmt
        .query_map([], instructor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for instructor in &mut instructors {
        instructor.courses = collect_ids(conn, TAUGHT_COURSES, &instructor.id)?;
    }
    Ok(instructors)
}

pub fn fetch_instructor(conn: &Connection, id: &str) -> Result<Instructor> {
    let instructor = conn
        .query_row(
            "SELECT id, name, age, email FROM instructors WHERE id = ?1",
            [id],
            instructor_from_row,
        )
        .optional()?
        .ok_or_else(|| SchoolError::not_found(EntityKind::Instructor, id))?;

    Ok(Instructor {
        courses: collect_ids(conn, TAUGHT_COURSES, id)?,
        ..instructor
    })
}

pub fn create_instructor(conn: &Connection, request: &NewPerson) -> Result<Instructor> {
    let person = request.validated()?;

    atomic(conn, |conn| {
        if exists(conn, "instructors", &person.id)? {
            return Err(SchoolError::duplicate(EntityKind::Instructor, &person.id));
        }
        conn.execute(
            "INSERT INTO instructors (id, name, age, email) VALUES (?1, ?2, ?3, ?4)",
            params![person.id, person.name, person.age, person.email],
        )
        .map_err(|err| map_unique_constraint(err, EntityKind::Instructor, &person.id))?;
        Ok(())
    })?;

    info!(instructor = %person.id, "created instructor");
    Ok(Instructor {
        id: person.id,
        name: person.name,
        age: person.age,
        email: person.email,
        courses: Vec::new(),
    })
}

pub fn update_instructor(conn: &Connection, id: &str, patch: &PersonPatch) -> Result<Instructor> {
    let updated = atomic(conn, |conn| {
        let current = fetch_instructor(conn, id)?;
        if patch.is_empty() {
            return Ok(current);
        }

        let (name, age, email) = patch.apply(&current.name, current.age, &current.email)?;
        conn.execute(
            "UPDATE instructors SET name = ?1, age = ?2, email = ?3 WHERE id = ?4",
            params![name, age, email, id],
        )?;
        Ok(Instructor {
            name,
            age,
            email,
            ..current
        })
    })?;

    info!(instructor = %id, "updated instructor");
    Ok(updated)
}

/// Delete an instructor. `ON DELETE SET NULL` on `courses.instructor_id`
/// leaves their former courses unassigned rather than dangling.
pub fn delete_instructor(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM instructors WHERE id = ?1", [id])?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Instructor, id))
    } else {
        info!(instructor = %id, "deleted instructor");
        Ok(())
    }
}
