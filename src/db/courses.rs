use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{EntityKind, Result, SchoolError};
use crate::models::{validate_name, Course, CoursePatch, NewCourse};

use super::connection::{atomic, collect_ids, exists, map_unique_constraint, require};

const COURSE_ROSTER: &str =
    "SELECT student_id FROM enrollments WHERE course_id = ?1 ORDER BY student_id";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        instructor: row.get(2)?,
        students: Vec::new(),
    })
}

/// All courses ordered by id with instructor and roster resolved.
pub fn fetch_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare("SELECT id, name, instructor_id FROM courses ORDER BY id")?;
    let mut courses = stmt
        .query_map([], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for course in &mut courses {
        course.students = collect_ids(conn, COURSE_ROSTER, &course.id)?;
    }
    Ok(courses)
}

pub fn fetch_course(conn: &Connection, id: &str) -> Result<Course> {
    let mut course = conn
        .query_row(
            "SELECT id, name, instructor_id FROM courses WHERE id = ?1",
            [id],
            course_from_row,
        )
        .optional()?
        .ok_or_else(|| SchoolError::not_found(EntityKind::Course, id))?;

    course.students = collect_ids(conn, COURSE_ROSTER, id)?;
    Ok(course)
}

/// Insert a course. When the request names an instructor it must already
/// exist; the foreign key would reject it anyway but this gives a `NotFound`
/// naming the missing instructor.
pub fn create_course(conn: &Connection, request: &NewCourse) -> Result<Course> {
    let course = request.validated()?;

    atomic(conn, |conn| {
        if exists(conn, "courses", &course.id)? {
            return Err(SchoolError::duplicate(EntityKind::Course, &course.id));
        }
        if let Some(instructor) = &course.instructor {
            require(conn, EntityKind::Instructor, instructor)?;
        }
        conn.execute(
            "INSERT INTO courses (id, name, instructor_id) VALUES (?1, ?2, ?3)",
            params![course.id, course.name, course.instructor],
        )
        .map_err(|err| map_unique_constraint(err, EntityKind::Course, &course.id))?;
        Ok(())
    })?;

    info!(course = %course.id, "created course");
    Ok(Course {
        id: course.id,
        name: course.name,
        instructor: course.instructor,
        students: Vec::new(),
    })
}

/// Rename a course. An empty patch returns the stored course untouched.
pub fn update_course(conn: &Connection, id: &str, patch: &CoursePatch) -> Result<Course> {
    let Some(name) = &patch.name else {
        return fetch_course(conn, id);
    };
    let name = validate_name(name)?;

    let updated = atomic(conn, |conn| {
        let mut current = fetch_course(conn, id)?;
        conn.execute(
            "UPDATE courses SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        current.name = name.clone();
        Ok(current)
    })?;

    info!(course = %id, "updated course");
    Ok(updated)
}

/// Delete a course. Enrollment rows cascade away; the instructor's teaching
/// set is derived from this table so it shrinks with the row.
pub fn delete_course(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM courses WHERE id = ?1", [id])?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Course, id))
    } else {
        info!(course = %id, "deleted course");
        Ok(())
    }
}

/// Point a course at an instructor, replacing any previous assignment.
pub fn assign_instructor(conn: &Connection, course_id: &str, instructor_id: &str) -> Result<()> {
    atomic(conn, |conn| {
        require(conn, EntityKind::Course, course_id)?;
        require(conn, EntityKind::Instructor, instructor_id)?;
        conn.execute(
            "UPDATE courses SET instructor_id = ?1 WHERE id = ?2",
            params![instructor_id, course_id],
        )?;
        Ok(())
    })?;

    info!(course = %course_id, instructor = %instructor_id, "assigned instructor");
    Ok(())
}

pub fn clear_instructor(conn: &Connection, course_id: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE courses SET instructor_id = NULL WHERE id = ?1",
        [course_id],
    )?;

    if updated == 0 {
        Err(SchoolError::not_found(EntityKind::Course, course_id))
    } else {
        info!(course = %course_id, "cleared instructor");
        Ok(())
    }
}

/// Enroll a student. `INSERT OR IGNORE` makes repeated requests a no-op, so
/// the roster never holds the same student twice.
pub fn enroll_student(conn: &Connection, course_id: &str, student_id: &str) -> Result<()> {
    let inserted = atomic(conn, |conn| {
        require(conn, EntityKind::Course, course_id)?;
        require(conn, EntityKind::Student, student_id)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO enrollments (course_id, student_id) VALUES (?1, ?2)",
            params![course_id, student_id],
        )?;
        Ok(inserted)
    })?;

    if inserted > 0 {
        info!(course = %course_id, student = %student_id, "enrolled student");
    }
    Ok(())
}

/// Drop an enrollment. Both records must exist; a pair that was never
/// enrolled is left as is.
pub fn unenroll_student(conn: &Connection, course_id: &str, student_id: &str) -> Result<()> {
    let deleted = atomic(conn, |conn| {
        require(conn, EntityKind::Course, course_id)?;
        require(conn, EntityKind::Student, student_id)?;
        let deleted = conn.execute(
            "DELETE FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
            params![course_id, student_id],
        )?;
        Ok(deleted)
    })?;

    if deleted > 0 {
        info!(course = %course_id, student = %student_id, "unenrolled student");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::db::connection::open_in_memory;

    /// In-memory log sink shared with the subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged(work: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, work);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn empty_course_patch_is_a_silent_read() {
        let conn = open_in_memory().unwrap();
        create_course(&conn, &NewCourse::new("C1", "Algorithms")).unwrap();

        let output = logged(|| {
            let course = update_course(&conn, "C1", &CoursePatch::default()).unwrap();
            assert_eq!(course.name, "Algorithms");
        });
        assert!(!output.contains("updated course"), "{output}");

        let output = logged(|| {
            update_course(
                &conn,
                "C1",
                &CoursePatch {
                    name: Some("Advanced Algorithms".into()),
                },
            )
            .unwrap();
        });
        assert!(output.contains("updated course"), "{output}");
        assert_eq!(fetch_course(&conn, "C1").unwrap().name, "Advanced Algorithms");
    }

    #[test]
    fn empty_course_patch_on_missing_course_is_not_found() {
        let conn = open_in_memory().unwrap();
        let err = update_course(&conn, "C9", &CoursePatch::default()).unwrap_err();
        assert!(err.is_not_found());
    }
}
