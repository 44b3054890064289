use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Counts, SearchResults};

use super::connection::atomic;
use super::courses::fetch_courses;
use super::instructors::fetch_instructors;
use super::students::fetch_students;

/// Case-insensitive substring search over the visible columns of every table.
/// Matching happens in Rust so case folding covers all of Unicode, not just
/// the ASCII range SQLite's `lower()` handles. A blank query matches
/// everything.
pub fn search(conn: &Connection, query: &str) -> Result<SearchResults> {
    let needle = query.trim().to_lowercase();
    let matches = |field: &str| field.to_lowercase().contains(&needle);

    let results = SearchResults {
        students: fetch_students(conn)?
            .into_iter()
            .filter(|s| matches(&s.id) || matches(&s.name) || matches(&s.email))
            .collect(),
        instructors: fetch_instructors(conn)?
            .into_iter()
            .filter(|i| matches(&i.id) || matches(&i.name) || matches(&i.email))
            .collect(),
        courses: fetch_courses(conn)?
            .into_iter()
            .filter(|c| {
                matches(&c.id)
                    || matches(&c.name)
                    || c.instructor.as_deref().is_some_and(|id| matches(id))
            })
            .collect(),
    };
    debug!(query = %needle, hits = results.total(), "search");
    Ok(results)
}

pub fn counts(conn: &Connection) -> Result<Counts> {
    let count = |table: &str| -> Result<usize> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    };

    Ok(Counts {
        students: count("students")?,
        instructors: count("instructors")?,
        courses: count("courses")?,
    })
}

/// Remove every row from every table in one transaction.
pub fn clear_all(conn: &Connection) -> Result<()> {
    atomic(conn, |conn| {
        conn.execute("DELETE FROM enrollments", [])?;
        conn.execute("DELETE FROM courses", [])?;
        conn.execute("DELETE FROM students", [])?;
        conn.execute("DELETE FROM instructors", [])?;
        Ok(())
    })?;
    info!("cleared all records");
    Ok(())
}
