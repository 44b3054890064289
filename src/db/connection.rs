use std::fs;
use std::path::Path;

use rusqlite::{ffi, Connection, Error as SqlError};
use tracing::{debug, info};

use crate::error::{EntityKind, Result, SchoolError};

/// Open (or create) the database file, run lazy schema creation, and return a
/// live connection. Missing parent directories are created first so a fresh
/// data directory works on first launch.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| SchoolError::io("failed to create data directory", err))?;
    }

    let conn = Connection::open(path)?;
    ensure_schema(&conn)?;
    info!(path = %path.display(), "opened school database");
    Ok(conn)
}

/// Private in-memory database with the full schema. Tests use it heavily.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Toggle `PRAGMA foreign_keys = ON` and create the tables if absent. The
/// foreign keys carry the delete cascades: dropping an instructor nulls the
/// course column, dropping a course or student removes its enrollment rows.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            age INTEGER NOT NULL CHECK (age >= 0),
            email TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructors (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            age INTEGER NOT NULL CHECK (age >= 0),
            email TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            instructor_id TEXT NULL,
            FOREIGN KEY(instructor_id) REFERENCES instructors(id) ON DELETE SET NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments (
            course_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            PRIMARY KEY (course_id, student_id),
            FOREIGN KEY(course_id) REFERENCES courses(id) ON DELETE CASCADE,
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
        )",
        [],
    )?;

    debug!("schema ready");
    Ok(())
}

/// Run `work` inside a transaction and commit on success. When the connection
/// is already inside one (snapshot import wraps many operations), the work
/// joins it and the outer caller decides whether to commit.
pub(crate) fn atomic<T>(conn: &Connection, work: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    if !conn.is_autocommit() {
        return work(conn);
    }

    let tx = conn.unchecked_transaction()?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Check whether a row with the given primary key exists in `table`.
pub(crate) fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    let found: bool = conn.query_row(&sql, [id], |row| row.get(0))?;
    Ok(found)
}

/// Fail with `NotFound` unless the row exists.
pub(crate) fn require(conn: &Connection, kind: EntityKind, id: &str) -> Result<()> {
    if exists(conn, table_for(kind), id)? {
        Ok(())
    } else {
        Err(SchoolError::not_found(kind, id))
    }
}

pub(crate) fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Student => "students",
        EntityKind::Instructor => "instructors",
        EntityKind::Course => "courses",
    }
}

/// Coerce a primary-key clash into `DuplicateIdentifier`. The pre-insert
/// existence check normally catches this first; the mapping covers the race
/// with an external writer.
pub(crate) fn map_unique_constraint(err: SqlError, kind: EntityKind, id: &str) -> SchoolError {
    let is_key_clash = matches!(
        &err,
        SqlError::SqliteFailure(ffi::Error { extended_code, .. }, _)
            if *extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || *extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    );
    if is_key_clash {
        SchoolError::duplicate(kind, id)
    } else {
        err.into()
    }
}

/// Collect a single text column from a query into a `Vec<String>`.
pub(crate) fn collect_ids(conn: &Connection, sql: &str, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('students', 'instructors', 'courses', 'enrollments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn atomic_rolls_back_on_error() {
        let conn = open_in_memory().unwrap();
        let outcome: Result<()> = atomic(&conn, |conn| {
            conn.execute(
                "INSERT INTO students (id, name, age, email) VALUES ('S1', 'Ada', 20, 'a@b.c')",
                [],
            )?;
            Err(SchoolError::malformed("abort"))
        });
        assert!(outcome.is_err());
        assert!(!exists(&conn, "students", "S1").unwrap());
        assert!(conn.is_autocommit());
    }

    #[test]
    fn nested_atomic_joins_outer_transaction() {
        let conn = open_in_memory().unwrap();
        let outcome: Result<()> = atomic(&conn, |outer| {
            atomic(outer, |inner| {
                inner.execute(
                    "INSERT INTO students (id, name, age, email) VALUES ('S1', 'Ada', 20, 'a@b.c')",
                    [],
                )?;
                Ok(())
            })?;
            Err(SchoolError::malformed("abort"))
        });
        assert!(outcome.is_err());
        assert!(!exists(&conn, "students", "S1").unwrap());
    }
}
