use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Counts, Course, CoursePatch, Instructor, NewCourse, NewPerson, PersonPatch, SearchResults,
    Student,
};

use super::connection::{atomic, open_in_memory, open_store};
use super::{backup, courses, instructors, search, students};

/// Everything a front-end may ask of the store. Both adapters are written
/// against this trait, so neither reaches for SQL directly.
pub trait SchoolRepository {
    fn create_student(&self, request: &NewPerson) -> Result<Student>;
    fn student(&self, id: &str) -> Result<Student>;
    fn update_student(&self, id: &str, patch: &PersonPatch) -> Result<Student>;
    fn delete_student(&self, id: &str) -> Result<()>;
    fn students(&self) -> Result<Vec<Student>>;

    fn create_instructor(&self, request: &NewPerson) -> Result<Instructor>;
    fn instructor(&self, id: &str) -> Result<Instructor>;
    fn update_instructor(&self, id: &str, patch: &PersonPatch) -> Result<Instructor>;
    fn delete_instructor(&self, id: &str) -> Result<()>;
    fn instructors(&self) -> Result<Vec<Instructor>>;

    fn create_course(&self, request: &NewCourse) -> Result<Course>;
    fn course(&self, id: &str) -> Result<Course>;
    fn update_course(&self, id: &str, patch: &CoursePatch) -> Result<Course>;
    fn delete_course(&self, id: &str) -> Result<()>;
    fn courses(&self) -> Result<Vec<Course>>;

    fn assign_instructor(&self, course_id: &str, instructor_id: &str) -> Result<()>;
    fn clear_instructor(&self, course_id: &str) -> Result<()>;
    fn enroll_student(&self, course_id: &str, student_id: &str) -> Result<()>;
    fn unenroll_student(&self, course_id: &str, student_id: &str) -> Result<()>;

    fn search(&self, query: &str) -> Result<SearchResults>;
    fn counts(&self) -> Result<Counts>;
    fn clear_all(&self) -> Result<()>;

    /// Run `work` as one transaction. Repository calls made from inside the
    /// closure join it; an error rolls all of them back.
    fn atomically(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()>;

    fn backup_to(&self, dest: &Path) -> Result<()>;
}

/// `SchoolRepository` backed by a single SQLite connection held for the
/// lifetime of the process.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            conn: open_store(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: open_in_memory()?,
            path: None,
        })
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SchoolRepository for SqliteStore {
    fn create_student(&self, request: &NewPerson) -> Result<Student> {
        students::create_student(&self.conn, request)
    }

    fn student(&self, id: &str) -> Result<Student> {
        students::fetch_student(&self.conn, id)
    }

    fn update_student(&self, id: &str, patch: &PersonPatch) -> Result<Student> {
        students::update_student(&self.conn, id, patch)
    }

    fn delete_student(&self, id: &str) -> Result<()> {
        students::delete_student(&self.conn, id)
    }

    fn students(&self) -> Result<Vec<Student>> {
        students::fetch_students(&self.conn)
    }

    fn create_instructor(&self, request: &NewPerson) -> Result<Instructor> {
        instructors::create_instructor(&self.conn, request)
    }

    fn instructor(&self, id: &str) -> Result<Instructor> {
        instructors::fetch_instructor(&self.conn, id)
    }

    fn update_instructor(&self, id: &str, patch: &PersonPatch) -> Result<Instructor> {
        instructors::update_instructor(&self.conn, id, patch)
    }

    fn delete_instructor(&self, id: &str) -> Result<()> {
        instructors::delete_instructor(&self.conn, id)
    }

    fn instructors(&self) -> Result<Vec<Instructor>> {
        instructors::fetch_instructors(&self.conn)
    }

    fn create_course(&self, request: &NewCourse) -> Result<Course> {
        courses::create_course(&self.conn, request)
    }

    fn course(&self, id: &str) -> Result<Course> {
        courses::fetch_course(&self.conn, id)
    }

    fn update_course(&self, id: &str, patch: &CoursePatch) -> Result<Course> {
        courses::update_course(&self.conn, id, patch)
    }

    fn delete_course(&self, id: &str) -> Result<()> {
        courses::delete_course(&self.conn, id)
    }

    fn courses(&self) -> Result<Vec<Course>> {
        courses::fetch_courses(&self.conn)
    }

    fn assign_instructor(&self, course_id: &str, instructor_id: &str) -> Result<()> {
        courses::assign_instructor(&self.conn, course_id, instructor_id)
    }

    fn clear_instructor(&self, course_id: &str) -> Result<()> {
        courses::clear_instructor(&self.conn, course_id)
    }

    fn enroll_student(&self, course_id: &str, student_id: &str) -> Result<()> {
        courses::enroll_student(&self.conn, course_id, student_id)
    }

    fn unenroll_student(&self, course_id: &str, student_id: &str) -> Result<()> {
        courses::unenroll_student(&self.conn, course_id, student_id)
    }

    fn search(&self, query: &str) -> Result<SearchResults> {
        search::search(&self.conn, query)
    }

    fn counts(&self) -> Result<Counts> {
        search::counts(&self.conn)
    }

    fn clear_all(&self) -> Result<()> {
        search::clear_all(&self.conn)
    }

    fn atomically(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        atomic(&self.conn, |_| work())
    }

    fn backup_to(&self, dest: &Path) -> Result<()> {
        backup::backup_to(&self.conn, self.path(), dest)
    }
}
