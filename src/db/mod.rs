//! Persistence module split across logical submodules. Each entity file holds
//! free functions over an explicit `&Connection`; `SqliteStore` bundles them
//! behind the `SchoolRepository` trait for the front-ends.

mod backup;
mod connection;
mod courses;
mod instructors;
mod repository;
mod search;
mod students;

pub use backup::backup_to;
pub use connection::{ensure_schema, open_in_memory, open_store};
pub use courses::{
    assign_instructor, clear_instructor, create_course, delete_course, enroll_student,
    fetch_course, fetch_courses, unenroll_student, update_course,
};
pub use instructors::{
    create_instructor, delete_instructor, fetch_instructor, fetch_instructors, update_instructor,
};
pub use repository::{SchoolRepository, SqliteStore};
pub use search::{clear_all, counts, search};
pub use students::{create_student, delete_student, fetch_student, fetch_students, update_student};
