//! School records kept in SQLite: students, instructors and courses, with
//! JSON snapshots, file backups, a command-line adapter and a Ratatui TUI.
//!
//! The binary wires these together; tests and other tools can use the
//! repository and snapshot layers directly.
pub mod backup;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod snapshot;
pub mod ui;

/// The store handle and the trait every front-end talks to.
pub use db::{SchoolRepository, SqliteStore};

pub use error::{EntityKind, Result, SchoolError};

pub use models::{
    Counts, Course, CoursePatch, Instructor, NewCourse, NewPerson, PersonPatch, SearchResults,
    Student,
};

pub use snapshot::{export_snapshot, import_snapshot, Snapshot};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
