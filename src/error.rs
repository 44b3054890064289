//! Error type shared by the persistence, snapshot, and backup layers.
//!
//! Adapters wrap these in `anyhow` for display, but the library keeps the
//! variants typed so callers can tell a missing record from a bad field.

use std::fmt;
use std::io;

use thiserror::Error;

/// The three record types the store manages. Used to label errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Instructor,
    Course,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Instructor => "instructor",
            EntityKind::Course => "course",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SchoolError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{kind} {id} already exists")]
    DuplicateIdentifier { kind: EntityKind, id: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),
}

impl SchoolError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        SchoolError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        SchoolError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, id: &str) -> Self {
        SchoolError::DuplicateIdentifier {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SchoolError::MalformedSnapshot(reason.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        SchoolError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for file-system and storage failures, as opposed to problems with
    /// the caller's input.
    pub fn is_io(&self) -> bool {
        matches!(self, SchoolError::Io { .. } | SchoolError::Store(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchoolError::NotFound { .. })
    }
}

pub type Result<T, E = SchoolError> = std::result::Result<T, E>;
