//! Timestamped backups of the live store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::db::SchoolRepository;
use crate::error::{Result, SchoolError};

/// Name a backup after the moment it was taken, e.g. `school-20250102-030405.db`.
pub fn backup_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("school-{}.db", now.format("%Y%m%d-%H%M%S"))
}

/// Copy the store into `dir` under a timestamped name and return the path of
/// the new file. The directory is created when missing.
pub fn backup_to_folder<R, Tz>(repo: &R, dir: &Path, now: &DateTime<Tz>) -> Result<PathBuf>
where
    R: SchoolRepository + ?Sized,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    fs::create_dir_all(dir).map_err(|err| {
        SchoolError::io(format!("failed to create {}", dir.display()), err)
    })?;

    let dest = dir.join(backup_file_name(now));
    repo.backup_to(&dest)?;
    Ok(dest)
}
