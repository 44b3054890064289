use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use rusqlite::backup::{Backup, StepResult};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Result, SchoolError};

/// Pages copied per backup step. The store is small, so a generous step keeps
/// the copy to a handful of iterations.
const PAGES_PER_STEP: i32 = 256;
/// Pause between attempts while the destination is busy or locked.
const BUSY_PAUSE: Duration = Duration::from_millis(50);
/// Busy or locked steps tolerated before giving up.
const MAX_BUSY_RETRIES: u32 = 40;

/// Copy the live database into `dest` with SQLite's online backup API. The
/// copy is consistent even while the source connection is open, and works for
/// in-memory stores that have no file to copy.
///
/// `source` is the file behind `conn`, if any; a destination resolving to the
/// same file is refused.
pub fn backup_to(conn: &Connection, source: Option<&Path>, dest: &Path) -> Result<()> {
    if let Some(source) = source {
        if same_file(source, dest) {
            return Err(SchoolError::io(
                format!("refusing to back up database onto itself ({})", dest.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "destination is the live database"),
            ));
        }
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| SchoolError::io("failed to create backup directory", err))?;
    }

    let mut target = Connection::open(dest).map_err(|err| backup_failed(dest, err))?;
    // Retries below are paced by BUSY_PAUSE, not by SQLite's busy handler.
    target
        .busy_timeout(Duration::ZERO)
        .map_err(|err| backup_failed(dest, err))?;
    let backup = Backup::new(conn, &mut target).map_err(|err| backup_failed(dest, err))?;

    let mut retries = 0;
    loop {
        match backup
            .step(PAGES_PER_STEP)
            .map_err(|err| backup_failed(dest, err))?
        {
            StepResult::Done => break,
            StepResult::More => retries = 0,
            _ => {
                retries += 1;
                if retries > MAX_BUSY_RETRIES {
                    warn!(dest = %dest.display(), "backup destination stayed busy");
                    return Err(SchoolError::io(
                        format!("failed to back up database to {}", dest.display()),
                        io::Error::new(io::ErrorKind::WouldBlock, "destination is busy or locked"),
                    ));
                }
                thread::sleep(BUSY_PAUSE);
            }
        }
    }

    info!(dest = %dest.display(), "backed up database");
    Ok(())
}

/// Both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn backup_failed(dest: &Path, err: rusqlite::Error) -> SchoolError {
    SchoolError::io(
        format!("failed to back up database to {}", dest.display()),
        io::Error::other(err),
    )
}
