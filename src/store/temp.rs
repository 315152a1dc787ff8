use super::database::Database;
use super::meta;
use crate::error::DatabaseError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

/// Attempts at finding an unused directory name before giving up
const MAX_ATTEMPTS: u64 = 100;

static NEXT_TEMP_ID: AtomicU64 = AtomicU64::new(0);

/// A directory under `<db>/temp/` holding the ids of one result, one file per chunk.
///
/// The directory is removed when the last handle is dropped.
#[derive(Debug)]
pub struct TempResult {
    path: PathBuf,
}

impl TempResult {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File holding the ids of `chunk`
    pub fn segment_path(&self, chunk: u32) -> PathBuf {
        self.path.join(chunk.to_string())
    }
}

impl Drop for TempResult {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("deleted temporary result {}", self.path.display()),
            // the whole temp directory is gone when the database was closed first
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!(
                "failed to delete temporary result {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Database {
    /// Create a new location in the temp directory for storing a result.
    pub fn new_temporary(&self) -> Result<TempResult, DatabaseError> {
        let temp_path = meta::temp_path(self.path());
        fs::create_dir_all(&temp_path)?;
        let pid = std::process::id();
        for _ in 0..MAX_ATTEMPTS {
            let id = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = temp_path.join(format!("{:08x}{:08x}", pid, id));
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!("created temporary result {}", path.display());
                    return Ok(TempResult { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(DatabaseError::TooManyTemporary)
    }

    /// Delete the temp directory and every result in it.
    pub fn delete_temporary(&self) -> Result<(), DatabaseError> {
        let path = meta::temp_path(self.path());
        if !path.exists() {
            return Ok(());
        }
        info!("deleting temporary directory {}", path.display());
        fs::remove_dir_all(path)?;
        Ok(())
    }
}
