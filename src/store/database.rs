use super::chunk::Chunk;
use super::index::ChunkIndex;
use super::meta::{self, DbMeta};
use super::record::Recipe;
use crate::catalog::Catalog;
use crate::error::DatabaseError;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Main database handle.
///
/// Loaded once and shared read-only; every read opens its own file handle,
/// so concurrent scans need no locking.
pub struct Database {
    /// Lock file to prevent multiple processes from opening the database
    lock: Option<File>,
    /// Path to the database folder (containing index.yaml, the chunks, etc)
    path: PathBuf,
    meta: DbMeta,
    /// The index data. i-th element corresponds to the i-th chunk
    index: Box<[ChunkIndex]>,
    catalog: Catalog,
}

impl Database {
    /// Open a database, taking an exclusive lock on its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let lock_path = meta::lock_path(&path);
        info!("locking at {}", lock_path.display());
        let lock_file = File::create(&lock_path)?;
        if let Err(e) = lock_file.try_lock_exclusive() {
            error!("failed to lock database: {}", e);
            return Err(DatabaseError::Locked);
        }

        Self::open_locked(&path, Some(lock_file)).inspect_err(|_| remove_lock_file(&lock_path))
    }

    /// Open a database without checking the lock.
    pub fn open_unlocked(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        info!("bypassing lock check");
        Self::open_locked(path, None)
    }

    /// Open a database, assuming the caller already holds the lock (if any)
    pub fn open_locked(path: impl AsRef<Path>, lock: Option<File>) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        info!("opening database at {}", path.display());

        debug!("loading index.yaml");
        let index_file = meta::load_index(meta::index_path(&path))?;
        debug!("loading catalog.yaml");
        let catalog = Catalog::load(meta::catalog_path(&path))?;

        let meta = index_file.meta;
        for chunk_id in 0..meta.chunk_count {
            let chunk_path = meta::chunk_path(&path, chunk_id);
            if !chunk_path.exists() {
                return Err(DatabaseError::MissingChunk(chunk_id));
            }
            let size = fs::metadata(&chunk_path)?.len() as usize;
            let expected = meta.chunk_size_bytes(chunk_id);
            if size != expected {
                return Err(DatabaseError::InvalidChunkSize(expected, size));
            }
        }

        info!(
            records = meta.total_record,
            chunks = meta.chunk_count,
            groups = catalog.groups().len(),
            "database opened"
        );
        Ok(Self {
            lock,
            path,
            meta,
            index: index_file.chunks.into_boxed_slice(),
            catalog,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &DbMeta {
        &self.meta
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> &[ChunkIndex] {
        &self.index
    }

    pub fn chunk_count(&self) -> u32 {
        self.meta.chunk_count
    }

    pub fn total_record(&self) -> u64 {
        self.meta.total_record
    }

    /// Open a chunk for sequential or seeking reads
    pub fn open_chunk(&self, chunk_id: u32) -> Result<Chunk, DatabaseError> {
        if chunk_id >= self.meta.chunk_count {
            return Err(DatabaseError::MissingChunk(chunk_id));
        }
        Chunk::open(&self.meta, chunk_id, meta::chunk_path(&self.path, chunk_id))
    }

    /// Read a single recipe by id.
    pub fn get(&self, recipe_id: u64) -> Result<Recipe, DatabaseError> {
        let chunk_id = self
            .meta
            .chunk_of(recipe_id)
            .ok_or(DatabaseError::InvalidRecipeId(recipe_id))?;
        self.open_chunk(chunk_id)?.read(recipe_id)
    }

    /// Recompute the checksum of a chunk and compare it with the index.
    pub fn verify_chunk(&self, chunk_id: u32) -> Result<(), DatabaseError> {
        let expected = self
            .index
            .get(chunk_id as usize)
            .ok_or(DatabaseError::MissingChunk(chunk_id))?;
        let file = File::open(meta::chunk_path(&self.path, chunk_id))?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let actual = format!("{:x}", hasher.finalize());
        if actual != expected.sha256 {
            error!(
                chunk = chunk_id,
                expected = %expected.sha256,
                actual = %actual,
                "chunk checksum mismatch"
            );
            return Err(DatabaseError::ChecksumMismatch(chunk_id));
        }
        Ok(())
    }

    /// Delete the temp directory and release the lock. Called on drop.
    ///
    /// Without the lock another process may own the temp directory, so it is left alone.
    pub fn close(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        info!("closing database");
        if let Err(e) = self.delete_temporary() {
            error!("failed to delete temporary directory: {}", e);
        }
        if let Err(e) = FileExt::unlock(&lock) {
            error!("failed to unlock database: {}", e);
        }
        remove_lock_file(&meta::lock_path(&self.path));
    }
}

fn remove_lock_file(lock_path: &Path) {
    if lock_path.exists() {
        if let Err(e) = fs::remove_file(lock_path) {
            error!("failed to remove lock file: {}", e);
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}
