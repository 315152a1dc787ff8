use super::index::ChunkIndex;
use super::record::RECORD_SIZE;
use crate::error::DatabaseError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Layout of the data chunks of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbMeta {
    /// Number of records in each chunk, except for the last chunk
    pub chunk_size: u32,
    /// Number of chunks in the database
    pub chunk_count: u32,
    /// Number of total records in the database
    pub total_record: u64,
}

impl DbMeta {
    /// Create the layout for `total_record` records split into chunks of `chunk_size`.
    pub fn new(chunk_size: u32, total_record: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_count: Self::expected_chunk_count(chunk_size, total_record).unwrap_or(u32::MAX),
            total_record,
        }
    }

    /// Chunk count implied by the chunk size and total record count.
    ///
    /// `None` if the records can't be laid out: a zero chunk size with records,
    /// or more chunks than a `u32` can count.
    pub fn expected_chunk_count(chunk_size: u32, total_record: u64) -> Option<u32> {
        if chunk_size == 0 {
            return (total_record == 0).then_some(0);
        }
        u32::try_from(total_record.div_ceil(chunk_size as u64)).ok()
    }

    /// Get the number of records in a chunk
    #[inline]
    pub fn chunk_len(&self, chunk_id: u32) -> usize {
        let (start, end) = self.record_range(chunk_id);
        (end - start) as usize
    }

    /// Get the byte size of a chunk
    #[inline]
    pub fn chunk_size_bytes(&self, chunk_id: u32) -> usize {
        self.chunk_len(chunk_id) * RECORD_SIZE
    }

    /// Get the record id range in a chunk [start, end)
    #[inline]
    pub fn record_range(&self, chunk_id: u32) -> (u64, u64) {
        let chunk_size = self.chunk_size as u64;
        let start = (chunk_id as u64 * chunk_size).min(self.total_record);
        let end = self.total_record.min(start + chunk_size);
        (start, end)
    }

    /// The chunk holding a recipe id, `None` if out of range
    #[inline]
    pub fn chunk_of(&self, recipe_id: u64) -> Option<u32> {
        if recipe_id >= self.total_record {
            return None;
        }
        let chunk = recipe_id.checked_div(self.chunk_size as u64)?;
        u32::try_from(chunk).ok()
    }
}

/// Contents of `index.yaml`: the layout plus one index entry per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    pub meta: DbMeta,
    pub chunks: Vec<ChunkIndex>,
}

/// Save the database index file to the given path
pub fn save_index(path: impl AsRef<Path>, index: &IndexFile) -> Result<(), DatabaseError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(writer, index)?;
    Ok(())
}

/// Load the database index file and check that it describes a consistent layout
pub fn load_index(path: impl AsRef<Path>) -> Result<IndexFile, DatabaseError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DatabaseError::MissingIndex);
    }
    let reader = BufReader::new(File::open(path)?);
    let index: IndexFile = serde_yaml::from_reader(reader)?;

    let meta = index.meta;
    if meta.chunk_size == 0 && meta.total_record > 0 {
        // a chunk holds at least one record
        return Err(DatabaseError::InvalidChunkSize(RECORD_SIZE, 0));
    }
    let expected = DbMeta::expected_chunk_count(meta.chunk_size, meta.total_record)
        .ok_or(DatabaseError::InvalidIndexChunkCount(u32::MAX, meta.chunk_count))?;
    if meta.chunk_count != expected {
        return Err(DatabaseError::InvalidIndexChunkCount(
            expected,
            meta.chunk_count,
        ));
    }
    if index.chunks.len() != expected as usize {
        return Err(DatabaseError::InvalidIndexChunkCount(
            expected,
            index.chunks.len() as u32,
        ));
    }
    for (position, chunk) in index.chunks.iter().enumerate() {
        let chunk_id = position as u32;
        if chunk.chunk != chunk_id {
            return Err(DatabaseError::MissingChunk(chunk_id));
        }
        let expected_len = meta.chunk_len(chunk_id);
        if chunk.record_count as usize != expected_len {
            return Err(DatabaseError::InvalidChunkSize(
                expected_len * RECORD_SIZE,
                chunk.record_count as usize * RECORD_SIZE,
            ));
        }
    }
    Ok(index)
}

/// Get the index file path from database directory
pub fn index_path(db_path: impl AsRef<Path>) -> PathBuf {
    db_path.as_ref().join("index.yaml")
}

/// Get the catalog file path from database directory
pub fn catalog_path(db_path: impl AsRef<Path>) -> PathBuf {
    db_path.as_ref().join("catalog.yaml")
}

/// Get the temporary result directory from database directory
pub fn temp_path(db_path: impl AsRef<Path>) -> PathBuf {
    db_path.as_ref().join("temp")
}

/// Get the lock file path from database directory
pub fn lock_path(db_path: impl AsRef<Path>) -> PathBuf {
    db_path.as_ref().join(".lock")
}

/// Get the chunk path for a given chunk ID in the database directory
#[inline]
pub fn chunk_path(db_path: impl AsRef<Path>, chunk_id: u32) -> PathBuf {
    db_path.as_ref().join(format!("chunk_{}.rdb", chunk_id))
}
