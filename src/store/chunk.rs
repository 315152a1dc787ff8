use super::meta::DbMeta;
use super::record::{RECORD_SIZE, Recipe};
use crate::error::DatabaseError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A data chunk opened for reading.
///
/// Iterating yields records in id order; [`Chunk::read`] seeks to any id
/// inside the chunk.
pub struct Chunk {
    chunk_id: u32,
    reader: BufReader<File>,
    /// The id the reader is currently positioned at
    recipe_next: u64,
    recipe_start: u64,
    /// One past the last id in the chunk
    recipe_end: u64,
}

impl Chunk {
    /// Open a chunk for reading recipes, checking its size against the layout.
    pub fn open(meta: &DbMeta, chunk_id: u32, path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatabaseError::MissingChunk(chunk_id));
        }
        let file = File::open(path)?;
        let file_size = file.metadata()?.len() as usize;
        let expected_size = meta.chunk_size_bytes(chunk_id);
        if file_size != expected_size {
            return Err(DatabaseError::InvalidChunkSize(expected_size, file_size));
        }
        let (start, end) = meta.record_range(chunk_id);
        Ok(Self {
            chunk_id,
            reader: BufReader::new(file),
            recipe_next: start,
            recipe_start: start,
            recipe_end: end,
        })
    }

    pub fn id(&self) -> u32 {
        self.chunk_id
    }

    /// Get the id range [start, end) stored in this chunk
    pub fn range(&self) -> (u64, u64) {
        (self.recipe_start, self.recipe_end)
    }

    /// Get the number of remaining records to read sequentially
    pub fn remaining(&self) -> usize {
        self.recipe_end.saturating_sub(self.recipe_next) as usize
    }

    /// Read the record with the given id. The reader stays positioned after it.
    pub fn read(&mut self, recipe_id: u64) -> Result<Recipe, DatabaseError> {
        if recipe_id < self.recipe_start || recipe_id >= self.recipe_end {
            return Err(DatabaseError::InvalidRecipeId(recipe_id));
        }
        if recipe_id != self.recipe_next {
            let offset = (recipe_id as i64 - self.recipe_next as i64) * RECORD_SIZE as i64;
            self.reader.seek_relative(offset)?;
            self.recipe_next = recipe_id;
        }
        self.read_next_record()
    }

    fn read_next_record(&mut self) -> Result<Recipe, DatabaseError> {
        let mut buf = [0u8; RECORD_SIZE];
        let recipe_id = self.recipe_next;
        // move past the record even on error so iteration can't get stuck
        self.recipe_next += 1;
        self.reader.read_exact(&mut buf)?;
        Recipe::decode(recipe_id, &buf)
    }
}

impl Iterator for Chunk {
    type Item = Result<Recipe, DatabaseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.recipe_next >= self.recipe_end {
            return None;
        }
        Some(self.read_next_record())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}
