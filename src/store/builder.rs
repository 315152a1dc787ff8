use super::index::{ChunkIndex, IndexBuilder};
use super::meta::{self, DbMeta, IndexFile};
use super::record::{MAX_VALUE, NUM_SLOTS, Recipe};
use crate::catalog::{Catalog, EMPTY_GROUP, GroupId};
use crate::error::DatabaseError;
use crate::modifier::ModifierSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A recipe to be written into a new database.
///
/// Slots may be given in any order and may contain fewer than
/// `NUM_SLOTS` groups; missing slots are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntry {
    pub groups: Vec<GroupId>,
    pub value: u8,
    pub modifier: ModifierSet,
    pub hearty: bool,
    pub crit_rng: bool,
}

/// Writes a database directory: chunk files, `index.yaml` and `catalog.yaml`.
pub struct DatabaseBuilder {
    path: PathBuf,
    catalog: Catalog,
    chunk_size: u32,
    next_id: u64,
    writer: Option<(BufWriter<File>, IndexBuilder)>,
    finished_chunks: Vec<ChunkIndex>,
}

impl DatabaseBuilder {
    /// Start building into `path`, creating the directory if needed.
    pub fn new(
        path: impl AsRef<Path>,
        catalog: Catalog,
        chunk_size: u32,
    ) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        info!("building database at {}", path.display());
        Ok(Self {
            path,
            catalog,
            chunk_size: chunk_size.max(1),
            next_id: 0,
            writer: None,
            finished_chunks: Vec::new(),
        })
    }

    /// Append a recipe, returning its id.
    pub fn push(&mut self, entry: RecipeEntry) -> Result<u64, DatabaseError> {
        let recipe = self.to_recipe(entry)?;
        let uses_pe_only = recipe.groups().any(|g| self.catalog.is_pe_only(g));
        let bytes = recipe.encode()?;

        if self.writer.is_none() {
            let chunk_id = self.finished_chunks.len() as u32;
            let file = File::create(meta::chunk_path(&self.path, chunk_id))?;
            self.writer = Some((BufWriter::new(file), IndexBuilder::new(chunk_id)));
        }
        let Some((writer, index)) = self.writer.as_mut() else {
            return Err(DatabaseError::IO("chunk writer unavailable".to_string()));
        };
        writer.write_all(&bytes)?;
        index.update(&recipe, &bytes, uses_pe_only);

        self.next_id += 1;
        if self.next_id % self.chunk_size as u64 == 0 {
            self.finish_chunk()?;
        }
        Ok(recipe.id)
    }

    /// Flush the last chunk and write the index and catalog.
    pub fn finish(mut self) -> Result<DbMeta, DatabaseError> {
        self.finish_chunk()?;
        let meta = DbMeta::new(self.chunk_size, self.next_id);
        let index = IndexFile {
            meta,
            chunks: std::mem::take(&mut self.finished_chunks),
        };
        meta::save_index(meta::index_path(&self.path), &index)?;
        self.catalog.save(meta::catalog_path(&self.path))?;
        info!(
            records = meta.total_record,
            chunks = meta.chunk_count,
            "database build finished"
        );
        Ok(meta)
    }

    fn finish_chunk(&mut self) -> Result<(), DatabaseError> {
        if let Some((mut writer, index)) = self.writer.take() {
            writer.flush()?;
            let index = index.build();
            debug!(chunk = index.chunk, records = index.record_count, "chunk written");
            self.finished_chunks.push(index);
        }
        Ok(())
    }

    fn to_recipe(&self, entry: RecipeEntry) -> Result<Recipe, DatabaseError> {
        if entry.groups.len() > NUM_SLOTS {
            return Err(DatabaseError::InvalidRecord(format!(
                "recipe {} has {} ingredients, at most {} allowed",
                self.next_id,
                entry.groups.len(),
                NUM_SLOTS
            )));
        }
        if entry.value > MAX_VALUE {
            return Err(DatabaseError::InvalidRecord(format!(
                "recipe {} has value {} above {}",
                self.next_id, entry.value, MAX_VALUE
            )));
        }
        let mut slots = [EMPTY_GROUP; NUM_SLOTS];
        for (slot, group) in slots.iter_mut().zip(entry.groups) {
            if !self.catalog.contains_group(group) {
                return Err(DatabaseError::InvalidRecord(format!(
                    "recipe {} references unknown group {}",
                    self.next_id, group
                )));
            }
            *slot = group;
        }
        slots.sort_unstable();
        Ok(Recipe {
            id: self.next_id,
            slots,
            value: entry.value,
            modifier: entry.modifier,
            hearty: entry.hearty,
            crit_rng: entry.crit_rng,
        })
    }
}
