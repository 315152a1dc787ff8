use super::record::Recipe;
use crate::modifier::ModifierSet;
use crate::query::SearchFilter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Index metadata for a chunk. Used to skip chunks when searching for recipes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkIndex {
    /// The chunk id
    pub chunk: u32,
    /// Number of records in the chunk
    pub record_count: u32,
    /// The minimum value of all records in the chunk
    pub min_value: i32,
    /// The maximum value of all records in the chunk, without considering crit
    pub max_value: i32,
    /// The maximum value of all records in the chunk, with crit
    pub max_value_crit_rng: i32,
    /// Mask for if any record in the chunk has the modifier
    pub includes_modifier: ModifierSet,
    /// Mask for if all records in the chunk have the modifier
    pub all_includes_modifier: ModifierSet,
    /// Set if any record in the chunk uses a prompt-entanglement-only group
    #[serde(default)]
    pub any_pe_only: bool,
    /// Set if every record in the chunk uses a prompt-entanglement-only group
    #[serde(default)]
    pub all_pe_only: bool,
    /// SHA256 of the chunk file
    pub sha256: String,
}

impl ChunkIndex {
    /// Return true if none of the records in this chunk match the filter
    ///
    /// Note that returning false can still mean that the chunk has no matching records
    pub fn can_skip(&self, filter: &SearchFilter) -> bool {
        if self.record_count == 0 {
            return true;
        }
        let self_max = if filter.include_crit_rng_hp {
            self.max_value_crit_rng
        } else {
            self.max_value
        };
        if self_max < filter.min_value {
            return true;
        }
        if self.min_value > filter.max_value {
            return true;
        }
        let required = filter.effective_includes();
        if !self.includes_modifier.has_all(required) {
            // none of the recipes have all the required modifiers
            return true;
        }
        if !self.all_includes_modifier.has_none(filter.excludes_modifier) {
            // all recipes have at least one of the excluded modifiers
            return true;
        }
        if !filter.include_pe_only && self.all_pe_only {
            return true;
        }
        false
    }
}

/// Builder for [`ChunkIndex`]
pub struct IndexBuilder {
    chunk: u32,
    record_count: u32,
    hasher: Sha256,
    min_value: i32,
    max_value: i32,
    max_value_crit_rng: i32,
    includes_modifier: ModifierSet,
    all_includes_modifier: ModifierSet,
    any_pe_only: bool,
    all_pe_only: bool,
}

impl IndexBuilder {
    /// Create a new builder for a chunk
    pub fn new(chunk: u32) -> Self {
        Self {
            chunk,
            record_count: 0,
            hasher: Sha256::new(),
            min_value: i32::MAX,
            max_value: i32::MIN,
            max_value_crit_rng: i32::MIN,
            includes_modifier: ModifierSet::empty(),
            all_includes_modifier: ModifierSet::all(),
            any_pe_only: false,
            all_pe_only: true,
        }
    }

    /// Update the current state with a new record and its encoded bytes
    pub fn update(&mut self, recipe: &Recipe, bytes: &[u8], uses_pe_only: bool) {
        self.hasher.update(bytes);
        self.record_count += 1;

        let value = recipe.value as i32;
        self.min_value = self.min_value.min(value);
        self.max_value = self.max_value.max(value);
        self.max_value_crit_rng = self.max_value_crit_rng.max(recipe.crit_value() as i32);

        self.includes_modifier = self.includes_modifier.union(recipe.modifier);
        self.all_includes_modifier = self.all_includes_modifier.intersection(recipe.modifier);

        self.any_pe_only |= uses_pe_only;
        self.all_pe_only &= uses_pe_only;
    }

    /// Build the index
    pub fn build(self) -> ChunkIndex {
        let (min_value, max_value, all_includes_modifier, all_pe_only) = if self.record_count == 0
        {
            (0, 0, ModifierSet::empty(), false)
        } else {
            (
                self.min_value,
                self.max_value,
                self.all_includes_modifier,
                self.all_pe_only,
            )
        };
        // max crit value is at least max value
        let max_value_crit_rng = self.max_value_crit_rng.max(max_value);

        ChunkIndex {
            chunk: self.chunk,
            record_count: self.record_count,
            min_value,
            max_value,
            max_value_crit_rng,
            includes_modifier: self.includes_modifier,
            all_includes_modifier,
            any_pe_only: self.any_pe_only,
            all_pe_only,
            sha256: format!("{:x}", self.hasher.finalize()),
        }
    }
}
