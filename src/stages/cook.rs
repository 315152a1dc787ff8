//! Cook result
//!
//! Turns the raw recipes of the latest result into a compact list: recipes
//! that share everything but one ingredient are merged into a single entry
//! whose free slot lists every actor that works there.

use super::StageContext;
use crate::catalog::{ActorId, Catalog, EMPTY_GROUP, GroupId};
use crate::error::HostError;
use crate::modifier::ModifierSet;
use crate::query::{ResultSet, Stats};
use crate::store::{NUM_SLOTS, Recipe};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Reverse;
use std::time::Instant;
use tracing::{error, info};

/// Result of grouping/merging recipes with the same values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedRecipeData {
    /// Actors for this recipe
    ///
    /// Each Vec is the actors usable in one ingredient slot
    pub actors: Vec<Vec<ActorId>>,
    #[serde(flatten)]
    pub values: RecipeValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeValues {
    pub value: u8,
    pub is_hearty: bool,
    pub price: ModifierSet,
}

impl From<&Recipe> for RecipeValues {
    fn from(recipe: &Recipe) -> Self {
        Self {
            value: recipe.value,
            is_hearty: recipe.hearty,
            price: recipe.modifier,
        }
    }
}

/// Output of the cook stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookOutput {
    /// `found_count` is the size of the whole input, which can be more than
    /// what was cooked when the input was truncated
    pub stats: Stats,
    pub recipes: Vec<OptimizedRecipeData>,
}

/// Cook at most `limit` recipes of `input`.
pub fn run(
    ctx: &StageContext<'_>,
    input: &ResultSet,
    limit: usize,
) -> Result<CookOutput, HostError> {
    let start = Instant::now();
    info!(input = input.len(), limit, "cook started");
    let recipes = read_limited(ctx, input, limit)?;
    if ctx.signal.is_aborted() {
        return Err(HostError::Aborted);
    }
    let optimized = optimize(&recipes, ctx.db.catalog());
    info!(elapsed = ?start.elapsed(), "cook finished");
    Ok(CookOutput {
        stats: Stats::new(input.len(), None),
        recipes: optimized,
    })
}

/// Read the first `limit` recipes of the result in id order.
fn read_limited(
    ctx: &StageContext<'_>,
    input: &ResultSet,
    limit: usize,
) -> Result<Vec<Recipe>, HostError> {
    let mut recipes = Vec::with_capacity(input.len().min(limit));
    for segment in input.segments() {
        if recipes.len() >= limit {
            break;
        }
        let mut chunk = ctx.db.open_chunk(segment.chunk)?;
        for id in segment.ids()?.take(limit - recipes.len()) {
            if ctx.signal.is_aborted() {
                return Err(HostError::Aborted);
            }
            recipes.push(chunk.read(id?)?);
        }
    }
    Ok(recipes)
}

/// A recipe seen with one slot left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct RecipeKey {
    fixed: [GroupId; NUM_SLOTS - 1],
    values: RecipeValues,
}

impl RecipeKey {
    fn new(recipe: &Recipe, free: usize) -> Self {
        let mut fixed = [EMPTY_GROUP; NUM_SLOTS - 1];
        for (dst, group) in fixed.iter_mut().zip(
            recipe
                .slots
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != free)
                .map(|(_, g)| *g),
        ) {
            *dst = group;
        }
        Self {
            fixed,
            values: RecipeValues::from(recipe),
        }
    }
}

/// Group recipes that have 4 ingredients in common
///
/// Every recipe ends up in exactly one key; the output is the same for the
/// same input regardless of hashing.
pub fn optimize(recipes: &[Recipe], catalog: &Catalog) -> Vec<OptimizedRecipeData> {
    info!("optimizing {} cooking results", recipes.len());

    // key -> (recipe index, group in the free slot)
    let mut recipe_map: AHashMap<RecipeKey, Vec<(usize, GroupId)>> = AHashMap::new();
    for (i, recipe) in recipes.iter().enumerate() {
        for free in 0..NUM_SLOTS {
            let entries = recipe_map.entry(RecipeKey::new(recipe, free)).or_default();
            // freeing any of several empty slots gives the same key
            if entries.last().is_some_and(|(last, _)| *last == i) {
                continue;
            }
            entries.push((i, recipe.slots[free]));
        }
    }

    // take out from the one with most entries
    let mut keys: Vec<_> = recipe_map.iter().collect();
    keys.sort_by_key(|(key, entries)| (Reverse(entries.len()), **key));

    let mut optimized = Vec::new();
    let mut seen = AHashSet::with_capacity(recipes.len());
    for (key, entries) in keys {
        let mut absorbed = false;
        let mut has_empty = false;
        let mut free_groups = Vec::new();
        for &(i, group) in entries {
            if !seen.insert(i) {
                continue;
            }
            absorbed = true;
            if group == EMPTY_GROUP {
                has_empty = true;
            } else {
                free_groups.push(group);
            }
        }
        if !absorbed {
            continue;
        }

        let fixed: Vec<Vec<ActorId>> = key
            .fixed
            .iter()
            .filter(|group| **group != EMPTY_GROUP)
            .map(|group| catalog.actors_of(*group).collect())
            .collect();
        let free_actors: Vec<ActorId> = free_groups
            .into_iter()
            .flat_map(|group| catalog.actors_of(group))
            .sorted()
            .dedup()
            .collect();

        if !free_actors.is_empty() {
            let mut actors = fixed.clone();
            actors.push(free_actors);
            optimized.push(OptimizedRecipeData {
                actors,
                values: key.values,
            });
        }
        if has_empty {
            optimized.push(OptimizedRecipeData {
                actors: fixed,
                values: key.values,
            });
        }
    }

    if seen.len() != recipes.len() {
        error!(
            "cooked recipe count doesn't match the input: {} != {}",
            seen.len(),
            recipes.len()
        );
    }
    info!(
        "optimized {} into {} cooking results",
        recipes.len(),
        optimized.len()
    );
    optimized
}
