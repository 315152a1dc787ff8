//! Tests for the cook stage: merging recipes and the result limit.
mod common;
use ahash::AHashSet;
use common::*;
use itertools::Itertools;
use sagasu::prelude::*;
use sagasu::stages::cook::{self, RecipeValues};
use sagasu::stages::StageContext;
use std::time::Duration;

/// A recipe as groups + values, the unit the cook output expands into.
type Combo = (Vec<GroupId>, RecipeValues);

fn combo_of(recipe: &Recipe) -> Combo {
    (recipe.groups().collect(), RecipeValues::from(recipe))
}

fn expand(entry: &OptimizedRecipeData, catalog: &Catalog) -> AHashSet<Combo> {
    entry
        .actors
        .iter()
        .map(|slot| slot.iter().copied())
        .multi_cartesian_product()
        .map(|actors| {
            let groups = actors
                .iter()
                .map(|actor| catalog.group_of(*actor).expect("Unknown actor in output"))
                .sorted()
                .collect();
            (groups, entry.values)
        })
        .collect()
}

fn search_all(db: &Database) -> Vec<Recipe> {
    let output = run_search(
        db,
        &SearchFilter {
            include_pe_only: true,
            ..SearchFilter::all()
        },
    );
    read_all(db, &output.result)
}

#[test]
fn test_cook_lists_every_actor_of_a_group() {
    let db = build_db(vec![entry(&[MUSHROOM, MEAT], 40)], 8);
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    assert_eq!(optimized.len(), 1);
    let entry = &optimized[0];
    assert_eq!(entry.actors.len(), 2);
    assert!(entry.actors.contains(&vec![HYLIAN_SHROOM, ENDURA_SHROOM]));
    assert_eq!(entry.values.value, 40);
}

#[test]
fn test_cook_merges_recipes_differing_in_one_slot() {
    let db = build_db(
        vec![entry(&[APPLE, MEAT], 50), entry(&[FISH, MEAT], 50)],
        8,
    );
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    assert_eq!(optimized.len(), 1);
    // fixed slots first, the merged slot last
    assert_eq!(optimized[0].actors, vec![vec![4], vec![1, 5, 6]]);
}

#[test]
fn test_cook_keeps_different_values_apart() {
    let db = build_db(
        vec![
            entry(&[APPLE, MEAT], 50),
            entry(&[FISH, MEAT], 51),
            entry_with(&[HERB, MEAT], 50, ModifierSet::ZOOM),
        ],
        8,
    );
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    assert_eq!(optimized.len(), 3);
}

#[test]
fn test_cook_forks_optional_slot() {
    let db = build_db(
        vec![entry(&[APPLE, MEAT], 50), entry(&[APPLE, MEAT, FISH], 50)],
        8,
    );
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    let actors: Vec<_> = optimized.iter().map(|entry| entry.actors.clone()).collect();
    assert_eq!(
        actors,
        vec![vec![vec![1], vec![4], vec![5, 6]], vec![vec![1], vec![4]]]
    );
}

#[test]
fn test_cook_output_is_a_partition() {
    let db = build_db(create_mixed_entries(300), 32);
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    assert!(!optimized.is_empty());
    assert!(optimized.len() <= recipes.len() * 2);

    let raw: AHashSet<Combo> = recipes.iter().map(combo_of).collect();
    let mut covered = AHashSet::new();
    for entry in &optimized {
        for combo in expand(entry, opened.catalog()) {
            assert!(raw.contains(&combo), "cook produced a recipe not in the input");
            covered.insert(combo);
        }
    }
    assert_eq!(covered, raw);
}

#[test]
fn test_cook_is_deterministic() {
    let db = build_db(create_mixed_entries(200), 32);
    let opened = db.open();
    let recipes = search_all(&opened);
    let first = cook::optimize(&recipes, opened.catalog());
    let second = cook::optimize(&recipes, opened.catalog());
    assert_eq!(first, second);

    let reversed: Vec<_> = recipes.iter().rev().copied().collect();
    assert_eq!(cook::optimize(&reversed, opened.catalog()), first);
}

#[test]
fn test_cook_result_limit() {
    let entries = (0..10u8).map(|i| entry(&[APPLE, MEAT], i * 10)).collect();
    let db = build_db(entries, 4);
    let opened = db.open();
    let searched = run_search(&opened, &SearchFilter::value_range(0, 120));
    assert_eq!(searched.stats.found_count, 10);

    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db: &opened,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    let output = cook::run(&ctx, &searched.result, 5).expect("Cook failed");
    assert_eq!(output.recipes.len(), 5);
    assert_eq!(output.stats.found_count, 10);
    assert!(output.stats.group_stat.is_none());
    // the first ids are cooked
    let values: Vec<u8> = output
        .recipes
        .iter()
        .map(|entry| entry.values.value)
        .sorted()
        .collect();
    assert_eq!(values, vec![0, 10, 20, 30, 40]);

    let everything = cook::run(&ctx, &searched.result, 5000).expect("Cook failed");
    assert_eq!(everything.recipes.len(), 10);

    signal.abort();
    assert_eq!(
        cook::run(&ctx, &searched.result, 5).err(),
        Some(HostError::Aborted)
    );
}

#[test]
fn test_cook_output_json() {
    let db = build_db(vec![entry_with(&[MUSHROOM], 12, ModifierSet::CRITICAL)], 8);
    let opened = db.open();
    let recipes = search_all(&opened);
    let optimized = cook::optimize(&recipes, opened.catalog());
    let json = serde_json::to_value(&optimized).expect("Failed to serialize");
    assert_eq!(
        json,
        serde_json::json!([{
            "actors": [[2, 3]],
            "value": 12,
            "isHearty": false,
            "price": 4
        }])
    );
}
