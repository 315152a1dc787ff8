//! Common test utilities for building small databases on disk.
use sagasu::catalog::{ActorDef, GroupDef};
use sagasu::prelude::*;
use sagasu::stages::{self, StageContext, StageOutput};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const APPLE: GroupId = 1;
pub const MUSHROOM: GroupId = 2;
pub const MEAT: GroupId = 3;
pub const FISH: GroupId = 4;
pub const HERB: GroupId = 5;
/// Only obtainable through prompt entanglement
pub const STAR_FRAGMENT: GroupId = 6;

/// Actors of `MUSHROOM`
pub const HYLIAN_SHROOM: ActorId = 2;
pub const ENDURA_SHROOM: ActorId = 3;

/// A database directory that is removed when dropped.
pub struct TestDb {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestDb {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn open(&self) -> Database {
        Database::open(self.path()).expect("Failed to open test database")
    }

    pub fn config(&self) -> Config {
        test_config(self.path())
    }
}

fn group(id: GroupId, name: &str, pe_only: bool, actors: &[(ActorId, &str)]) -> GroupDef {
    GroupDef {
        id,
        name: name.to_string(),
        pe_only,
        actors: actors
            .iter()
            .map(|(id, name)| ActorDef {
                id: *id,
                name: name.to_string(),
            })
            .collect(),
    }
}

/// Six groups; `MUSHROOM` has two actors, `STAR_FRAGMENT` is PE-only.
#[allow(dead_code)]
pub fn create_catalog() -> Catalog {
    Catalog::new(vec![
        group(APPLE, "Apple", false, &[(1, "Apple")]),
        group(
            MUSHROOM,
            "Mushroom",
            false,
            &[(HYLIAN_SHROOM, "Hylian Shroom"), (ENDURA_SHROOM, "Endura Shroom")],
        ),
        group(MEAT, "Meat", false, &[(4, "Raw Meat")]),
        group(FISH, "Fish", false, &[(5, "Hyrule Bass"), (6, "Staminoka Bass")]),
        group(HERB, "Herb", false, &[(7, "Swift Violet")]),
        group(STAR_FRAGMENT, "Star Fragment", true, &[(8, "Star Fragment")]),
    ])
    .expect("Failed to create test catalog")
}

/// A plain recipe with no modifier and no flags.
#[allow(dead_code)]
pub fn entry(groups: &[GroupId], value: u8) -> RecipeEntry {
    RecipeEntry {
        groups: groups.to_vec(),
        value,
        modifier: ModifierSet::empty(),
        hearty: false,
        crit_rng: false,
    }
}

#[allow(dead_code)]
pub fn entry_with(groups: &[GroupId], value: u8, modifier: ModifierSet) -> RecipeEntry {
    RecipeEntry {
        modifier,
        ..entry(groups, value)
    }
}

/// Write `entries` into a fresh temp directory.
#[allow(dead_code)]
pub fn build_db(entries: Vec<RecipeEntry>, chunk_size: u32) -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut builder = DatabaseBuilder::new(dir.path(), create_catalog(), chunk_size)
        .expect("Failed to create builder");
    for entry in entries {
        builder.push(entry).expect("Failed to push recipe");
    }
    builder.finish().expect("Failed to finish database");
    TestDb { dir }
}

/// A spread of recipes over every group, value and modifier.
#[allow(dead_code)]
pub fn create_mixed_entries(count: usize) -> Vec<RecipeEntry> {
    let groups = [APPLE, MUSHROOM, MEAT, FISH, HERB, STAR_FRAGMENT];
    (0..count)
        .map(|i| {
            let len = i % 5 + 1;
            let slots: Vec<_> = (0..len).map(|j| groups[(i * 7 + j * 3) % groups.len()]).collect();
            RecipeEntry {
                groups: slots,
                value: ((i * 37) % 121) as u8,
                modifier: ModifierSet::from(((i * 53) % 512) as u16),
                hearty: i % 11 == 0,
                crit_rng: i % 3 == 0,
            }
        })
        .collect()
}

/// Config for a host over `path`, reporting progress without throttling.
#[allow(dead_code)]
pub fn test_config(path: &Path) -> Config {
    Config {
        database_path: path.to_path_buf(),
        worker_threads: Some(2),
        progress_interval_ms: 0,
        ..Config::default()
    }
}

/// Run the search stage directly, without a host.
#[allow(dead_code)]
pub fn run_search(db: &Database, filter: &SearchFilter) -> StageOutput {
    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    stages::search::run(&ctx, filter, None).expect("Search failed")
}

/// Run the filter stage directly, without a host.
#[allow(dead_code)]
pub fn run_filter(db: &Database, input: &ResultSet, groups: &[GroupId]) -> StageOutput {
    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    stages::filter::run(&ctx, input, groups).expect("Filter failed")
}

/// Ids of a result, in ascending order.
#[allow(dead_code)]
pub fn ids_of(result: &ResultSet) -> Vec<u64> {
    result.read_ids().expect("Failed to read result ids")
}

/// Recipes of a result, read back from the database.
#[allow(dead_code)]
pub fn read_all(db: &Database, result: &ResultSet) -> Vec<Recipe> {
    ids_of(result)
        .into_iter()
        .map(|id| db.get(id).expect("Failed to read recipe"))
        .collect()
}
