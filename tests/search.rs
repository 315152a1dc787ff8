//! Tests for the search stage and the chunk index.
mod common;
use common::*;
use parking_lot::Mutex;
use sagasu::prelude::*;
use sagasu::stages::{self, StageContext};
use std::time::Duration;

fn crit_entry(groups: &[GroupId], value: u8, hearty: bool) -> RecipeEntry {
    RecipeEntry {
        hearty,
        crit_rng: true,
        ..entry(groups, value)
    }
}

#[test]
fn test_search_value_range_scenario() {
    let db = build_db(
        vec![entry(&[APPLE], 10), entry(&[MEAT], 50), entry(&[FISH], 120)],
        2,
    );
    let opened = db.open();
    let output = run_search(&opened, &SearchFilter::value_range(0, 60));
    assert_eq!(output.stats.found_count, 2);
    assert_eq!(ids_of(&output.result), vec![0, 1]);
}

#[test]
fn test_search_results_satisfy_filter() {
    let entries = create_mixed_entries(500);
    let db = build_db(entries, 64);
    let opened = db.open();
    let all: Vec<Recipe> = (0..opened.total_record())
        .map(|id| opened.get(id).expect("Failed to read"))
        .collect();

    let filters = [
        SearchFilter::value_range(0, 120),
        SearchFilter::value_range(40, 80),
        SearchFilter {
            include_crit_rng_hp: true,
            ..SearchFilter::value_range(100, 120)
        },
        SearchFilter {
            includes_modifier: ModifierSet::ADD_LIFE,
            excludes_modifier: ModifierSet::CRITICAL | ModifierSet::ZOOM,
            ..SearchFilter::value_range(10, 110)
        },
        SearchFilter {
            includes_modifier: ModifierSet::ADD_POWER | ModifierSet::SURF_MASTER,
            include_pe_only: true,
            ..SearchFilter::value_range(0, 120)
        },
    ];

    for filter in &filters {
        let output = run_search(&opened, filter);
        let found = read_all(&opened, &output.result);
        for recipe in &found {
            let value = recipe.value as i32;
            let crit_value = recipe.crit_value() as i32;
            let in_range = (filter.min_value..=filter.max_value).contains(&value)
                || (filter.include_crit_rng_hp
                    && (filter.min_value..=filter.max_value).contains(&crit_value));
            assert!(in_range, "recipe {} out of range for {:?}", recipe.id, filter);
            assert!(recipe.modifier.contains(filter.effective_includes()));
            assert!(recipe.modifier.intersection(filter.excludes_modifier).is_empty());
            if !filter.include_pe_only {
                assert!(!recipe.groups().any(|g| g == STAR_FRAGMENT));
            }
        }
        let expected = all
            .iter()
            .filter(|recipe| filter.matches(recipe, opened.catalog()))
            .count();
        assert_eq!(output.stats.found_count, expected, "filter {:?}", filter);
    }
}

#[test]
fn test_search_is_idempotent() {
    let db = build_db(create_mixed_entries(300), 32);
    let opened = db.open();
    let filter = SearchFilter {
        includes_modifier: ModifierSet::ADD_LIFE,
        ..SearchFilter::value_range(20, 90)
    };
    let first = run_search(&opened, &filter);
    let second = run_search(&opened, &filter);
    assert_eq!(first.stats, second.stats);
    assert_eq!(ids_of(&first.result), ids_of(&second.result));
}

#[test]
fn test_exclude_wins_over_include() {
    let db = build_db(
        vec![
            entry_with(&[APPLE], 50, ModifierSet::ADD_LIFE),
            entry_with(&[MEAT], 50, ModifierSet::ADD_POWER),
            entry_with(&[FISH], 50, ModifierSet::ADD_LIFE | ModifierSet::ADD_POWER),
        ],
        8,
    );
    let opened = db.open();
    let filter = SearchFilter {
        includes_modifier: ModifierSet::ADD_LIFE | ModifierSet::ADD_POWER,
        excludes_modifier: ModifierSet::ADD_LIFE,
        ..SearchFilter::value_range(0, 120)
    };
    assert_eq!(filter.effective_includes(), ModifierSet::ADD_POWER);
    let output = run_search(&opened, &filter);
    assert_eq!(ids_of(&output.result), vec![1]);
}

#[test]
fn test_pe_only_gating() {
    let db = build_db(
        vec![
            entry(&[APPLE, STAR_FRAGMENT], 60),
            entry(&[APPLE, MEAT], 60),
        ],
        8,
    );
    let opened = db.open();
    let without = run_search(&opened, &SearchFilter::value_range(0, 120));
    assert_eq!(ids_of(&without.result), vec![1]);

    let with = run_search(
        &opened,
        &SearchFilter {
            include_pe_only: true,
            ..SearchFilter::value_range(0, 120)
        },
    );
    assert_eq!(with.stats.found_count, 2);
}

#[test]
fn test_crit_adjusted_value() {
    let db = build_db(
        vec![
            // 50 + 12
            crit_entry(&[APPLE], 50, false),
            // 116 + 4 capped at 120
            crit_entry(&[MEAT], 116, true),
            // 115 + 12 capped at 120
            crit_entry(&[FISH], 115, false),
            // no crit
            entry(&[HERB], 62),
            // raw in range, 60 + 12 above it
            crit_entry(&[HERB], 60, false),
        ],
        8,
    );
    let opened = db.open();
    let raw = run_search(&opened, &SearchFilter::value_range(60, 70));
    assert_eq!(ids_of(&raw.result), vec![3, 4]);

    let crit = run_search(
        &opened,
        &SearchFilter {
            include_crit_rng_hp: true,
            ..SearchFilter::value_range(60, 70)
        },
    );
    // the raw value still counts with crit enabled
    assert_eq!(ids_of(&crit.result), vec![0, 3, 4]);

    let top = run_search(
        &opened,
        &SearchFilter {
            include_crit_rng_hp: true,
            ..SearchFilter::value_range(120, 120)
        },
    );
    assert_eq!(ids_of(&top.result), vec![1, 2]);
}

#[test]
fn test_chunk_index_skipping() {
    let mut entries: Vec<_> = (0..4).map(|i| entry(&[APPLE], i)).collect();
    entries.extend((0..4).map(|i| entry_with(&[MEAT], 100 + i, ModifierSet::ZOOM)));
    let db = build_db(entries, 4);
    let opened = db.open();
    let low = &opened.index()[0];
    let high = &opened.index()[1];

    let mid = SearchFilter::value_range(50, 60);
    assert!(low.can_skip(&mid));
    assert!(high.can_skip(&mid));
    assert_eq!(run_search(&opened, &mid).stats.found_count, 0);

    let zoom = SearchFilter {
        includes_modifier: ModifierSet::ZOOM,
        ..SearchFilter::value_range(0, 120)
    };
    assert!(low.can_skip(&zoom));
    assert!(!high.can_skip(&zoom));

    let no_zoom = SearchFilter {
        excludes_modifier: ModifierSet::ZOOM,
        ..SearchFilter::value_range(0, 120)
    };
    assert!(!low.can_skip(&no_zoom));
    assert!(high.can_skip(&no_zoom));
    assert_eq!(run_search(&opened, &no_zoom).stats.found_count, 4);
}

#[test]
fn test_group_stats() {
    let db = build_db(
        vec![
            entry(&[APPLE, APPLE, MEAT], 30),
            entry(&[APPLE, FISH], 40),
            entry(&[HERB], 100),
        ],
        8,
    );
    let opened = db.open();
    let output = run_search(&opened, &SearchFilter::value_range(0, 50));
    let stat = output.stats.group_stat.expect("Search should compute group stats");
    assert_eq!(stat.get(EMPTY_GROUP), 0);
    assert_eq!(stat.get(APPLE), 2);
    assert_eq!(stat.get(MEAT), 1);
    assert_eq!(stat.get(FISH), 1);
    assert_eq!(stat.get(HERB), 0);
    assert_eq!(
        stat.used_groups().collect::<Vec<_>>(),
        vec![(APPLE, 2), (MEAT, 1), (FISH, 1)]
    );
}

#[test]
fn test_group_stats_skipped_above_limit() {
    let db = build_db(create_mixed_entries(50), 16);
    let opened = db.open();
    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db: &opened,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    let filter = SearchFilter {
        include_pe_only: true,
        ..SearchFilter::all()
    };
    let limited = stages::search::run(&ctx, &filter, Some(10)).expect("Search failed");
    assert_eq!(limited.stats.found_count, 50);
    assert!(limited.stats.group_stat.is_none());

    let unlimited = stages::search::run(&ctx, &filter, Some(50)).expect("Search failed");
    assert!(unlimited.stats.group_stat.is_some());
}

#[test]
fn test_search_progress_reaches_100() {
    let db = build_db(create_mixed_entries(200), 16);
    let opened = db.open();
    let signal = AbortSignal::new();
    let reports = Mutex::new(Vec::new());
    let on_progress = |p: u32| reports.lock().push(p);
    let ctx = StageContext {
        db: &opened,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &on_progress,
    };
    stages::search::run(&ctx, &SearchFilter::all(), None).expect("Search failed");

    let reports = reports.into_inner();
    assert_eq!(reports.last(), Some(&100));
    assert_eq!(reports.iter().filter(|p| **p == 100).count(), 1);
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_search_aborted() {
    let db = build_db(create_mixed_entries(100), 16);
    let opened = db.open();
    let signal = AbortSignal::new();
    signal.abort();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db: &opened,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    assert_eq!(
        stages::search::run(&ctx, &SearchFilter::all(), None).err(),
        Some(HostError::Aborted)
    );
    // the abandoned result leaves nothing behind
    let leftover = std::fs::read_dir(db.path().join("temp"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[test]
fn test_result_storage() {
    let db = build_db(create_mixed_entries(200), 16);
    let opened = db.open();
    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let filter = SearchFilter::value_range(20, 100);
    let search = |storage: ResultStorage| {
        let ctx = StageContext {
            db: &opened,
            signal: &signal,
            progress_interval: Duration::ZERO,
            storage,
            on_progress: &no_progress,
        };
        stages::search::run(&ctx, &filter, None).expect("Search failed")
    };

    let memory = search(ResultStorage::Memory);
    let disk = search(ResultStorage::Disk);
    assert!(!memory.result.is_spilled());
    assert_eq!(memory.result.temp_path(), None);
    assert!(disk.result.is_spilled());
    assert_eq!(memory.stats, disk.stats);
    assert_eq!(ids_of(&memory.result), ids_of(&disk.result));

    // filter reads a spilled input the same way
    assert_eq!(
        ids_of(&run_filter(&opened, &memory.result, &[APPLE, MEAT]).result),
        ids_of(&run_filter(&opened, &disk.result, &[APPLE, MEAT]).result)
    );

    let temp = disk
        .result
        .temp_path()
        .expect("Spilled result has no temp path")
        .to_path_buf();
    assert!(temp.starts_with(db.path().join("temp")));
    assert!(temp.is_dir());
    let clone = disk.result.clone();
    drop(disk);
    assert!(temp.is_dir());
    drop(clone);
    assert!(!temp.exists());
}

#[test]
fn test_invalid_filter() {
    let db = build_db(create_mixed_entries(10), 16);
    let opened = db.open();
    let signal = AbortSignal::new();
    let no_progress = |_: u32| {};
    let ctx = StageContext {
        db: &opened,
        signal: &signal,
        progress_interval: Duration::ZERO,
        storage: ResultStorage::Disk,
        on_progress: &no_progress,
    };
    for filter in [
        SearchFilter::value_range(60, 10),
        SearchFilter::value_range(-1, 10),
        SearchFilter::value_range(0, 121),
    ] {
        assert!(matches!(
            stages::search::run(&ctx, &filter, None),
            Err(HostError::InvalidFilter(_))
        ));
    }
}
