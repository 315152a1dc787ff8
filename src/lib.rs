//! # Sagasu - Chunked Recipe Database and Staged Query Engine
//!
//! **Sagasu** searches a large, precomputed database of cooking recipes. Every
//! recipe is a combination of up to 5 ingredient groups with a fixed value,
//! a set of modifiers and a few flags. The database is split into fixed-size
//! chunks with a small index, so a query can scan the chunks in parallel and
//! skip the ones that cannot match.
//!
//! ## Core Workflow
//!
//! Queries run in three stages, each one reading the result of the previous:
//!
//! 1.  **Search**: Scan the whole database with a [`SearchFilter`](query::SearchFilter)
//!     (value range, required and forbidden modifiers, crit and PE-only options).
//! 2.  **Filter**: Narrow the search result to recipes whose ingredients are all
//!     in a set of groups.
//! 3.  **Cook**: Read a bounded number of the remaining recipes and merge those that
//!     differ in a single ingredient into one displayable entry.
//!
//! The stages can be driven directly (see [`stages`]) or through a [`Host`](host::Host),
//! which runs them on a worker pool, keeps the latest results, reports progress
//! and handles aborting and superseding operations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sagasu::prelude::*;
//!
//! fn main() -> Result<(), HostError> {
//!     let config = Config {
//!         database_path: "path/to/database".into(),
//!         ..Config::default()
//!     };
//!     let (sender, events) = flume::unbounded();
//!     let host = Host::new(config, sender)?;
//!     host.initialize().wait()?;
//!
//!     // 1. Search for recipes worth 60 to 120 with the ADD_LIFE modifier
//!     let mut filter = SearchFilter::value_range(60, 120);
//!     filter.includes_modifier = ModifierSet::ADD_LIFE;
//!     let stats = host.search(filter)?.wait()?;
//!     println!("found {} recipes", stats.found_count);
//!
//!     // 2. Only keep recipes made of groups 1, 2 and 3
//!     let stats = host.filter(vec![1, 2, 3])?.wait()?;
//!     println!("{} recipes left after filtering", stats.found_count);
//!
//!     // 3. Cook the result
//!     let output = host.cook()?.wait()?;
//!     for recipe in &output.recipes {
//!         println!("{:?} -> {}", recipe.actors, recipe.values.value);
//!     }
//!
//!     // Every completion was also sent as an event
//!     for event in events.try_iter() {
//!         println!("{}", event.to_json().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod host;
pub mod modifier;
pub mod prelude;
pub mod progress;
pub mod query;
pub mod signal;
pub mod stages;
pub mod store;
