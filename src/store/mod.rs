//! The recipe store: a directory of fixed-size record chunks plus an index.
//!
//! ```text
//! database/
//!   index.yaml      layout + per-chunk bounds and checksums
//!   catalog.yaml    actors and their groups
//!   chunk_0.rdb     records [0, chunk_size)
//!   chunk_1.rdb     records [chunk_size, 2 * chunk_size)
//!   ...
//!   temp/           spilled search and filter results, one directory each
//!   .lock           held while a process has the database open
//! ```
//!
//! Records are addressed by their ordinal id: chunk `id / chunk_size`,
//! byte offset `(id % chunk_size) * RECORD_SIZE`.

pub mod builder;
pub mod chunk;
pub mod database;
pub mod index;
pub mod meta;
pub mod record;
pub mod scan;
pub mod temp;

pub use builder::{DatabaseBuilder, RecipeEntry};
pub use chunk::Chunk;
pub use database::Database;
pub use index::{ChunkIndex, IndexBuilder};
pub use meta::{DbMeta, IndexFile};
pub use record::{NUM_SLOTS, RECORD_SIZE, Recipe};
pub use scan::ScanPlan;
pub use temp::TempResult;
