//! Main stages of the query pipeline
//!
//! These are:
//! - Search: scan the whole database for recipes in a value range with the wanted modifiers
//! - Filter: narrow the search result to recipes made of wanted ingredient groups
//! - Cook: merge the filtered recipes into a compact, displayable list

pub mod cook;
pub mod filter;
pub mod search;

use crate::progress::ProgressTracker;
use crate::error::DatabaseError;
use crate::query::{ResultSet, ResultSetBuilder, ResultStorage, Stats};
use crate::signal::AbortSignal;
use crate::store::Database;
use parking_lot::Mutex;
use std::time::Duration;

/// Everything a stage needs besides its own input.
pub struct StageContext<'a> {
    pub db: &'a Database,
    pub signal: &'a AbortSignal,
    /// Minimum time between two progress reports
    pub progress_interval: Duration,
    /// Where matched ids are kept
    pub storage: ResultStorage,
    /// Receives progress as a percentage between 0 and 100
    pub on_progress: &'a (dyn Fn(u32) + Sync),
}

impl<'a> StageContext<'a> {
    pub(crate) fn result_builder(&self) -> Result<ResultSetBuilder, DatabaseError> {
        ResultSetBuilder::new(self.db, self.storage)
    }

    /// A thread-safe tracker reporting into `on_progress`.
    pub(crate) fn tracker(&self, total: usize) -> Mutex<ProgressTracker<impl Fn(u32) + 'a>> {
        let on_progress = self.on_progress;
        Mutex::new(ProgressTracker::new(
            total,
            self.progress_interval,
            move |percentage| on_progress(percentage),
        ))
    }
}

/// Result of a completed search or filter stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub result: ResultSet,
    pub stats: Stats,
}
