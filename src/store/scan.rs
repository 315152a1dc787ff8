use super::database::Database;
use super::index::ChunkIndex;
use super::record::Recipe;
use crate::error::{DatabaseError, ScanError};
use crate::query::ResultSet;
use crate::signal::AbortSignal;
use rayon::prelude::*;

/// Records between two progress reports inside one chunk.
const PROGRESS_STRIDE: usize = 1 << 16;

/// A per-chunk visitor driven by [`Database::scan`] and [`Database::scan_result`].
///
/// Chunks are visited in parallel; each chunk gets its own accumulator,
/// and the accumulators are returned in chunk order.
pub trait ScanPlan: Sync {
    type Acc: Send;

    /// Create the accumulator for a chunk.
    fn start(&self, chunk: u32) -> Self::Acc;

    /// Return true if the chunk can't contain anything this plan keeps.
    fn skip_chunk(&self, _index: &ChunkIndex) -> bool {
        false
    }

    /// Visit one record.
    fn visit(&self, acc: &mut Self::Acc, recipe: &Recipe) -> Result<(), DatabaseError>;
}

impl Database {
    /// Scan every record in the database.
    ///
    /// `on_progress` receives the number of records processed since its last
    /// call. Chunks skipped through the index count as processed.
    pub fn scan<P>(
        &self,
        plan: &P,
        signal: &AbortSignal,
        on_progress: &(dyn Fn(usize) + Sync),
    ) -> Result<Vec<P::Acc>, ScanError>
    where
        P: ScanPlan,
    {
        (0..self.chunk_count())
            .into_par_iter()
            .map(|chunk_id| {
                if signal.is_aborted() {
                    return Err(ScanError::Aborted);
                }
                let mut acc = plan.start(chunk_id);
                let index = self.chunk_index(chunk_id)?;
                if plan.skip_chunk(index) {
                    on_progress(index.record_count as usize);
                    return Ok(acc);
                }
                let mut pending = 0;
                for recipe in self.open_chunk(chunk_id)? {
                    if signal.is_aborted() {
                        return Err(ScanError::Aborted);
                    }
                    plan.visit(&mut acc, &recipe?)?;
                    pending += 1;
                    if pending == PROGRESS_STRIDE {
                        on_progress(pending);
                        pending = 0;
                    }
                }
                on_progress(pending);
                Ok(acc)
            })
            .collect()
    }

    /// Scan only the records of a result set, one accumulator per segment.
    pub fn scan_result<P>(
        &self,
        result: &ResultSet,
        plan: &P,
        signal: &AbortSignal,
        on_progress: &(dyn Fn(usize) + Sync),
    ) -> Result<Vec<P::Acc>, ScanError>
    where
        P: ScanPlan,
    {
        result
            .segments()
            .par_iter()
            .map(|segment| {
                if signal.is_aborted() {
                    return Err(ScanError::Aborted);
                }
                let mut acc = plan.start(segment.chunk);
                if segment.is_empty() {
                    return Ok(acc);
                }
                let mut chunk = self.open_chunk(segment.chunk)?;
                let mut pending = 0;
                for id in segment.ids()? {
                    if signal.is_aborted() {
                        return Err(ScanError::Aborted);
                    }
                    let recipe = chunk.read(id?)?;
                    plan.visit(&mut acc, &recipe)?;
                    pending += 1;
                    if pending == PROGRESS_STRIDE {
                        on_progress(pending);
                        pending = 0;
                    }
                }
                on_progress(pending);
                Ok(acc)
            })
            .collect()
    }

    fn chunk_index(&self, chunk_id: u32) -> Result<&ChunkIndex, DatabaseError> {
        self.index()
            .get(chunk_id as usize)
            .ok_or(DatabaseError::MissingChunk(chunk_id))
    }
}
