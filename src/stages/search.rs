use super::{StageContext, StageOutput};
use crate::catalog::Catalog;
use crate::error::{DatabaseError, HostError};
use crate::query::{GroupStat, ResultSetBuilder, SearchFilter, SegmentWriter, Stats};
use crate::store::{ChunkIndex, Recipe, ScanPlan};
use std::time::Instant;
use tracing::info;

struct SearchPlan<'a> {
    filter: &'a SearchFilter,
    catalog: &'a Catalog,
    builder: &'a ResultSetBuilder,
}

impl ScanPlan for SearchPlan<'_> {
    type Acc = (SegmentWriter, GroupStat);

    fn start(&self, chunk: u32) -> Self::Acc {
        (
            self.builder.segment(chunk),
            GroupStat::new(self.catalog.group_table_len()),
        )
    }

    fn skip_chunk(&self, index: &ChunkIndex) -> bool {
        index.can_skip(self.filter)
    }

    fn visit(
        &self,
        (segment, groups): &mut Self::Acc,
        recipe: &Recipe,
    ) -> Result<(), DatabaseError> {
        if self.filter.matches(recipe, self.catalog) {
            segment.push(recipe.id)?;
            groups.add(recipe);
        }
        Ok(())
    }
}

/// Scan the whole database with `filter`.
///
/// Per-group usage is left out of the stats when more than
/// `group_stat_limit` recipes match.
pub fn run(
    ctx: &StageContext<'_>,
    filter: &SearchFilter,
    group_stat_limit: Option<usize>,
) -> Result<StageOutput, HostError> {
    filter.validate()?;
    let start = Instant::now();
    info!(?filter, "search started");

    let builder = ctx.result_builder()?;
    let plan = SearchPlan {
        filter,
        catalog: ctx.db.catalog(),
        builder: &builder,
    };
    let tracker = ctx.tracker(ctx.db.total_record() as usize);
    let chunks = ctx
        .db
        .scan(&plan, ctx.signal, &|count| tracker.lock().add(count))?;
    tracker.lock().finish();

    let mut segments = Vec::with_capacity(chunks.len());
    let mut group_stat = GroupStat::new(ctx.db.catalog().group_table_len());
    for (segment, groups) in chunks {
        group_stat.merge(&groups);
        segments.push(segment.finish()?);
    }
    let result = builder.build(segments);
    let found_count = result.len();
    let group_stat = match group_stat_limit {
        Some(limit) if found_count > limit => {
            info!(found_count, limit, "too many results, skipping group stats");
            None
        }
        _ => Some(group_stat),
    };

    info!(found_count, elapsed = ?start.elapsed(), "search finished");
    Ok(StageOutput {
        result,
        stats: Stats::new(found_count, group_stat),
    })
}
