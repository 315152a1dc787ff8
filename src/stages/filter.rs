use super::{StageContext, StageOutput};
use crate::catalog::{EMPTY_GROUP, GroupId};
use crate::error::{DatabaseError, HostError};
use crate::query::{GroupStat, ResultSet, ResultSetBuilder, SegmentWriter, Stats};
use crate::store::{Recipe, ScanPlan};
use ahash::AHashSet;
use std::time::Instant;
use tracing::{info, warn};

struct FilterPlan<'a> {
    included: AHashSet<GroupId>,
    group_table_len: usize,
    builder: &'a ResultSetBuilder,
}

impl FilterPlan<'_> {
    fn keeps(&self, recipe: &Recipe) -> bool {
        recipe.slots.iter().all(|group| self.included.contains(group))
    }
}

impl ScanPlan for FilterPlan<'_> {
    type Acc = (SegmentWriter, GroupStat);

    fn start(&self, chunk: u32) -> Self::Acc {
        (
            self.builder.segment(chunk),
            GroupStat::new(self.group_table_len),
        )
    }

    fn visit(
        &self,
        (segment, groups): &mut Self::Acc,
        recipe: &Recipe,
    ) -> Result<(), DatabaseError> {
        if self.keeps(recipe) {
            segment.push(recipe.id)?;
            groups.add(recipe);
        }
        Ok(())
    }
}

/// Narrow `input` to the recipes whose every ingredient group is in `groups`.
///
/// The empty group is always allowed, so a recipe with fewer ingredients
/// is kept as long as the ingredients it does have are allowed.
pub fn run(
    ctx: &StageContext<'_>,
    input: &ResultSet,
    groups: &[GroupId],
) -> Result<StageOutput, HostError> {
    let start = Instant::now();
    let catalog = ctx.db.catalog();
    let mut included: AHashSet<GroupId> = AHashSet::with_capacity(groups.len() + 1);
    for &group in groups {
        if !catalog.contains_group(group) {
            warn!(group, "filter references an unknown group, ignoring");
            continue;
        }
        included.insert(group);
    }
    included.insert(EMPTY_GROUP);
    info!(
        input = input.len(),
        groups = included.len() - 1,
        "filter started"
    );

    let builder = ctx.result_builder()?;
    let plan = FilterPlan {
        included,
        group_table_len: catalog.group_table_len(),
        builder: &builder,
    };
    let tracker = ctx.tracker(input.len());
    let chunks = ctx
        .db
        .scan_result(input, &plan, ctx.signal, &|count| tracker.lock().add(count))?;
    tracker.lock().finish();

    let mut segments = Vec::with_capacity(chunks.len());
    let mut group_stat = GroupStat::new(plan.group_table_len);
    for (segment, groups) in chunks {
        group_stat.merge(&groups);
        segments.push(segment.finish()?);
    }
    let result = builder.build(segments);
    let found_count = result.len();

    info!(found_count, elapsed = ?start.elapsed(), "filter finished");
    Ok(StageOutput {
        result,
        stats: Stats::new(found_count, Some(group_stat)),
    })
}
