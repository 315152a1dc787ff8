//! Query inputs and outputs shared by the stages.

mod filter;
mod result_set;
mod stats;

pub use filter::SearchFilter;
pub use result_set::{
    ResultSegment, ResultSet, ResultSetBuilder, ResultStorage, SegmentIter, SegmentWriter,
};
pub use stats::{GroupStat, Stats};
