mod decode;
mod planner;
pub mod types;

pub use decode::decode_aggregations;
pub use planner::AggregationPlanner;
pub use types::{
    AggClause, AggregationKind, AggregationSpec, FacetBucket, FacetResult, PlannedAggregation,
    RangeBucketPlan, RangeSpec, StatsResult,
};
