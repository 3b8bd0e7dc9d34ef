mod clause;
mod plan;

pub use clause::{Bound, Clause};
pub use plan::{QueryPlan, SortSpec};
