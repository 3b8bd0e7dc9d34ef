use super::Clause;
use crate::aggregations::AggClause;
use crate::schema::SortDirection;

/// Everything an engine needs to run one search request.
///
/// Built fresh per request by [`crate::SearchService::plan`] and discarded
/// after the response is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub index: String,
    /// Restricts hits and the total count. Aggregations ignore it and use
    /// their own sibling-excluded filter instead.
    pub filter: Clause,
    /// One entry per requested facet, in request order
    pub aggregations: Vec<AggClause>,
    pub sort: Vec<SortSpec>,
    pub from: usize,
    pub size: usize,
    /// Source paths to return with each hit
    pub source_fields: Vec<String>,
}

impl QueryPlan {
    pub fn has_aggregations(&self) -> bool {
        !self.aggregations.is_empty()
    }

    pub fn aggregation(&self, facet: &str) -> Option<&AggClause> {
        self.aggregations.iter().find(|a| a.facet == facet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Source path, or the engine's document id field
    pub field: String,
    pub direction: SortDirection,
    /// Nested ancestors of `field`, outermost first
    pub nested: Vec<String>,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            nested: Vec::new(),
        }
    }
}
