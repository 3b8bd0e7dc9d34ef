use crate::query::Clause;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A facet requested by the caller, in GraphQL field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    #[serde(alias = "fieldName")]
    pub field: String,
    #[serde(flatten)]
    pub kind: AggregationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationKind {
    Terms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<usize>,
    },
    Range {
        ranges: Vec<RangeSpec>,
    },
    Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl AggregationSpec {
    pub fn terms(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: AggregationKind::Terms { size: None },
        }
    }

    pub fn terms_with_size(field: impl Into<String>, size: usize) -> Self {
        Self {
            field: field.into(),
            kind: AggregationKind::Terms { size: Some(size) },
        }
    }

    pub fn range(field: impl Into<String>, ranges: Vec<RangeSpec>) -> Self {
        Self {
            field: field.into(),
            kind: AggregationKind::Range { ranges },
        }
    }

    pub fn stats(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: AggregationKind::Stats,
        }
    }
}

impl RangeSpec {
    pub fn new(from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            key: None,
            from,
            to,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A planned facet aggregation.
///
/// Runs over every root document matching `filter` (the request filter minus
/// this facet's own leaves), then descends into `nested`, then buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct AggClause {
    /// Facet name; the GraphQL field name
    pub facet: String,
    /// Source path of the aggregated field
    pub field: String,
    pub filter: Clause,
    /// Nested ancestors of `field`, outermost first
    pub nested: Vec<String>,
    pub kind: PlannedAggregation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAggregation {
    Terms { size: usize },
    /// Explicit bucket filters, in request order
    Range { buckets: Vec<RangeBucketPlan> },
    Stats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeBucketPlan {
    pub key: String,
    pub clause: Clause,
}

/// Decoded facet, keyed by facet name in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetResult {
    Buckets(Vec<FacetBucket>),
    Stats(StatsResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
}

impl FacetResult {
    pub fn buckets(&self) -> Option<&[FacetBucket]> {
        match self {
            FacetResult::Buckets(b) => Some(b),
            FacetResult::Stats(_) => None,
        }
    }
}
