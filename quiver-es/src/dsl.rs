//! Elasticsearch Query DSL types
//!
//! The subset of the DSL that rendered query plans use. Optional parts are
//! skipped when serializing so request bodies stay minimal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root search request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsSearchBody {
    pub query: EsQuery,

    /// Applied to hits after aggregations are computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_filter: Option<EsQuery>,

    pub from: usize,
    pub size: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<BTreeMap<String, SortParams>>,

    #[serde(rename = "_source")]
    pub source: SourceFilter,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, EsAggregation>,

    pub track_total_hits: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceFilter {
    Bool(bool),
    Fields(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortParams {
    pub order: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedSort>,
}

/// Nested sort context; multi-level paths chain through `nested`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedSort {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<NestedSort>>,
}

/// ES query types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsQuery {
    MatchAll(MatchAllQuery),

    /// Exact match on any of the values
    Terms(BTreeMap<String, Vec<Value>>),

    Range(BTreeMap<String, RangeParams>),

    Bool(BoolQuery),

    Exists(ExistsQuery),

    Wildcard(BTreeMap<String, WildcardParams>),

    Nested(NestedQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAllQuery {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardParams {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<EsQuery>,
}

/// ES aggregation; exactly one of the aggregation kinds is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsAggregation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<EsQuery>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_nested: Option<ReverseNestedAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FiltersAgg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<FieldAgg>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, EsAggregation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedAgg {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseNestedAgg {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAgg {
    pub field: String,
    pub size: usize,
    /// Ordered criteria, e.g. `[{"_count": "desc"}, {"_key": "asc"}]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<BTreeMap<String, String>>,
}

/// Anonymous filters; buckets come back as an array in filter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiltersAgg {
    pub filters: Vec<EsQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAgg {
    pub field: String,
}

impl EsQuery {
    pub fn match_all() -> Self {
        EsQuery::MatchAll(MatchAllQuery {})
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, EsQuery::MatchAll(_))
    }
}
