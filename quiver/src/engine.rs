//! Outbound search engine seam

use crate::aggregations::StatsResult;
use crate::query::QueryPlan;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A search backend able to execute a [`QueryPlan`].
///
/// Implementations render the plan into their native syntax, run it against
/// `plan.index` and report failures as [`crate::Error::EngineQuery`]. Timeouts
/// are enforced by the caller.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn execute(&self, plan: &QueryPlan) -> Result<RawSearchResponse>;
}

/// Engine response, before field extraction and facet decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResponse {
    pub total: u64,
    pub hits: Vec<RawHit>,
    /// Keyed by facet name
    pub aggregations: HashMap<String, RawAggregation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub source: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawAggregation {
    /// Terms buckets in engine order, or range buckets in plan order
    Buckets(Vec<RawBucket>),
    Stats(StatsResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBucket {
    pub key: String,
    pub doc_count: u64,
    /// Root documents in the bucket, for facets under a nested scope
    pub root_doc_count: Option<u64>,
}

impl RawBucket {
    pub fn new(key: impl Into<String>, doc_count: u64) -> Self {
        Self {
            key: key.into(),
            doc_count,
            root_doc_count: None,
        }
    }
}
