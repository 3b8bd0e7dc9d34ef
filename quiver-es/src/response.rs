//! Elasticsearch response → engine-agnostic raw response

use crate::error::EsError;
use crate::render::INNER_AGG;
use crate::Result;
use quiver::aggregations::StatsResult;
use quiver::query::QueryPlan;
use quiver::{RawAggregation, RawBucket, RawHit, RawSearchResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// ES search response, reduced to the parts the adapter reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsSearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: HitsResponse,
    #[serde(default)]
    pub aggregations: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitsResponse {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// `{"value": n, "relation": "eq"}` on ES 7+, a bare number before that
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
    Count(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsBucket {
    #[serde(default)]
    pub key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    /// Reverse-nested count, present for facets under a nested scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<DocCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocCount {
    pub doc_count: u64,
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value, .. } => *value,
            TotalHits::Count(n) => *n,
        }
    }
}

pub fn parse_search_response(plan: &QueryPlan, body: Value) -> Result<RawSearchResponse> {
    let parse_err = |reason: String| EsError::Parse {
        index: plan.index.clone(),
        reason,
    };
    let response: EsSearchResponse =
        serde_json::from_value(body).map_err(|e| parse_err(e.to_string()))?;

    let hits = response
        .hits
        .hits
        .into_iter()
        .map(|hit| RawHit {
            id: hit.id,
            source: hit.source.unwrap_or(Value::Null),
        })
        .collect();

    let mut aggregations = HashMap::with_capacity(plan.aggregations.len());
    for agg in &plan.aggregations {
        let node = response
            .aggregations
            .get(&agg.facet)
            .ok_or_else(|| parse_err(format!("missing aggregation '{}'", agg.facet)))?;
        let raw = parse_facet(node)
            .map_err(|reason| parse_err(format!("aggregation '{}': {}", agg.facet, reason)))?;
        aggregations.insert(agg.facet.clone(), raw);
    }

    Ok(RawSearchResponse {
        total: response.hits.total.map(|t| t.value()).unwrap_or(0),
        hits,
        aggregations,
    })
}

/// Descend through the filter and nested wrappers to the bucketing node.
fn parse_facet(mut node: &Value) -> std::result::Result<RawAggregation, String> {
    loop {
        if let Some(buckets) = node.get("buckets") {
            let buckets: Vec<EsBucket> =
                serde_json::from_value(buckets.clone()).map_err(|e| e.to_string())?;
            return Ok(RawAggregation::Buckets(
                buckets.into_iter().map(into_raw_bucket).collect(),
            ));
        }
        if node.get("count").is_some() {
            let stats: StatsResult =
                serde_json::from_value(node.clone()).map_err(|e| e.to_string())?;
            return Ok(RawAggregation::Stats(stats));
        }
        node = node
            .get(INNER_AGG)
            .ok_or_else(|| "no buckets or stats found".to_string())?;
    }
}

fn into_raw_bucket(bucket: EsBucket) -> RawBucket {
    let key = match (bucket.key_as_string, bucket.key) {
        (Some(s), _) => s,
        (None, Some(Value::String(s))) => s,
        (None, Some(v)) => v.to_string(),
        (None, None) => String::new(),
    };
    RawBucket {
        key,
        doc_count: bucket.doc_count,
        root_doc_count: bucket.root.map(|r| r.doc_count),
    }
}
