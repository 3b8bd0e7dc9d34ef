//! Inbound search entry point
//!
//! [`SearchService`] looks up the document type, compiles the filter, plans
//! facets and paging into one [`QueryPlan`], runs it on the engine under a
//! timeout and decodes the response. All compile-stage errors surface before
//! the engine is called.

use crate::aggregations::{decode_aggregations, AggregationPlanner, AggregationSpec, FacetResult};
use crate::config::Config;
use crate::decoder::{Record, ResultDecoder};
use crate::engine::SearchEngine;
use crate::pagination::{PaginationArgs, PaginationResolver};
use crate::query::QueryPlan;
use crate::schema::{ConfigStore, FieldRegistry, SortField};
use crate::sqon::{Sqon, SqonCompiler};
use crate::{metrics, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub project: String,
    pub document_type: String,
    /// Raw SQON document; absent or null matches everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqon: Option<Value>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub sort: Vec<SortField>,
    #[serde(default, flatten)]
    pub pagination: PaginationArgs,
    #[serde(default)]
    pub facets: Vec<AggregationSpec>,
    /// Order terms buckets by count, then key, instead of engine order
    #[serde(default)]
    pub sort_buckets_by_key: bool,
    /// Overrides `engine.request_timeout_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SearchRequest {
    pub fn new(project: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            document_type: document_type.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub data: Vec<Record>,
    pub aggregations: BTreeMap<String, FacetResult>,
}

pub struct SearchService {
    store: Arc<ConfigStore>,
    engine: Arc<dyn SearchEngine>,
    config: Arc<Config>,
}

impl SearchService {
    pub fn new(store: Arc<ConfigStore>, engine: Arc<dyn SearchEngine>, config: Arc<Config>) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Build the query plan for a request without executing it.
    pub fn plan(&self, request: &SearchRequest) -> Result<QueryPlan> {
        let registry = self.store.get(&request.project, &request.document_type)?;
        let (plan, _) = self.prepare(request, &registry)?;
        Ok(plan)
    }

    #[instrument(skip_all, fields(project = %request.project, document_type = %request.document_type))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let result = self.run(request).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_search(&request.project, &request.document_type, outcome);
        result
    }

    async fn run(&self, request: &SearchRequest) -> Result<SearchResponse> {
        // Hold the registry for the whole request so a concurrent swap can't change it midway
        let registry = self.store.get(&request.project, &request.document_type)?;
        let (plan, decoder) = self.prepare(request, &registry)?;
        debug!(index = %plan.index, from = plan.from, size = plan.size, facets = plan.aggregations.len(), "Compiled query plan");

        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.engine.request_timeout());

        let start = Instant::now();
        let raw = tokio::time::timeout(timeout, self.engine.execute(&plan)).await;
        metrics::record_engine_latency(&plan.index, start.elapsed());

        let raw = match raw {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(index = %plan.index, error = %e, "Search engine query failed");
                return Err(e);
            }
            Err(_) => {
                warn!(index = %plan.index, "Search engine timed out after {}ms", timeout.as_millis());
                return Err(Error::EngineTimeout {
                    index: plan.index.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        let aggregations =
            decode_aggregations(&plan, &raw.aggregations, request.sort_buckets_by_key)?;
        Ok(SearchResponse {
            total: raw.total,
            data: decoder.decode(&raw.hits),
            aggregations,
        })
    }

    fn prepare<'r>(
        &self,
        request: &SearchRequest,
        registry: &'r FieldRegistry,
    ) -> Result<(QueryPlan, ResultDecoder<'r>)> {
        let max_depth = self.config.compiler.max_depth;
        let sqon = match &request.sqon {
            None | Some(Value::Null) => None,
            Some(doc) => Some(Sqon::from_json(doc, max_depth)?),
        };

        let filter = SqonCompiler::new(registry)
            .with_max_depth(max_depth)
            .compile_opt(sqon.as_ref())?;
        let aggregations = AggregationPlanner::new(registry, &self.config.aggregations)
            .with_max_depth(max_depth)
            .plan(&request.facets, sqon.as_ref())?;
        let page = PaginationResolver::new(registry, &self.config.pagination)
            .resolve(&request.sort, &request.pagination)?;
        let decoder = ResultDecoder::new(registry, &request.fields)?;

        let plan = QueryPlan {
            index: registry.index().to_string(),
            filter,
            aggregations,
            sort: page.sort,
            from: page.from,
            size: page.size,
            source_fields: decoder.source_fields(),
        };
        Ok((plan, decoder))
    }
}
