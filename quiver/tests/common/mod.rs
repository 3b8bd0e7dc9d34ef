//! In-memory search engine for integration tests.
//!
//! Evaluates [`QueryPlan`]s directly over JSON documents with the same
//! semantics an Elasticsearch index with nested mappings would apply.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quiver::aggregations::{AggClause, PlannedAggregation, StatsResult};
use quiver::decoder::extract;
use quiver::query::{Bound, Clause, QueryPlan};
use quiver::schema::{DocumentTypeConfig, FieldSpec, FieldType, SortDirection};
use quiver::{RawAggregation, RawBucket, RawHit, RawSearchResponse, Result, SearchEngine};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
pub struct MemoryEngine {
    indices: HashMap<String, Vec<(String, Value)>>,
    pub executed: Mutex<Vec<QueryPlan>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs(mut self, index: &str, docs: Vec<(&str, Value)>) -> Self {
        self.indices.insert(
            index.to_string(),
            docs.into_iter().map(|(id, v)| (id.to_string(), v)).collect(),
        );
        self
    }

    fn docs(&self, index: &str) -> &[(String, Value)] {
        self.indices.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn execute(&self, plan: &QueryPlan) -> Result<RawSearchResponse> {
        self.executed.lock().push(plan.clone());
        let docs = self.docs(&plan.index);

        let mut matched: Vec<&(String, Value)> = docs
            .iter()
            .filter(|(_, doc)| eval(&plan.filter, doc, ""))
            .collect();
        matched.sort_by(|a, b| compare_hits(plan, a, b));

        let hits = matched
            .iter()
            .skip(plan.from)
            .take(plan.size)
            .map(|(id, source)| RawHit {
                id: id.clone(),
                source: source.clone(),
            })
            .collect();

        let aggregations = plan
            .aggregations
            .iter()
            .map(|agg| (agg.facet.clone(), aggregate(agg, docs)))
            .collect();

        Ok(RawSearchResponse {
            total: matched.len() as u64,
            hits,
            aggregations,
        })
    }
}

/// Evaluate `clause` against `ctx`, whose fields live under `prefix`.
pub fn eval(clause: &Clause, ctx: &Value, prefix: &str) -> bool {
    match clause {
        Clause::MatchAll => true,
        Clause::And(cs) => cs.iter().all(|c| eval(c, ctx, prefix)),
        Clause::Or(cs) => cs.iter().any(|c| eval(c, ctx, prefix)),
        Clause::Not(c) => !eval(c, ctx, prefix),
        Clause::Term { field, values } => {
            let wanted: Vec<String> = values.iter().map(key_of).collect();
            values_at(ctx, prefix, field)
                .iter()
                .any(|v| wanted.contains(&key_of(v)))
        }
        Clause::Range {
            field,
            lower,
            upper,
        } => values_at(ctx, prefix, field)
            .iter()
            .any(|v| in_bounds(v, lower.as_ref(), upper.as_ref())),
        Clause::Exists { field } => !values_at(ctx, prefix, field).is_empty(),
        Clause::Wildcard { field, pattern, .. } => {
            let needle = pattern
                .trim_start_matches('*')
                .trim_end_matches('*')
                .replace('\\', "")
                .to_lowercase();
            values_at(ctx, prefix, field)
                .iter()
                .any(|v| key_of(v).to_lowercase().contains(&needle))
        }
        Clause::NestedScope { path, clause } => nested_objects(ctx, prefix, path)
            .iter()
            .any(|obj| eval(clause, obj, path)),
    }
}

fn relative<'a>(prefix: &str, path: &'a str) -> &'a str {
    if prefix.is_empty() {
        return path;
    }
    path.strip_prefix(prefix)
        .and_then(|p| p.strip_prefix('.'))
        .unwrap_or(path)
}

fn values_at(ctx: &Value, prefix: &str, path: &str) -> Vec<Value> {
    match extract(ctx, relative(prefix, path)) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(v) => vec![v],
    }
}

fn nested_objects(ctx: &Value, prefix: &str, path: &str) -> Vec<Value> {
    values_at(ctx, prefix, path)
        .into_iter()
        .filter(Value::is_object)
        .collect()
}

pub fn key_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    let num = |v: &Value| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match (num(a), num(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => key_of(a).cmp(&key_of(b)),
    }
}

fn in_bounds(v: &Value, lower: Option<&Bound>, upper: Option<&Bound>) -> bool {
    let above = lower.map_or(true, |b| match compare_values(v, &b.value) {
        Ordering::Greater => true,
        Ordering::Equal => b.inclusive,
        Ordering::Less => false,
    });
    let below = upper.map_or(true, |b| match compare_values(v, &b.value) {
        Ordering::Less => true,
        Ordering::Equal => b.inclusive,
        Ordering::Greater => false,
    });
    above && below
}

fn compare_hits(plan: &QueryPlan, a: &(String, Value), b: &(String, Value)) -> Ordering {
    for spec in &plan.sort {
        let key = |(id, doc): &(String, Value)| -> Option<Value> {
            if spec.field == "_id" {
                return Some(Value::String(id.clone()));
            }
            values_at(doc, "", &spec.field).into_iter().next()
        };
        let ord = match (key(a), key(b)) {
            (Some(x), Some(y)) => compare_values(&x, &y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ord = match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Bucketing contexts for one root document: the document itself, or every
/// object reached by descending the facet's nested chain.
fn contexts(doc: &Value, chain: &[String]) -> Vec<Value> {
    let mut current = vec![(doc.clone(), String::new())];
    for path in chain {
        current = current
            .iter()
            .flat_map(|(ctx, prefix)| {
                nested_objects(ctx, prefix, path)
                    .into_iter()
                    .map(|obj| (obj, path.clone()))
            })
            .collect();
    }
    current.into_iter().map(|(ctx, _)| ctx).collect()
}

fn aggregate(agg: &AggClause, docs: &[(String, Value)]) -> RawAggregation {
    let prefix = agg.nested.last().map(String::as_str).unwrap_or("");
    let scoped: Vec<(usize, Value)> = docs
        .iter()
        .enumerate()
        .filter(|(_, (_, doc))| eval(&agg.filter, doc, ""))
        .flat_map(|(i, (_, doc))| contexts(doc, &agg.nested).into_iter().map(move |c| (i, c)))
        .collect();
    let nested = !agg.nested.is_empty();

    match &agg.kind {
        PlannedAggregation::Terms { size } => {
            let mut counts: HashMap<String, (u64, BTreeSet<usize>)> = HashMap::new();
            for (root, ctx) in &scoped {
                let keys: BTreeSet<String> =
                    values_at(ctx, prefix, &agg.field).iter().map(key_of).collect();
                for key in keys {
                    let entry = counts.entry(key).or_default();
                    entry.0 += 1;
                    entry.1.insert(*root);
                }
            }
            let mut buckets: Vec<RawBucket> = counts
                .into_iter()
                .map(|(key, (count, roots))| RawBucket {
                    key,
                    doc_count: count,
                    root_doc_count: nested.then_some(roots.len() as u64),
                })
                .collect();
            // Nested buckets rank by root document count, as the rendered `root>_count` order does
            let rank = |b: &RawBucket| b.root_doc_count.unwrap_or(b.doc_count);
            buckets.sort_by(|a, b| rank(b).cmp(&rank(a)).then_with(|| a.key.cmp(&b.key)));
            buckets.truncate(*size);
            RawAggregation::Buckets(buckets)
        }
        PlannedAggregation::Range { buckets } => RawAggregation::Buckets(
            buckets
                .iter()
                .map(|bucket| {
                    let hits: Vec<usize> = scoped
                        .iter()
                        .filter(|(_, ctx)| eval(&bucket.clause, ctx, prefix))
                        .map(|(root, _)| *root)
                        .collect();
                    let roots: BTreeSet<usize> = hits.iter().copied().collect();
                    RawBucket {
                        key: String::new(),
                        doc_count: hits.len() as u64,
                        root_doc_count: nested.then_some(roots.len() as u64),
                    }
                })
                .collect(),
        ),
        PlannedAggregation::Stats => {
            let nums: Vec<f64> = scoped
                .iter()
                .flat_map(|(_, ctx)| values_at(ctx, prefix, &agg.field))
                .filter_map(|v| v.as_f64())
                .collect();
            let sum: f64 = nums.iter().sum();
            let count = nums.len() as u64;
            RawAggregation::Stats(StatsResult {
                count,
                min: nums.iter().copied().reduce(f64::min),
                max: nums.iter().copied().reduce(f64::max),
                avg: (count > 0).then(|| sum / count as f64),
                sum: (count > 0).then_some(sum),
            })
        }
    }
}

/// Document type shared by the integration suites.
pub fn cases_config() -> DocumentTypeConfig {
    DocumentTypeConfig {
        name: "cases".to_string(),
        project: "demo".to_string(),
        index: "cases".to_string(),
        fields: vec![
            FieldSpec::new("status", FieldType::Keyword)
                .with_display_values([("open", "Open"), ("closed", "Closed")]),
            FieldSpec::new("age", FieldType::Long),
            FieldSpec::new("title", FieldType::Text),
            FieldSpec::new("donors", FieldType::Nested),
            FieldSpec::new("donors__gender", FieldType::Keyword),
            FieldSpec::new("donors__age", FieldType::Long),
        ],
        default_sort: vec![],
        id_field: "_id".to_string(),
    }
}
