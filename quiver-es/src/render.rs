//! Query plan → Elasticsearch request body

use crate::dsl::{
    BoolQuery, EsAggregation, EsQuery, EsSearchBody, ExistsQuery, FieldAgg, FiltersAgg,
    NestedAgg, NestedQuery, NestedSort, RangeParams, ReverseNestedAgg, SortParams, SourceFilter,
    TermsAgg, WildcardParams,
};
use quiver::aggregations::{AggClause, PlannedAggregation};
use quiver::query::{Clause, QueryPlan, SortSpec};
use std::collections::BTreeMap;

/// Sub-aggregation name used for each step from a facet down to its buckets
pub const INNER_AGG: &str = "values";
/// Sub-aggregation name carrying the root document count of a nested bucket
pub const ROOT_AGG: &str = "root";

pub fn render_clause(clause: &Clause) -> EsQuery {
    match clause {
        Clause::MatchAll => EsQuery::match_all(),
        Clause::And(clauses) => EsQuery::Bool(BoolQuery {
            filter: clauses.iter().map(render_clause).collect(),
            ..Default::default()
        }),
        Clause::Or(clauses) => EsQuery::Bool(BoolQuery {
            should: clauses.iter().map(render_clause).collect(),
            minimum_should_match: Some(1),
            ..Default::default()
        }),
        Clause::Not(inner) => EsQuery::Bool(BoolQuery {
            must_not: vec![render_clause(inner)],
            ..Default::default()
        }),
        Clause::Term { field, values } => {
            EsQuery::Terms(BTreeMap::from([(field.clone(), values.clone())]))
        }
        Clause::Range {
            field,
            lower,
            upper,
        } => {
            let mut params = RangeParams::default();
            if let Some(b) = lower {
                if b.inclusive {
                    params.gte = Some(b.value.clone());
                } else {
                    params.gt = Some(b.value.clone());
                }
            }
            if let Some(b) = upper {
                if b.inclusive {
                    params.lte = Some(b.value.clone());
                } else {
                    params.lt = Some(b.value.clone());
                }
            }
            EsQuery::Range(BTreeMap::from([(field.clone(), params)]))
        }
        Clause::Exists { field } => EsQuery::Exists(ExistsQuery {
            field: field.clone(),
        }),
        Clause::Wildcard {
            field,
            pattern,
            case_insensitive,
        } => EsQuery::Wildcard(BTreeMap::from([(
            field.clone(),
            WildcardParams {
                value: pattern.clone(),
                case_insensitive: case_insensitive.then_some(true),
            },
        )])),
        Clause::NestedScope { path, clause } => EsQuery::Nested(NestedQuery {
            path: path.clone(),
            query: Box::new(render_clause(clause)),
        }),
    }
}

/// Render a full search request.
///
/// With facets, the filter moves to `post_filter` so each facet aggregation
/// can apply its own sibling-excluded filter to the whole index.
pub fn render_search(plan: &QueryPlan) -> EsSearchBody {
    let filter = render_clause(&plan.filter);
    let (query, post_filter) = if plan.has_aggregations() {
        let post = (!filter.is_match_all()).then_some(filter);
        (EsQuery::match_all(), post)
    } else {
        (filter, None)
    };

    EsSearchBody {
        query,
        post_filter,
        from: plan.from,
        size: plan.size,
        sort: plan.sort.iter().map(render_sort).collect(),
        source: if plan.source_fields.is_empty() {
            SourceFilter::Bool(false)
        } else {
            SourceFilter::Fields(plan.source_fields.clone())
        },
        aggs: plan
            .aggregations
            .iter()
            .map(|agg| (agg.facet.clone(), render_aggregation(agg)))
            .collect(),
        track_total_hits: true,
    }
}

fn render_sort(spec: &SortSpec) -> BTreeMap<String, SortParams> {
    let nested = spec.nested.iter().rev().fold(None, |inner, path| {
        Some(NestedSort {
            path: path.clone(),
            nested: inner.map(Box::new),
        })
    });
    BTreeMap::from([(
        spec.field.clone(),
        SortParams {
            order: spec.direction.as_str().to_string(),
            nested,
        },
    )])
}

/// Nested buckets rank by root document count, the count they report.
fn terms_order(nested: bool) -> Vec<BTreeMap<String, String>> {
    let count = if nested {
        format!("{}>_count", ROOT_AGG)
    } else {
        "_count".to_string()
    };
    vec![
        BTreeMap::from([(count, "desc".to_string())]),
        BTreeMap::from([("_key".to_string(), "asc".to_string())]),
    ]
}

fn render_aggregation(agg: &AggClause) -> EsAggregation {
    let nested = !agg.nested.is_empty();
    let mut buckets = match &agg.kind {
        PlannedAggregation::Terms { size } => EsAggregation {
            terms: Some(TermsAgg {
                field: agg.field.clone(),
                size: *size,
                order: terms_order(nested),
            }),
            ..Default::default()
        },
        PlannedAggregation::Range { buckets } => EsAggregation {
            filters: Some(FiltersAgg {
                filters: buckets.iter().map(|b| render_clause(&b.clause)).collect(),
            }),
            ..Default::default()
        },
        PlannedAggregation::Stats => EsAggregation {
            stats: Some(FieldAgg {
                field: agg.field.clone(),
            }),
            ..Default::default()
        },
    };

    if nested && buckets.stats.is_none() {
        buckets.aggs.insert(
            ROOT_AGG.to_string(),
            EsAggregation {
                reverse_nested: Some(ReverseNestedAgg {}),
                ..Default::default()
            },
        );
    }

    let scoped = agg.nested.iter().rev().fold(buckets, |inner, path| EsAggregation {
        nested: Some(NestedAgg { path: path.clone() }),
        aggs: BTreeMap::from([(INNER_AGG.to_string(), inner)]),
        ..Default::default()
    });

    EsAggregation {
        filter: Some(Box::new(render_clause(&agg.filter))),
        aggs: BTreeMap::from([(INNER_AGG.to_string(), scoped)]),
        ..Default::default()
    }
}
