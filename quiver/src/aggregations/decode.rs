use super::types::{FacetBucket, FacetResult, PlannedAggregation};
use crate::engine::RawAggregation;
use crate::query::QueryPlan;
use crate::{Error, Result};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Decode raw aggregation output into facet results keyed by facet name.
///
/// Terms buckets keep engine order unless `sort_by_key` is set, in which case
/// they are stably ordered by count descending, then key ascending. Range
/// buckets are matched to the plan by position and take the planned keys.
pub fn decode_aggregations(
    plan: &QueryPlan,
    raw: &HashMap<String, RawAggregation>,
    sort_by_key: bool,
) -> Result<BTreeMap<String, FacetResult>> {
    let mut out = BTreeMap::new();
    for agg in &plan.aggregations {
        let raw_agg = raw
            .get(&agg.facet)
            .ok_or_else(|| malformed(plan, format!("missing aggregation '{}'", agg.facet)))?;

        let result = match (&agg.kind, raw_agg) {
            (PlannedAggregation::Stats, RawAggregation::Stats(stats)) => {
                FacetResult::Stats(stats.clone())
            }
            (PlannedAggregation::Terms { .. }, RawAggregation::Buckets(buckets)) => {
                let mut buckets: Vec<FacetBucket> = buckets
                    .iter()
                    .map(|b| FacetBucket {
                        key: b.key.clone(),
                        doc_count: b.root_doc_count.unwrap_or(b.doc_count),
                    })
                    .collect();
                if sort_by_key {
                    buckets.sort_by(|a, b| {
                        (Reverse(a.doc_count), &a.key).cmp(&(Reverse(b.doc_count), &b.key))
                    });
                }
                FacetResult::Buckets(buckets)
            }
            (PlannedAggregation::Range { buckets: planned }, RawAggregation::Buckets(buckets)) => {
                if planned.len() != buckets.len() {
                    return Err(malformed(
                        plan,
                        format!(
                            "facet '{}' expected {} range buckets, got {}",
                            agg.facet,
                            planned.len(),
                            buckets.len()
                        ),
                    ));
                }
                FacetResult::Buckets(
                    planned
                        .iter()
                        .zip(buckets)
                        .map(|(p, b)| FacetBucket {
                            key: p.key.clone(),
                            doc_count: b.root_doc_count.unwrap_or(b.doc_count),
                        })
                        .collect(),
                )
            }
            _ => {
                return Err(malformed(
                    plan,
                    format!("aggregation '{}' has an unexpected shape", agg.facet),
                ))
            }
        };
        out.insert(agg.facet.clone(), result);
    }
    Ok(out)
}

fn malformed(plan: &QueryPlan, reason: String) -> Error {
    Error::EngineQuery {
        index: plan.index.clone(),
        status: None,
        reason,
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::{AggClause, RangeBucketPlan, StatsResult};
    use crate::engine::RawBucket;
    use crate::query::Clause;

    fn plan(aggregations: Vec<AggClause>) -> QueryPlan {
        QueryPlan {
            index: "cases".to_string(),
            filter: Clause::MatchAll,
            aggregations,
            sort: vec![],
            from: 0,
            size: 0,
            source_fields: vec![],
        }
    }

    fn agg(facet: &str, kind: PlannedAggregation) -> AggClause {
        AggClause {
            facet: facet.to_string(),
            field: facet.to_string(),
            filter: Clause::MatchAll,
            nested: vec![],
            kind,
        }
    }

    fn keys(result: &FacetResult) -> Vec<(&str, u64)> {
        result
            .buckets()
            .unwrap()
            .iter()
            .map(|b| (b.key.as_str(), b.doc_count))
            .collect()
    }

    #[test]
    fn test_terms_keep_engine_order_unless_sorted() {
        let plan = plan(vec![agg("status", PlannedAggregation::Terms { size: 10 })]);
        let raw = HashMap::from([(
            "status".to_string(),
            RawAggregation::Buckets(vec![
                RawBucket::new("b", 2),
                RawBucket::new("c", 5),
                RawBucket::new("a", 2),
            ]),
        )]);

        let decoded = decode_aggregations(&plan, &raw, false).unwrap();
        assert_eq!(keys(&decoded["status"]), vec![("b", 2), ("c", 5), ("a", 2)]);

        let decoded = decode_aggregations(&plan, &raw, true).unwrap();
        assert_eq!(keys(&decoded["status"]), vec![("c", 5), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_nested_terms_prefer_root_count() {
        let plan = plan(vec![agg("donors__gender", PlannedAggregation::Terms { size: 10 })]);
        let raw = HashMap::from([(
            "donors__gender".to_string(),
            RawAggregation::Buckets(vec![RawBucket {
                key: "female".to_string(),
                doc_count: 7,
                root_doc_count: Some(4),
            }]),
        )]);
        let decoded = decode_aggregations(&plan, &raw, false).unwrap();
        assert_eq!(keys(&decoded["donors__gender"]), vec![("female", 4)]);
    }

    #[test]
    fn test_range_takes_planned_keys() {
        let planned = vec![
            RangeBucketPlan {
                key: "young".to_string(),
                clause: Clause::MatchAll,
            },
            RangeBucketPlan {
                key: "18-65".to_string(),
                clause: Clause::MatchAll,
            },
        ];
        let plan = plan(vec![agg("age", PlannedAggregation::Range { buckets: planned })]);
        let raw = HashMap::from([(
            "age".to_string(),
            RawAggregation::Buckets(vec![RawBucket::new("", 1), RawBucket::new("", 3)]),
        )]);
        let decoded = decode_aggregations(&plan, &raw, true).unwrap();
        assert_eq!(keys(&decoded["age"]), vec![("young", 1), ("18-65", 3)]);

        let short = HashMap::from([(
            "age".to_string(),
            RawAggregation::Buckets(vec![RawBucket::new("", 1)]),
        )]);
        assert_eq!(
            decode_aggregations(&plan, &short, false).unwrap_err().kind(),
            "engine_query"
        );
    }

    #[test]
    fn test_missing_and_mismatched_aggregations() {
        let plan = plan(vec![agg("age", PlannedAggregation::Stats)]);
        let err = decode_aggregations(&plan, &HashMap::new(), false).unwrap_err();
        assert_eq!(err.kind(), "engine_query");

        let wrong = HashMap::from([("age".to_string(), RawAggregation::Buckets(vec![]))]);
        assert!(decode_aggregations(&plan, &wrong, false).is_err());

        let stats = StatsResult {
            count: 2,
            min: Some(1.0),
            max: Some(3.0),
            avg: Some(2.0),
            sum: Some(4.0),
        };
        let ok = HashMap::from([("age".to_string(), RawAggregation::Stats(stats.clone()))]);
        assert_eq!(
            decode_aggregations(&plan, &ok, false).unwrap()["age"],
            FacetResult::Stats(stats)
        );
    }
}
