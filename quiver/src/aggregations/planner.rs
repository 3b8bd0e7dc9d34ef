//! Facet aggregation planning
//!
//! Every facet is computed against the request filter with the facet's own
//! leaves removed, so selecting a value in a facet never hides the other
//! values of that same facet.

use super::types::{
    AggClause, AggregationKind, AggregationSpec, PlannedAggregation, RangeBucketPlan, RangeSpec,
};
use crate::config::AggregationConfig;
use crate::query::{Bound, Clause};
use crate::schema::{FieldRegistry, FieldType, ResolvedField};
use crate::sqon::{Sqon, SqonCompiler, DEFAULT_MAX_DEPTH};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;

pub struct AggregationPlanner<'a> {
    registry: &'a FieldRegistry,
    config: &'a AggregationConfig,
    max_depth: usize,
}

impl<'a> AggregationPlanner<'a> {
    pub fn new(registry: &'a FieldRegistry, config: &'a AggregationConfig) -> Self {
        Self {
            registry,
            config,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Plan one aggregation per facet, in request order.
    pub fn plan(&self, facets: &[AggregationSpec], filter: Option<&Sqon>) -> Result<Vec<AggClause>> {
        let mut seen = HashSet::new();
        facets
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                if !seen.insert(spec.field.as_str()) {
                    return Err(Error::InvalidAggregation {
                        facet: spec.field.clone(),
                        message: "facet requested more than once".to_string(),
                    });
                }
                self.plan_facet(spec, filter, &format!("facets[{}]", i))
            })
            .collect()
    }

    fn plan_facet(&self, spec: &AggregationSpec, filter: Option<&Sqon>, at: &str) -> Result<AggClause> {
        let field = self.registry.resolve_field(&spec.field, at)?;

        let kind = match &spec.kind {
            AggregationKind::Terms { size } => {
                if field.field_type().is_container() {
                    return Err(mismatch("terms", &field, at));
                }
                PlannedAggregation::Terms {
                    size: self.terms_size(&spec.field, *size)?,
                }
            }
            AggregationKind::Range { ranges } => {
                let t = field.field_type();
                if !(t.is_numeric() || t == FieldType::Date) {
                    return Err(mismatch("range", &field, at));
                }
                if ranges.is_empty() {
                    return Err(Error::InvalidAggregation {
                        facet: spec.field.clone(),
                        message: "range facet needs at least one range".to_string(),
                    });
                }
                PlannedAggregation::Range {
                    buckets: range_buckets(field.es_path, ranges),
                }
            }
            AggregationKind::Stats => {
                if !field.field_type().is_numeric() {
                    return Err(mismatch("stats", &field, at));
                }
                PlannedAggregation::Stats
            }
        };

        // Sibling exclusion: drop this facet's own leaves before compiling
        let siblings = filter.and_then(|sqon| sqon.without_field(&spec.field));
        let filter = SqonCompiler::new(self.registry)
            .with_max_depth(self.max_depth)
            .compile_opt(siblings.as_ref())?;

        Ok(AggClause {
            facet: spec.field.clone(),
            field: field.es_path.to_string(),
            filter,
            nested: field.nested.to_vec(),
            kind,
        })
    }

    fn terms_size(&self, facet: &str, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.config.default_terms_size),
            Some(size) if size == 0 || size > self.config.max_terms_size => {
                Err(Error::InvalidAggregation {
                    facet: facet.to_string(),
                    message: format!(
                        "terms size must be between 1 and {}, got {}",
                        self.config.max_terms_size, size
                    ),
                })
            }
            Some(size) => Ok(size),
        }
    }
}

fn mismatch(op: &str, field: &ResolvedField<'_>, at: &str) -> Error {
    Error::TypeMismatch {
        op: op.to_string(),
        field: field.name().to_string(),
        field_type: field.field_type().to_string(),
        path: at.to_string(),
    }
}

/// Inclusive-low, exclusive-high buckets; the last bucket is inclusive-high.
fn range_buckets(es_path: &str, ranges: &[RangeSpec]) -> Vec<RangeBucketPlan> {
    let last = ranges.len().saturating_sub(1);
    ranges
        .iter()
        .enumerate()
        .map(|(i, range)| {
            let upper = range.to.clone().map(|to| {
                if i == last {
                    Bound::inclusive(to)
                } else {
                    Bound::exclusive(to)
                }
            });
            RangeBucketPlan {
                key: range.key.clone().unwrap_or_else(|| {
                    format!("{}-{}", bound_label(&range.from), bound_label(&range.to))
                }),
                clause: match (&range.from, &upper) {
                    (None, None) => Clause::Exists {
                        field: es_path.to_string(),
                    },
                    _ => Clause::Range {
                        field: es_path.to_string(),
                        lower: range.from.clone().map(Bound::inclusive),
                        upper,
                    },
                },
            }
        })
        .collect()
}

fn bound_label(bound: &Option<Value>) -> String {
    match bound {
        None | Some(Value::Null) => "*".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
