//! Engine hits → GraphQL-shaped records

use crate::engine::RawHit;
use crate::schema::{FieldRegistry, ResolvedField};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

pub struct ResultDecoder<'a> {
    fields: Vec<ResolvedField<'a>>,
}

impl<'a> ResultDecoder<'a> {
    /// Resolve the requested fields up front so decoding a hit cannot fail.
    pub fn new(registry: &'a FieldRegistry, requested: &[String]) -> Result<Self> {
        let fields = requested
            .iter()
            .enumerate()
            .map(|(i, name)| registry.resolve_field(name, &format!("fields[{}]", i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    /// Source paths needed to decode the requested fields.
    pub fn source_fields(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if !paths.iter().any(|p| p == field.es_path) {
                paths.push(field.es_path.to_string());
            }
        }
        paths
    }

    pub fn decode(&self, hits: &[RawHit]) -> Vec<Record> {
        hits.iter().map(|hit| self.decode_hit(hit)).collect()
    }

    fn decode_hit(&self, hit: &RawHit) -> Record {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let raw = extract(&hit.source, field.es_path).unwrap_or(Value::Null);
                let value = match &field.spec.display_values {
                    Some(labels) => display(raw, labels),
                    None => raw,
                };
                (field.name().to_string(), value)
            })
            .collect();
        Record {
            id: hit.id.clone(),
            fields,
        }
    }
}

/// Follow a dot path, flattening through arrays.
pub fn extract(source: &Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    extract_segments(source, &segments)
}

fn extract_segments(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Object(obj) => obj.get(*head).and_then(|v| extract_segments(v, rest)),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match extract_segments(item, segments) {
                    Some(Value::Array(inner)) => out.extend(inner),
                    Some(Value::Null) | None => {}
                    Some(v) => out.push(v),
                }
            }
            Some(Value::Array(out))
        }
        _ => None,
    }
}

fn display(value: Value, labels: &HashMap<String, String>) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| display(v, labels)).collect()),
        Value::Null => Value::Null,
        other => {
            let key = match &other {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            };
            match labels.get(&key) {
                Some(label) => Value::String(label.clone()),
                None => other,
            }
        }
    }
}
