//! JSON → [`Sqon`] parsing
//!
//! Accepted node shapes:
//!
//! - combinator: `{"op": "and" | "or" | "not", "content": [ ... ]}`
//! - flat leaf: `{"op": "in", "fieldName": "status", "value": ["open"]}`
//! - enveloped leaf: `{"op": "in", "content": {"field": "status", "value": ["open"]}}`

use super::ast::{CombinatorOp, Leaf, LeafOp, Sqon};
use crate::{Error, Result};
use serde_json::{Map, Value};

pub const ROOT_PATH: &str = "sqon";

impl Sqon {
    /// Parse a SQON document, rejecting trees deeper than `max_depth`.
    pub fn from_json(value: &Value, max_depth: usize) -> Result<Sqon> {
        parse_node(value, ROOT_PATH, 1, max_depth)
    }
}

fn parse_node(value: &Value, path: &str, depth: usize, max_depth: usize) -> Result<Sqon> {
    if depth > max_depth {
        return Err(Error::invalid_sqon(
            format!("nesting exceeds maximum depth of {}", max_depth),
            path,
        ));
    }
    let obj = value
        .as_object()
        .ok_or_else(|| Error::invalid_sqon("expected an object", path))?;
    let op = obj
        .get("op")
        .ok_or_else(|| Error::invalid_sqon("missing 'op'", path))?
        .as_str()
        .ok_or_else(|| Error::invalid_sqon("'op' must be a string", path))?;

    if let Some(op) = parse_combinator_op(op) {
        let content = match obj.get("content") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(Error::invalid_sqon(
                    format!("'{}' content must be an array", op),
                    path,
                ))
            }
            None => {
                return Ok(Sqon::Combinator {
                    op,
                    content: Vec::new(),
                })
            }
        };
        let content = content
            .iter()
            .enumerate()
            .map(|(i, child)| {
                parse_node(child, &format!("{}.content[{}]", path, i), depth + 1, max_depth)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Sqon::Combinator { op, content });
    }

    let leaf_op = parse_leaf_op(op).ok_or_else(|| Error::UnsupportedOperator {
        op: op.to_string(),
        path: path.to_string(),
    })?;

    // Enveloped leaves carry their operands under `content`
    let operands: &Map<String, Value> = match obj.get("content") {
        Some(Value::Object(inner)) => inner,
        Some(_) => {
            return Err(Error::invalid_sqon(
                format!("'{}' content must be an object", op),
                path,
            ))
        }
        None => obj,
    };

    let field = ["fieldName", "field"]
        .iter()
        .find_map(|k| operands.get(*k))
        .ok_or_else(|| Error::invalid_sqon(format!("'{}' requires a field name", op), path))?
        .as_str()
        .ok_or_else(|| Error::invalid_sqon("field name must be a string", path))?;

    let value = operands.get("value").cloned().unwrap_or(Value::Null);
    if value.is_null() && !leaf_op.is_presence() {
        return Err(Error::invalid_sqon(
            format!("'{}' requires a value", op),
            path,
        ));
    }

    Ok(Sqon::Leaf(Leaf {
        op: leaf_op,
        field: field.to_string(),
        value,
    }))
}

fn parse_combinator_op(op: &str) -> Option<CombinatorOp> {
    match op.to_ascii_lowercase().as_str() {
        "and" => Some(CombinatorOp::And),
        "or" => Some(CombinatorOp::Or),
        "not" => Some(CombinatorOp::Not),
        _ => None,
    }
}

fn parse_leaf_op(op: &str) -> Option<LeafOp> {
    match op.to_ascii_lowercase().as_str() {
        "in" => Some(LeafOp::In),
        "not-in" | "not_in" | "notin" => Some(LeafOp::NotIn),
        "between" => Some(LeafOp::Between),
        ">=" | "gte" => Some(LeafOp::Gte),
        "<=" | "lte" => Some(LeafOp::Lte),
        "exists" => Some(LeafOp::Exists),
        "missing" => Some(LeafOp::Missing),
        "contains" => Some(LeafOp::Contains),
        _ => None,
    }
}
