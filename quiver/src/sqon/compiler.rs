//! SQON → [`Clause`] compiler
//!
//! Compilation is recursive descent with deferred nested scoping. Each
//! compiled subtree reports the nested chain it lives entirely within
//! instead of wrapping itself. A combinator groups its children by the
//! longest common nested ancestor and only emits `NestedScope` where
//! children diverge, so sibling leaves on the same nested object end up in
//! one scope and keep "same object" semantics. Negations (`not`, `missing`,
//! `not-in`) close the scope of their operand before negating it.

use super::ast::{CombinatorOp, Leaf, LeafOp, Sqon};
use super::parser::ROOT_PATH;
use crate::query::{Bound, Clause};
use crate::schema::{common_nested_prefix, FieldRegistry, FieldType, ResolvedField};
use crate::{Error, Result};
use serde_json::Value;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Compile with the default depth limit.
pub fn compile(sqon: &Sqon, registry: &FieldRegistry) -> Result<Clause> {
    SqonCompiler::new(registry).compile(sqon)
}

pub struct SqonCompiler<'a> {
    registry: &'a FieldRegistry,
    max_depth: usize,
}

/// A compiled subtree that still has to be wrapped in `chain`.
struct Scoped {
    chain: Vec<String>,
    clause: Clause,
}

impl Scoped {
    fn unscoped(clause: Clause) -> Self {
        Self {
            chain: Vec::new(),
            clause,
        }
    }

    fn materialize(self) -> Clause {
        self.clause.within(&self.chain)
    }
}

impl<'a> SqonCompiler<'a> {
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn compile(&self, sqon: &Sqon) -> Result<Clause> {
        Ok(self.compile_node(sqon, ROOT_PATH, 1)?.materialize())
    }

    /// Compile an optional filter; no filter matches everything.
    pub fn compile_opt(&self, sqon: Option<&Sqon>) -> Result<Clause> {
        match sqon {
            Some(sqon) => self.compile(sqon),
            None => Ok(Clause::MatchAll),
        }
    }

    fn compile_node(&self, sqon: &Sqon, path: &str, depth: usize) -> Result<Scoped> {
        if depth > self.max_depth {
            return Err(Error::invalid_sqon(
                format!("nesting exceeds maximum depth of {}", self.max_depth),
                path,
            ));
        }
        match sqon {
            Sqon::Combinator { op, content } => self.compile_combinator(*op, content, path, depth),
            Sqon::Leaf(leaf) => self.compile_leaf(leaf, path),
        }
    }

    fn compile_combinator(
        &self,
        op: CombinatorOp,
        content: &[Sqon],
        path: &str,
        depth: usize,
    ) -> Result<Scoped> {
        let children = content
            .iter()
            .enumerate()
            .map(|(i, child)| {
                self.compile_node(child, &format!("{}.content[{}]", path, i), depth + 1)
            })
            .collect::<Result<Vec<_>>>()?;

        if op == CombinatorOp::Not {
            if children.len() != 1 {
                return Err(Error::invalid_sqon(
                    format!("'not' takes exactly one operand, got {}", children.len()),
                    path,
                ));
            }
            let operand = children
                .into_iter()
                .next()
                .map(Scoped::materialize)
                .unwrap_or(Clause::MatchAll);
            return Ok(Scoped::unscoped(Clause::not(operand)));
        }

        if children.is_empty() {
            return Ok(Scoped::unscoped(Clause::MatchAll));
        }

        let common = common_nested_prefix(children.iter().map(|c| c.chain.as_slice()));
        let clause = group_by_scope(op, children, common.len());
        Ok(Scoped {
            chain: common,
            clause,
        })
    }

    fn compile_leaf(&self, leaf: &Leaf, path: &str) -> Result<Scoped> {
        let field = self.registry.resolve_field(&leaf.field, path)?;
        let es_path = field.es_path.to_string();
        let chain = field.nested.to_vec();

        let scoped = |clause: Clause| Scoped {
            chain: chain.clone(),
            clause,
        };

        match leaf.op {
            LeafOp::In | LeafOp::NotIn => {
                require_value_field(leaf, &field, path)?;
                let values = in_values(leaf, &field, path)?;
                let term = Clause::Term {
                    field: es_path,
                    values,
                };
                if leaf.op == LeafOp::In {
                    Ok(scoped(term))
                } else {
                    Ok(Scoped::unscoped(Clause::not(scoped(term).materialize())))
                }
            }
            LeafOp::Between => {
                require_rangeable(leaf, &field, path)?;
                let (from, to) = between_bounds(leaf, &field, path)?;
                Ok(scoped(Clause::Range {
                    field: es_path,
                    lower: from.map(Bound::inclusive),
                    upper: to.map(Bound::inclusive),
                }))
            }
            LeafOp::Gte | LeafOp::Lte => {
                require_rangeable(leaf, &field, path)?;
                let bound = Bound::inclusive(check_scalar(&leaf.value, &field, path)?);
                let (lower, upper) = if leaf.op == LeafOp::Gte {
                    (Some(bound), None)
                } else {
                    (None, Some(bound))
                };
                Ok(scoped(Clause::Range {
                    field: es_path,
                    lower,
                    upper,
                }))
            }
            LeafOp::Exists | LeafOp::Missing => {
                // Presence of a nested object means "at least one element"
                let present = if field.field_type() == FieldType::Nested {
                    let mut chain = chain.clone();
                    chain.push(es_path);
                    Scoped {
                        chain,
                        clause: Clause::MatchAll,
                    }
                } else {
                    scoped(Clause::Exists { field: es_path })
                };
                if leaf.op == LeafOp::Exists {
                    Ok(present)
                } else {
                    Ok(Scoped::unscoped(Clause::not(present.materialize())))
                }
            }
            LeafOp::Contains => {
                if !field.field_type().is_string() {
                    return Err(type_mismatch(leaf, &field, path));
                }
                let text = leaf.value.as_str().ok_or_else(|| {
                    Error::invalid_sqon("'contains' value must be a string", path)
                })?;
                Ok(scoped(Clause::Wildcard {
                    field: es_path,
                    pattern: format!("*{}*", escape_wildcard(text)),
                    case_insensitive: true,
                }))
            }
        }
    }
}

/// Combine siblings, opening one nested scope per distinct ancestor at `depth`.
fn group_by_scope(op: CombinatorOp, items: Vec<Scoped>, depth: usize) -> Clause {
    enum Slot {
        Direct(Clause),
        Group(String, Vec<Scoped>),
    }

    let mut slots: Vec<Slot> = Vec::new();
    for item in items {
        if item.chain.len() <= depth {
            slots.push(Slot::Direct(item.clause));
            continue;
        }
        let key = item.chain[depth].clone();
        let existing = slots.iter_mut().find_map(|slot| match slot {
            Slot::Group(k, members) if *k == key => Some(members),
            _ => None,
        });
        match existing {
            Some(members) => members.push(item),
            None => slots.push(Slot::Group(key, vec![item])),
        }
    }

    let clauses = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Direct(clause) => clause,
            Slot::Group(path, members) => {
                Clause::nested(path, group_by_scope(op, members, depth + 1))
            }
        })
        .collect();

    match op {
        CombinatorOp::Or => Clause::or(clauses),
        _ => Clause::and(clauses),
    }
}

fn type_mismatch(leaf: &Leaf, field: &ResolvedField<'_>, path: &str) -> Error {
    Error::TypeMismatch {
        op: leaf.op.to_string(),
        field: field.name().to_string(),
        field_type: field.field_type().to_string(),
        path: path.to_string(),
    }
}

fn require_value_field(leaf: &Leaf, field: &ResolvedField<'_>, path: &str) -> Result<()> {
    if field.field_type().is_container() {
        return Err(type_mismatch(leaf, field, path));
    }
    Ok(())
}

fn require_rangeable(leaf: &Leaf, field: &ResolvedField<'_>, path: &str) -> Result<()> {
    if !field.field_type().is_rangeable() {
        return Err(type_mismatch(leaf, field, path));
    }
    Ok(())
}

fn in_values(leaf: &Leaf, field: &ResolvedField<'_>, path: &str) -> Result<Vec<Value>> {
    let values = match &leaf.value {
        Value::Array(items) => items.clone(),
        scalar => vec![scalar.clone()],
    };
    if values.is_empty() {
        return Err(Error::invalid_sqon(
            format!("'{}' requires at least one value", leaf.op),
            path,
        ));
    }
    values
        .into_iter()
        .map(|v| check_scalar(&v, field, path))
        .collect()
}

fn between_bounds(
    leaf: &Leaf,
    field: &ResolvedField<'_>,
    path: &str,
) -> Result<(Option<Value>, Option<Value>)> {
    let (from, to) = match &leaf.value {
        Value::Object(bounds) => (
            bounds.get("from").filter(|v| !v.is_null()).cloned(),
            bounds.get("to").filter(|v| !v.is_null()).cloned(),
        ),
        Value::Array(pair) if pair.len() == 2 => (
            Some(pair[0].clone()).filter(|v| !v.is_null()),
            Some(pair[1].clone()).filter(|v| !v.is_null()),
        ),
        _ => {
            return Err(Error::invalid_sqon(
                "'between' value must be {from, to} or a two-element array",
                path,
            ))
        }
    };
    if from.is_none() && to.is_none() {
        return Err(Error::invalid_sqon(
            "'between' needs at least one of 'from' and 'to'",
            path,
        ));
    }
    let from = from.map(|v| check_scalar(&v, field, path)).transpose()?;
    let to = to.map(|v| check_scalar(&v, field, path)).transpose()?;
    Ok((from, to))
}

/// Reject values the field's type can never hold. Values are passed through
/// unchanged; numeric and boolean fields also accept their string forms.
fn check_scalar(value: &Value, field: &ResolvedField<'_>, path: &str) -> Result<Value> {
    let ok = match (field.field_type(), value) {
        (_, Value::Null | Value::Array(_) | Value::Object(_)) => false,
        (t, Value::Number(_)) if t.is_numeric() || t == FieldType::Date => true,
        (t, Value::String(s)) if t.is_numeric() => s.trim().parse::<f64>().is_ok(),
        (FieldType::Boolean, Value::Bool(_)) => true,
        (FieldType::Boolean, Value::String(s)) => s == "true" || s == "false",
        (FieldType::Date, Value::String(_)) => true,
        (t, Value::String(_)) if t.is_string() => true,
        (t, Value::Number(_) | Value::Bool(_)) if t.is_string() => true,
        _ => false,
    };
    if ok {
        Ok(value.clone())
    } else {
        Err(Error::invalid_sqon(
            format!(
                "value {} is not a valid {} for field '{}'",
                value,
                field.field_type(),
                field.name()
            ),
            path,
        ))
    }
}

fn escape_wildcard(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
