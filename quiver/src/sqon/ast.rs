//! SQON (Set Query Object Notation) filter tree

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Sqon {
    Combinator { op: CombinatorOp, content: Vec<Sqon> },
    Leaf(Leaf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub op: LeafOp,
    /// GraphQL field name, resolved through the field registry at compile time
    pub field: String,
    /// Operator argument, validated at compile time
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOp {
    In,
    NotIn,
    Between,
    Gte,
    Lte,
    Exists,
    Missing,
    Contains,
}

impl CombinatorOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CombinatorOp::And => "and",
            CombinatorOp::Or => "or",
            CombinatorOp::Not => "not",
        }
    }
}

impl LeafOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LeafOp::In => "in",
            LeafOp::NotIn => "not-in",
            LeafOp::Between => "between",
            LeafOp::Gte => ">=",
            LeafOp::Lte => "<=",
            LeafOp::Exists => "exists",
            LeafOp::Missing => "missing",
            LeafOp::Contains => "contains",
        }
    }

    /// Operators that take no value argument
    pub fn is_presence(self) -> bool {
        matches!(self, LeafOp::Exists | LeafOp::Missing)
    }
}

impl fmt::Display for CombinatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LeafOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Sqon {
    pub fn and(content: Vec<Sqon>) -> Sqon {
        Sqon::Combinator {
            op: CombinatorOp::And,
            content,
        }
    }

    pub fn or(content: Vec<Sqon>) -> Sqon {
        Sqon::Combinator {
            op: CombinatorOp::Or,
            content,
        }
    }

    pub fn not(child: Sqon) -> Sqon {
        Sqon::Combinator {
            op: CombinatorOp::Not,
            content: vec![child],
        }
    }

    pub fn leaf(op: LeafOp, field: impl Into<String>, value: Value) -> Sqon {
        Sqon::Leaf(Leaf {
            op,
            field: field.into(),
            value,
        })
    }

    pub fn in_values<I, V>(field: impl Into<String>, values: I) -> Sqon
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Sqon::leaf(
            LeafOp::In,
            field,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn between(field: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Sqon {
        let mut bounds = serde_json::Map::new();
        if let Some(from) = from {
            bounds.insert("from".to_string(), from);
        }
        if let Some(to) = to {
            bounds.insert("to".to_string(), to);
        }
        Sqon::leaf(LeafOp::Between, field, Value::Object(bounds))
    }

    pub fn exists(field: impl Into<String>) -> Sqon {
        Sqon::leaf(LeafOp::Exists, field, Value::Null)
    }

    pub fn missing(field: impl Into<String>) -> Sqon {
        Sqon::leaf(LeafOp::Missing, field, Value::Null)
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Sqon {
        Sqon::leaf(LeafOp::Contains, field, Value::String(text.into()))
    }

    /// Copy of this tree with every leaf on `field` removed.
    ///
    /// A combinator that loses all of its content disappears with it, so a
    /// `not` over an emptied subtree constrains nothing. `None` means the whole
    /// tree was removed.
    pub fn without_field(&self, field: &str) -> Option<Sqon> {
        match self {
            Sqon::Leaf(leaf) if leaf.field == field => None,
            Sqon::Leaf(_) => Some(self.clone()),
            Sqon::Combinator { op, content } => {
                let kept: Vec<Sqon> = content
                    .iter()
                    .filter_map(|child| child.without_field(field))
                    .collect();
                if kept.is_empty() && !content.is_empty() {
                    return None;
                }
                Some(Sqon::Combinator {
                    op: *op,
                    content: kept,
                })
            }
        }
    }

    /// Every field referenced by a leaf, in tree order (may repeat).
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Sqon::Leaf(leaf) => out.push(&leaf.field),
            Sqon::Combinator { content, .. } => {
                for child in content {
                    child.collect_fields(out);
                }
            }
        }
    }

    pub fn references(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}
