//! Engine-agnostic filter algebra
//!
//! The SQON compiler and the aggregation planner only ever produce these
//! clauses. Field references are resolved source paths, never GraphQL names.
//! Engine adapters render them into native query syntax.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    And(Vec<Clause>),
    Or(Vec<Clause>),
    Not(Box<Clause>),
    /// Exact match against any of `values`
    Term { field: String, values: Vec<Value> },
    Range {
        field: String,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    Exists { field: String },
    Wildcard {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Inner clause must hold for a single object of the nested array at `path`
    NestedScope { path: String, clause: Box<Clause> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: Value) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Value) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

impl Clause {
    /// Conjunction; match-all members are dropped and a single member is returned as is.
    pub fn and(clauses: Vec<Clause>) -> Clause {
        let mut clauses: Vec<Clause> = clauses
            .into_iter()
            .filter(|c| !c.is_match_all())
            .collect();
        match clauses.len() {
            0 => Clause::MatchAll,
            1 => clauses.remove(0),
            _ => Clause::And(clauses),
        }
    }

    /// Disjunction; any match-all member makes the whole disjunction match-all.
    pub fn or(mut clauses: Vec<Clause>) -> Clause {
        if clauses.is_empty() || clauses.iter().any(Clause::is_match_all) {
            return Clause::MatchAll;
        }
        if clauses.len() == 1 {
            return clauses.remove(0);
        }
        Clause::Or(clauses)
    }

    pub fn not(clause: Clause) -> Clause {
        Clause::Not(Box::new(clause))
    }

    pub fn nested(path: impl Into<String>, clause: Clause) -> Clause {
        Clause::NestedScope {
            path: path.into(),
            clause: Box::new(clause),
        }
    }

    /// Wrap in one nested scope per chain entry, outermost first.
    pub fn within(self, chain: &[String]) -> Clause {
        chain
            .iter()
            .rev()
            .fold(self, |inner, path| Clause::nested(path.clone(), inner))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Clause::MatchAll)
    }

    /// Number of nested scopes anywhere in the tree.
    pub fn nested_scope_count(&self) -> usize {
        match self {
            Clause::And(cs) | Clause::Or(cs) => cs.iter().map(Clause::nested_scope_count).sum(),
            Clause::Not(c) => c.nested_scope_count(),
            Clause::NestedScope { clause, .. } => 1 + clause.nested_scope_count(),
            _ => 0,
        }
    }
}
