//! Field type registry
//!
//! Every field lookup made while compiling filters, planning facets, sorting
//! or decoding hits goes through a [`FieldRegistry`]. The registry is built
//! once per [`DocumentTypeConfig`] and is read-only afterwards, so it can be
//! shared between concurrent requests behind an `Arc`.

use super::types::{DocumentTypeConfig, FieldSpec, FieldType};
use crate::{Error, Result};
use std::collections::HashMap;

/// A field resolved against its document type.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField<'a> {
    pub spec: &'a FieldSpec,
    /// Dot path in the source document
    pub es_path: &'a str,
    /// Nested ancestor paths, outermost first; empty when not nested
    pub nested: &'a [String],
}

impl<'a> ResolvedField<'a> {
    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    pub fn field_type(&self) -> FieldType {
        self.spec.field_type
    }

    /// Innermost nested ancestor, which scopes queries and aggregations on this field
    pub fn nested_scope(&self) -> Option<&'a str> {
        self.nested.last().map(String::as_str)
    }
}

#[derive(Debug)]
pub struct FieldRegistry {
    config: DocumentTypeConfig,
    by_name: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
    paths: Vec<String>,
    nested: Vec<Vec<String>>,
}

impl FieldRegistry {
    pub fn new(config: DocumentTypeConfig) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(config.fields.len());
        let mut by_path = HashMap::with_capacity(config.fields.len());
        let mut paths = Vec::with_capacity(config.fields.len());

        for (idx, field) in config.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "document type '{}' has a field with an empty name",
                    config.name
                )));
            }
            if by_name.insert(field.name.clone(), idx).is_some() {
                return Err(Error::Config(format!(
                    "document type '{}' declares field '{}' more than once",
                    config.name, field.name
                )));
            }
            let path = field.path();
            if let Some(prev) = by_path.insert(path.clone(), idx) {
                return Err(Error::Config(format!(
                    "document type '{}': fields '{}' and '{}' share path '{}'",
                    config.name, config.fields[prev].name, field.name, path
                )));
            }
            paths.push(path);
        }

        let nested = paths
            .iter()
            .map(|path| nested_ancestors(path, &config.fields, &by_path))
            .collect();

        Ok(Self {
            config,
            by_name,
            by_path,
            paths,
            nested,
        })
    }

    pub fn config(&self) -> &DocumentTypeConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// Look up a field by its configured name; `at` locates the reference for error reporting.
    pub fn resolve_field(&self, name: &str, at: &str) -> Result<ResolvedField<'_>> {
        self.get(name).ok_or_else(|| Error::unknown_field(name, at))
    }

    pub fn get(&self, name: &str) -> Option<ResolvedField<'_>> {
        self.by_name.get(name).map(|&idx| self.at(idx))
    }

    pub fn get_by_path(&self, es_path: &str) -> Option<ResolvedField<'_>> {
        self.by_path.get(es_path).map(|&idx| self.at(idx))
    }

    pub fn is_nested(&self, field: &ResolvedField<'_>) -> bool {
        !field.nested.is_empty()
    }

    /// Nested ancestor chain of a field, outermost first.
    pub fn nested_path<'a>(&self, field: &ResolvedField<'a>) -> &'a [String] {
        field.nested
    }

    pub fn fields(&self) -> impl Iterator<Item = ResolvedField<'_>> {
        (0..self.config.fields.len()).map(move |idx| self.at(idx))
    }

    fn at(&self, idx: usize) -> ResolvedField<'_> {
        ResolvedField {
            spec: &self.config.fields[idx],
            es_path: &self.paths[idx],
            nested: &self.nested[idx],
        }
    }
}

/// Every strict prefix of `path` that is itself a nested-typed field.
fn nested_ancestors(
    path: &str,
    fields: &[FieldSpec],
    by_path: &HashMap<String, usize>,
) -> Vec<String> {
    path.match_indices('.')
        .map(|(i, _)| &path[..i])
        .filter(|prefix| {
            by_path
                .get(*prefix)
                .is_some_and(|&idx| fields[idx].field_type == FieldType::Nested)
        })
        .map(str::to_string)
        .collect()
}

/// Longest chain shared by every input, outermost first.
pub fn common_nested_prefix<'a, I>(chains: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut iter = chains.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut len = first.len();
    for chain in iter {
        len = first[..len]
            .iter()
            .zip(chain.iter())
            .take_while(|(a, b)| a == b)
            .count();
        if len == 0 {
            break;
        }
    }
    first[..len].to_vec()
}
