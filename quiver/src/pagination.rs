//! Connection arguments → engine sort and paging
//!
//! Every resolved sort ends on the document type's id field so that paging
//! through equal sort keys is deterministic.

use crate::config::PaginationConfig;
use crate::query::SortSpec;
use crate::schema::{FieldRegistry, FieldType, SortDirection, SortField};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// GraphQL connection arguments. Signed so that negative input can be rejected
/// instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationArgs {
    #[serde(default)]
    pub first: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl PaginationArgs {
    pub fn new(first: i64, offset: i64) -> Self {
        Self {
            first: Some(first),
            offset: Some(offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub sort: Vec<SortSpec>,
    pub from: usize,
    pub size: usize,
}

pub struct PaginationResolver<'a> {
    registry: &'a FieldRegistry,
    config: &'a PaginationConfig,
}

impl<'a> PaginationResolver<'a> {
    pub fn new(registry: &'a FieldRegistry, config: &'a PaginationConfig) -> Self {
        Self { registry, config }
    }

    pub fn resolve(&self, sort: &[SortField], args: &PaginationArgs) -> Result<ResolvedPage> {
        let (from, size) = self.window(args)?;
        Ok(ResolvedPage {
            sort: self.sort(sort)?,
            from,
            size,
        })
    }

    fn sort(&self, requested: &[SortField]) -> Result<Vec<SortSpec>> {
        let config = self.registry.config();
        let fields = if requested.is_empty() {
            config.default_sort.as_slice()
        } else {
            requested
        };
        let id_field = config.id_field.as_str();

        let mut specs = fields
            .iter()
            .enumerate()
            .map(|(i, sort)| {
                // The id field need not be a declared field
                if sort.field == id_field && self.registry.get(id_field).is_none() {
                    return Ok(SortSpec::new(id_field, sort.direction));
                }
                let field = self
                    .registry
                    .resolve_field(&sort.field, &format!("sort[{}]", i))?;
                // Text fields have no doc values to sort on
                if field.field_type().is_container() || field.field_type() == FieldType::Text {
                    return Err(Error::TypeMismatch {
                        op: "sort".to_string(),
                        field: field.name().to_string(),
                        field_type: field.field_type().to_string(),
                        path: format!("sort[{}]", i),
                    });
                }
                Ok(SortSpec {
                    field: field.es_path.to_string(),
                    direction: sort.direction,
                    nested: field.nested.to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tie_breaker = match self.registry.get(id_field) {
            Some(field) => field.es_path.to_string(),
            None => id_field.to_string(),
        };
        if specs.last().map(|s| s.field.as_str()) != Some(tie_breaker.as_str()) {
            specs.push(SortSpec::new(tie_breaker, SortDirection::Asc));
        }
        Ok(specs)
    }

    fn window(&self, args: &PaginationArgs) -> Result<(usize, usize)> {
        let first = args.first.unwrap_or(self.config.default_page_size as i64);
        let offset = args.offset.unwrap_or(0);
        if first < 0 {
            return Err(Error::InvalidPagination(format!(
                "'first' must not be negative, got {}",
                first
            )));
        }
        if offset < 0 {
            return Err(Error::InvalidPagination(format!(
                "'offset' must not be negative, got {}",
                offset
            )));
        }
        let (first, offset) = (first as u64, offset as u64);
        if first > self.config.max_page_size as u64 {
            return Err(Error::InvalidPagination(format!(
                "'first' of {} exceeds the maximum page size of {}",
                first, self.config.max_page_size
            )));
        }
        if offset.saturating_add(first) > self.config.max_result_window as u64 {
            return Err(Error::InvalidPagination(format!(
                "offset {} + first {} exceeds the result window of {}",
                offset, first, self.config.max_result_window
            )));
        }
        Ok((offset as usize, first as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DocumentTypeConfig, FieldSpec};

    fn registry(default_sort: Vec<SortField>) -> FieldRegistry {
        FieldRegistry::new(DocumentTypeConfig {
            name: "cases".to_string(),
            project: "demo".to_string(),
            index: "cases".to_string(),
            fields: vec![
                FieldSpec::new("status", FieldType::Keyword),
                FieldSpec::new("title", FieldType::Text),
                FieldSpec::new("age", FieldType::Long).with_path("demographic.age"),
                FieldSpec::new("donors", FieldType::Nested),
                FieldSpec::new("donors__age", FieldType::Long),
            ],
            default_sort,
            id_field: "_id".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let reg = registry(vec![]);
        let config = PaginationConfig::default();
        let page = PaginationResolver::new(&reg, &config)
            .resolve(&[], &PaginationArgs::default())
            .unwrap();
        assert_eq!(page.from, 0);
        assert_eq!(page.size, 20);
        assert_eq!(page.sort, vec![SortSpec::new("_id", SortDirection::Asc)]);
    }

    #[test]
    fn test_default_sort_then_tie_breaker() {
        let reg = registry(vec![SortField::new("age", SortDirection::Desc)]);
        let config = PaginationConfig::default();
        let page = PaginationResolver::new(&reg, &config)
            .resolve(&[], &PaginationArgs::new(10, 30))
            .unwrap();
        assert_eq!(
            page.sort,
            vec![
                SortSpec::new("demographic.age", SortDirection::Desc),
                SortSpec::new("_id", SortDirection::Asc),
            ]
        );
        assert_eq!((page.from, page.size), (30, 10));
    }

    #[test]
    fn test_explicit_id_sort_is_not_duplicated() {
        let reg = registry(vec![]);
        let config = PaginationConfig::default();
        let page = PaginationResolver::new(&reg, &config)
            .resolve(
                &[SortField::new("status", SortDirection::Asc), SortField::new("_id", SortDirection::Desc)],
                &PaginationArgs::default(),
            )
            .unwrap();
        assert_eq!(page.sort.len(), 2);
        assert_eq!(page.sort[1], SortSpec::new("_id", SortDirection::Desc));
    }

    #[test]
    fn test_nested_sort_carries_path() {
        let reg = registry(vec![]);
        let config = PaginationConfig::default();
        let page = PaginationResolver::new(&reg, &config)
            .resolve(&[SortField::new("donors__age", SortDirection::Asc)], &PaginationArgs::default())
            .unwrap();
        assert_eq!(page.sort[0].nested, vec!["donors".to_string()]);
    }

    #[test]
    fn test_invalid_sort_fields() {
        let reg = registry(vec![]);
        let config = PaginationConfig::default();
        let resolver = PaginationResolver::new(&reg, &config);
        let err = resolver
            .resolve(&[SortField::new("nope", SortDirection::Asc)], &PaginationArgs::default())
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_field");
        assert_eq!(err.path(), Some("sort[0]"));
        let err = resolver
            .resolve(&[SortField::new("donors", SortDirection::Asc)], &PaginationArgs::default())
            .unwrap_err();
        assert_eq!(err.kind(), "type_mismatch");
        let err = resolver
            .resolve(
                &[SortField::new("status", SortDirection::Asc), SortField::new("title", SortDirection::Desc)],
                &PaginationArgs::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "type_mismatch");
        assert_eq!(err.path(), Some("sort[1]"));
    }

    #[test]
    fn test_window_limits() {
        let reg = registry(vec![]);
        let config = PaginationConfig::default();
        let resolver = PaginationResolver::new(&reg, &config);

        let err = resolver
            .resolve(&[], &PaginationArgs { first: Some(5000), offset: None })
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_pagination");
        assert!(resolver.resolve(&[], &PaginationArgs::new(1000, 9000)).is_ok());
        assert!(resolver.resolve(&[], &PaginationArgs::new(1000, 9001)).is_err());
        assert!(resolver.resolve(&[], &PaginationArgs::new(-1, 0)).is_err());
        assert!(resolver.resolve(&[], &PaginationArgs::new(10, -5)).is_err());

        let page = resolver.resolve(&[], &PaginationArgs::new(0, 0)).unwrap();
        assert_eq!(page.size, 0);
    }
}
