use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Searchable view over one index, as configured for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeConfig {
    /// GraphQL-facing name of the document type
    pub name: String,
    /// Owning project id; filled from the directory name when loaded from disk
    #[serde(default)]
    pub project: String,
    /// Engine index (or alias) queried for this document type
    pub index: String,
    pub fields: Vec<FieldSpec>,

    /// Sort applied when a request carries none
    #[serde(default, alias = "defaultSort")]
    pub default_sort: Vec<SortField>,

    /// Stable per-document identifier used as the pagination tie-breaker
    #[serde(default = "default_id_field", alias = "idField")]
    pub id_field: String,
}

fn default_id_field() -> String {
    "_id".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(alias = "fieldName")]
    pub name: String,

    /// Dot path inside the source document. Defaults to `name` with `__` read as `.`
    #[serde(default, alias = "esPath", skip_serializing_if = "Option::is_none")]
    pub es_path: Option<String>,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Raw value (string form) to display label
    #[serde(
        default,
        alias = "displayValues",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_values: Option<HashMap<String, String>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            es_path: None,
            field_type,
            display_values: None,
        }
    }

    pub fn with_path(mut self, es_path: impl Into<String>) -> Self {
        self.es_path = Some(es_path.into());
        self
    }

    pub fn with_display_values<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.display_values = Some(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Resolved dot path of this field in the source document.
    pub fn path(&self) -> String {
        match &self.es_path {
            Some(p) => p.clone(),
            None => self.name.replace("__", "."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Keyword,
    Text,
    Long,
    Integer,
    Double,
    Float,
    Date,
    Boolean,
    Nested,
    Object,
}

impl FieldType {
    pub fn is_string(self) -> bool {
        matches!(self, FieldType::Keyword | FieldType::Text)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Long | FieldType::Integer | FieldType::Double | FieldType::Float
        )
    }

    /// Types with a total order the engine can range over
    pub fn is_rangeable(self) -> bool {
        self.is_numeric() || self.is_string() || self == FieldType::Date
    }

    /// Containers hold sub-fields and carry no value of their own
    pub fn is_container(self) -> bool {
        matches!(self, FieldType::Nested | FieldType::Object)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Nested => "nested",
            FieldType::Object => "object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort argument expressed in GraphQL field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    #[serde(alias = "fieldName")]
    pub field: String,
    #[serde(default, alias = "order")]
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}
