//! Elasticsearch engine adapter for Quiver
//!
//! Renders a [`quiver::query::QueryPlan`] into Elasticsearch Query DSL,
//! executes it over HTTP and parses the response back into
//! [`quiver::RawSearchResponse`].
//!
//! # Rendering
//!
//! - filter clauses map onto `bool`, `terms`, `range`, `exists`, `wildcard`
//!   and `nested` queries
//! - when facets are requested the filter becomes a `post_filter` and every
//!   facet runs as its own `filter` aggregation, then `nested` aggregations
//!   down to the field, then `terms`, `filters` (range facets) or `stats`
//! - facets under a nested scope carry a `reverse_nested` sub-aggregation so
//!   buckets report root document counts

pub mod client;
pub mod dsl;
pub mod error;
pub mod render;
pub mod response;

pub use client::EsClient;
pub use error::EsError;
pub use render::{render_clause, render_search};
pub use response::parse_search_response;

/// Result type for Elasticsearch adapter operations
pub type Result<T> = std::result::Result<T, EsError>;
