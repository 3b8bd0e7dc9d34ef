pub mod aggregations;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod service;
pub mod sqon;

pub use config::Config;
pub use engine::{RawAggregation, RawBucket, RawHit, RawSearchResponse, SearchEngine};
pub use error::{Error, Result};
pub use service::{SearchRequest, SearchResponse, SearchService};
