//! End-to-end search tests: SQON + facets + paging through the service
//! against the in-memory engine.

mod common;

use common::{cases_config, MemoryEngine};
use quiver::aggregations::{AggregationSpec, FacetBucket, FacetResult};
use quiver::pagination::PaginationArgs;
use quiver::query::Clause;
use quiver::schema::{
    ConfigPoller, ConfigStore, DirectoryConfigSource, DocumentTypeConfig, FieldSpec, FieldType,
    SortDirection, SortField,
};
use quiver::{Config, SearchRequest, SearchService};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn documents() -> Vec<(&'static str, Value)> {
    vec![
        ("c1", json!({"status": "open", "age": 12, "title": "Pediatric Glioma", "donors": [{"gender": "female", "age": 12}]})),
        ("c2", json!({"status": "closed", "age": 40, "title": "Adult glioma", "donors": [{"gender": "male", "age": 40}, {"gender": "female", "age": 38}]})),
        ("c3", json!({"status": "open", "age": 65, "title": "Late onset", "donors": [{"gender": "male", "age": 65}]})),
        ("c4", json!({"status": "pending", "age": 18, "title": "Young adult"})),
    ]
}

fn service(engine: Arc<MemoryEngine>) -> SearchService {
    let store = ConfigStore::from_configs(vec![cases_config()]).unwrap();
    SearchService::new(Arc::new(store), engine, Arc::new(Config::default()))
}

fn buckets(result: &FacetResult) -> Vec<(String, u64)> {
    result
        .buckets()
        .unwrap()
        .iter()
        .map(|FacetBucket { key, doc_count }| (key.clone(), *doc_count))
        .collect()
}

#[tokio::test]
async fn test_status_filter_first_page() {
    let store = ConfigStore::from_configs(vec![DocumentTypeConfig {
        name: "models".to_string(),
        project: "demo".to_string(),
        index: "models".to_string(),
        fields: vec![
            FieldSpec::new("status", FieldType::Keyword),
            FieldSpec::new("age", FieldType::Long),
        ],
        default_sort: vec![],
        id_field: "_id".to_string(),
    }])
    .unwrap();
    let engine = Arc::new(MemoryEngine::new().with_docs(
        "models",
        vec![
            ("m2", json!({"status": "open", "age": 3})),
            ("m1", json!({"status": "open", "age": 9})),
            ("m3", json!({"status": "closed", "age": 5})),
        ],
    ));
    let service = SearchService::new(Arc::new(store), engine.clone(), Arc::new(Config::default()));

    let mut request = SearchRequest::new("demo", "models");
    request.sqon = Some(json!({"op": "and", "content": [{"op": "in", "content": {"field": "status", "value": ["open"]}}]}));
    request.pagination = PaginationArgs::new(10, 0);
    request.fields = vec!["status".to_string(), "age".to_string()];

    let plan = service.plan(&request).unwrap();
    assert_eq!(
        plan.filter,
        Clause::Term {
            field: "status".to_string(),
            values: vec![json!("open")],
        }
    );
    assert_eq!((plan.size, plan.from), (10, 0));

    let response = service.search(&request).await.unwrap();
    assert_eq!(response.total, 2);
    assert_eq!(response.data.len(), 2);
    // Engine order: id tie-breaker ascending
    assert_eq!(response.data[0].id, "m1");
    assert_eq!(response.data[1].id, "m2");
    assert_eq!(response.data[0].fields["age"], json!(9));
}

#[tokio::test]
async fn test_facets_exclude_their_own_selection() {
    let engine = Arc::new(MemoryEngine::new().with_docs("cases", documents()));
    let service = service(engine);

    let mut request = SearchRequest::new("demo", "cases");
    request.sqon = Some(json!({"op": "and", "content": [
        {"op": "in", "fieldName": "status", "value": ["open"]},
        {"op": ">=", "fieldName": "age", "value": 18}
    ]}));
    request.fields = vec!["status".to_string()];
    request.facets = vec![AggregationSpec::terms("status"), AggregationSpec::stats("age")];

    let response = service.search(&request).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.data[0].id, "c3");
    assert_eq!(response.data[0].fields["status"], json!("Open"));

    // status facet sees age >= 18 only: c2, c3, c4
    assert_eq!(
        buckets(&response.aggregations["status"]),
        vec![
            ("closed".to_string(), 1),
            ("open".to_string(), 1),
            ("pending".to_string(), 1)
        ]
    );
    // age facet sees status = open only: c1, c3
    match &response.aggregations["age"] {
        FacetResult::Stats(stats) => {
            assert_eq!(stats.count, 2);
            assert_eq!(stats.min, Some(12.0));
            assert_eq!(stats.max, Some(65.0));
        }
        other => panic!("Expected stats, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sort_and_offset() {
    let engine = Arc::new(MemoryEngine::new().with_docs("cases", documents()));
    let service = service(engine);

    let mut request = SearchRequest::new("demo", "cases");
    request.sort = vec![SortField::new("age", SortDirection::Desc)];
    request.pagination = PaginationArgs::new(2, 1);

    let response = service.search(&request).await.unwrap();
    assert_eq!(response.total, 4);
    let ids: Vec<&str> = response.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "c4"]);
}

#[tokio::test]
async fn test_zero_page_size_returns_only_aggregations() {
    let engine = Arc::new(MemoryEngine::new().with_docs("cases", documents()));
    let service = service(engine);

    let mut request = SearchRequest::new("demo", "cases");
    request.pagination = PaginationArgs::new(0, 0);
    request.facets = vec![AggregationSpec::terms("status")];

    let response = service.search(&request).await.unwrap();
    assert_eq!(response.total, 4);
    assert!(response.data.is_empty());
    assert_eq!(
        buckets(&response.aggregations["status"])[0],
        ("open".to_string(), 2)
    );
}

#[tokio::test]
async fn test_invalid_pagination_is_rejected_before_engine() {
    let engine = Arc::new(MemoryEngine::new().with_docs("cases", documents()));
    let service = service(engine.clone());

    let mut request = SearchRequest::new("demo", "cases");
    request.pagination = PaginationArgs {
        first: Some(5000),
        offset: None,
    };
    let err = service.search(&request).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_pagination");
    assert!(engine.executed.lock().is_empty());
}

#[tokio::test]
async fn test_configs_loaded_from_directory() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project_dir = temp.path().join("demo");
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(
        project_dir.join("cases.yaml"),
        r#"
name: cases
index: cases
fields:
  - fieldName: status
    type: keyword
  - fieldName: age
    type: long
"#,
    )
    .unwrap();

    let store = Arc::new(ConfigStore::new());
    let poller = ConfigPoller::new(
        store.clone(),
        Arc::new(DirectoryConfigSource::new(temp.path())),
        Duration::from_secs(60),
    );
    assert_eq!(poller.reload().await.unwrap(), 1);

    let engine = Arc::new(MemoryEngine::new().with_docs("cases", documents()));
    let service = SearchService::new(store, engine, Arc::new(Config::default()));
    let mut request = SearchRequest::new("demo", "cases");
    request.sqon = Some(json!({"op": "in", "fieldName": "status", "value": "pending"}));
    let response = service.search(&request).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.data[0].id, "c4");
}
