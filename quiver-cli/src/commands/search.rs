use crate::RequestArgs;
use anyhow::{Context, Result};
use quiver::aggregations::AggregationSpec;
use quiver::pagination::PaginationArgs;
use quiver::schema::{ConfigStore, DocumentTypeLoader};
use quiver::{Config, SearchRequest, SearchService};
use quiver_es::{render_search, EsClient};
use std::io::Read;
use std::sync::Arc;

/// Build a search request from a request file or from individual flags.
pub fn build_request(args: &RequestArgs) -> Result<SearchRequest> {
    if let Some(path) = &args.request {
        let content = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file {:?}", path))?
        };
        return serde_json::from_str(&content).context("Invalid search request JSON");
    }

    let mut request = SearchRequest::new(
        args.project.clone().unwrap_or_default(),
        args.document_type.clone().unwrap_or_default(),
    );
    if let Some(sqon) = &args.sqon {
        request.sqon = Some(serde_json::from_str(sqon).context("Invalid SQON JSON")?);
    }
    request.fields = args.fields.clone();
    request.facets = args.facets.iter().map(AggregationSpec::terms).collect();
    request.pagination = PaginationArgs {
        first: args.first,
        offset: args.offset,
    };
    Ok(request)
}

fn service(config: &Config) -> Result<SearchService> {
    let configs = DocumentTypeLoader::new(&config.projects.dir)
        .load_all()
        .with_context(|| format!("Failed to load document types from {:?}", config.projects.dir))?;
    let store = ConfigStore::from_configs(configs)?;
    tracing::info!(document_types = store.len(), "Loaded document type configs");

    let engine = EsClient::new(&config.engine)?;
    Ok(SearchService::new(
        Arc::new(store),
        Arc::new(engine),
        Arc::new(config.clone()),
    ))
}

pub fn run_compile(config: &Config, args: &RequestArgs) -> Result<()> {
    let request = build_request(args)?;
    let plan = service(config)?.plan(&request)?;
    println!(
        "POST /{}/_search\n{}",
        plan.index,
        serde_json::to_string_pretty(&render_search(&plan))?
    );
    Ok(())
}

pub async fn run_search(config: &Config, args: &RequestArgs) -> Result<()> {
    let request = build_request(args)?;
    let response = service(config)?.search(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
