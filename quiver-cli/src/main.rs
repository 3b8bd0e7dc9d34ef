use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use quiver::config::{expand_tilde, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "quiver")]
#[command(about = "Quiver CLI - SQON to Elasticsearch query tools")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "QUIVER_CONFIG", default_value = "~/.quiver/config.toml")]
    config: PathBuf,

    /// Log format: pretty or json (overrides config)
    #[arg(long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the Elasticsearch request body for a search request
    Compile(RequestArgs),

    /// Execute a search request and print the decoded response
    Search(RequestArgs),

    /// Validate document-type configs
    Lint {
        /// Projects directory (defaults to projects.dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// JSON search request file; '-' reads stdin
    #[arg(short, long, conflicts_with_all = ["project", "document_type"])]
    pub request: Option<PathBuf>,

    /// Project id
    #[arg(short, long, required_unless_present = "request")]
    pub project: Option<String>,

    /// Document type name
    #[arg(short, long, required_unless_present = "request")]
    pub document_type: Option<String>,

    /// SQON filter as JSON
    #[arg(long)]
    pub sqon: Option<String>,

    /// Fields to return (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Terms facets (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub facets: Vec<String>,

    #[arg(long)]
    pub first: Option<i64>,

    #[arg(long)]
    pub offset: Option<i64>,
}

fn init_tracing(config: &Config, format_override: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.observability.log_level.clone()),
    );
    let format = format_override
        .map(str::to_string)
        .or_else(|| std::env::var("LOG_FORMAT").ok())
        .unwrap_or_else(|| config.observability.log_format.clone());
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_create(&expand_tilde(&cli.config)?)?;
    init_tracing(&config, cli.log_format.as_deref());

    match cli.command {
        Commands::Compile(args) => commands::run_compile(&config, &args),
        Commands::Search(args) => commands::run_search(&config, &args).await,
        Commands::Lint { dir } => {
            let dir = match dir {
                Some(dir) => expand_tilde(&dir)?,
                None => config.projects.dir.clone(),
            };
            commands::run_lint(&dir)
        }
    }
}
