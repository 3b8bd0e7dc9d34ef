//! Configuration management for quiver
//!
//! Default config location: ~/.quiver/config.toml

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub aggregations: AggregationConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Search engine connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    /// Default per-request timeout, used when the caller supplies none
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_engine_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            request_timeout_ms: default_request_timeout(),
            username: None,
            password: None,
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompilerConfig {
    /// Maximum SQON nesting depth before compilation is rejected
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    64
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Bucket count for terms facets without an explicit size
    #[serde(default = "default_terms_size")]
    pub default_terms_size: usize,
    /// Upper bound for a per-facet size override
    #[serde(default = "default_max_terms_size")]
    pub max_terms_size: usize,
}

fn default_terms_size() -> usize {
    100
}

fn default_max_terms_size() -> usize {
    1000
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_terms_size: default_terms_size(),
            max_terms_size: default_max_terms_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Mirrors the engine's `index.max_result_window`
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    1000
}

fn default_max_result_window() -> usize {
    10_000
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_result_window: default_max_result_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectsConfig {
    /// Directory holding `<project>/<document-type>.yaml` files
    #[serde(default = "default_projects_dir")]
    pub dir: PathBuf,
    /// Reload interval for the config poller; 0 disables polling
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_projects_dir() -> PathBuf {
    default_data_dir().join("projects")
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            dir: default_projects_dir(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,quiver=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quiver")
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from default location (~/.quiver/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_or_create(&default_data_dir().join("config.toml"))
    }

    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.expand_paths()?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            // Try to save default config
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.projects.dir = expand_tilde(&self.projects.dir)?;
        Ok(())
    }

    /// Reject knob combinations that would make every request fail
    pub fn validate(&self) -> Result<()> {
        let p = &self.pagination;
        if p.max_page_size == 0 {
            return Err(anyhow!("pagination.max_page_size must be > 0"));
        }
        if p.default_page_size > p.max_page_size {
            return Err(anyhow!(
                "pagination.default_page_size ({}) exceeds max_page_size ({})",
                p.default_page_size,
                p.max_page_size
            ));
        }
        if p.max_page_size > p.max_result_window {
            return Err(anyhow!(
                "pagination.max_page_size ({}) exceeds max_result_window ({})",
                p.max_page_size,
                p.max_result_window
            ));
        }
        let a = &self.aggregations;
        if a.default_terms_size == 0 || a.default_terms_size > a.max_terms_size {
            return Err(anyhow!(
                "aggregations.default_terms_size must be between 1 and max_terms_size ({})",
                a.max_terms_size
            ));
        }
        if self.compiler.max_depth == 0 {
            return Err(anyhow!("compiler.max_depth must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.url, "http://127.0.0.1:9200");
        assert_eq!(config.aggregations.default_terms_size, 100);
        assert_eq!(config.pagination.max_page_size, 1000);
        assert_eq!(config.pagination.max_result_window, 10_000);
        assert_eq!(config.compiler.max_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[pagination]
max_page_size = 500

[engine]
url = "http://search:9200"
"#,
        )
        .unwrap();
        assert_eq!(config.pagination.max_page_size, 500);
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.engine.url, "http://search:9200");
        assert_eq!(config.engine.request_timeout_ms, 30000);
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.aggregations.default_terms_size = 25;
        config.projects.dir = temp.path().join("projects");
        config.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.aggregations.default_terms_size, 25);
        assert_eq!(loaded.projects.dir, temp.path().join("projects"));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = Config::default();
        config.pagination.default_page_size = 5000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pagination.max_result_window = 100;
        assert!(config.validate().is_err());
    }
}
