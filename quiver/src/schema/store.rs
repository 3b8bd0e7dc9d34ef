//! Process-wide cache of document-type configs
//!
//! Readers clone an `Arc<FieldRegistry>` out of the store and never hold the
//! lock across a request. Writers build the replacement registry first and
//! swap the whole `Arc` in one step, so a reader sees either the previous
//! config or the complete new one.

use super::loader::DocumentTypeLoader;
use super::registry::FieldRegistry;
use super::types::DocumentTypeConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::interval;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentTypeKey {
    pub project: String,
    pub name: String,
}

impl DocumentTypeKey {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DocumentTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    Upserted(DocumentTypeKey),
    Removed(DocumentTypeKey),
}

pub struct ConfigStore {
    entries: RwLock<HashMap<DocumentTypeKey, Arc<FieldRegistry>>>,
    changes: broadcast::Sender<ConfigChange>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn from_configs(configs: Vec<DocumentTypeConfig>) -> Result<Self> {
        let store = Self::new();
        store.replace_all(configs)?;
        Ok(store)
    }

    pub fn get(&self, project: &str, name: &str) -> Result<Arc<FieldRegistry>> {
        let key = DocumentTypeKey::new(project, name);
        self.entries
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::DocumentTypeNotFound(key.to_string()))
    }

    pub fn keys(&self) -> Vec<DocumentTypeKey> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Receive a notification for every swapped or removed document type.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }

    /// Insert or replace one document type.
    pub fn upsert(&self, config: DocumentTypeConfig) -> Result<Arc<FieldRegistry>> {
        let key = DocumentTypeKey::new(&config.project, &config.name);
        let registry = Arc::new(FieldRegistry::new(config)?);
        self.entries.write().insert(key.clone(), registry.clone());

        tracing::info!(document_type = %key, "Swapped document type config");
        crate::metrics::record_config_swaps(1);
        let _ = self.changes.send(ConfigChange::Upserted(key));
        Ok(registry)
    }

    pub fn remove(&self, project: &str, name: &str) -> bool {
        let key = DocumentTypeKey::new(project, name);
        let removed = self.entries.write().remove(&key).is_some();
        if removed {
            tracing::info!(document_type = %key, "Removed document type config");
            let _ = self.changes.send(ConfigChange::Removed(key));
        }
        removed
    }

    /// Replace the full set of document types. Every config is validated
    /// before anything is swapped; on error the store is left untouched.
    /// Returns the number of document types that changed.
    pub fn replace_all(&self, configs: Vec<DocumentTypeConfig>) -> Result<usize> {
        let mut next = HashMap::with_capacity(configs.len());
        for config in configs {
            let key = DocumentTypeKey::new(&config.project, &config.name);
            if next.contains_key(&key) {
                return Err(Error::Config(format!("document type {} defined twice", key)));
            }
            next.insert(key, Arc::new(FieldRegistry::new(config)?));
        }

        let mut changes = Vec::new();
        {
            let mut entries = self.entries.write();
            for key in entries.keys() {
                if !next.contains_key(key) {
                    changes.push(ConfigChange::Removed(key.clone()));
                }
            }
            for (key, registry) in next {
                match entries.get(&key) {
                    Some(current) if current.config() == registry.config() => {}
                    _ => {
                        changes.push(ConfigChange::Upserted(key.clone()));
                        entries.insert(key, registry);
                    }
                }
            }
            for change in &changes {
                if let ConfigChange::Removed(key) = change {
                    entries.remove(key);
                }
            }
        }

        if !changes.is_empty() {
            tracing::info!(changed = changes.len(), "Reloaded document type configs");
            crate::metrics::record_config_swaps(changes.len());
        }
        let changed = changes.len();
        for change in changes {
            let _ = self.changes.send(change);
        }
        Ok(changed)
    }
}

/// Supplies the current set of document-type configs.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<Vec<DocumentTypeConfig>>;
}

/// Reads `<dir>/<project>/*.yaml`.
pub struct DirectoryConfigSource {
    dir: PathBuf,
}

impl DirectoryConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ConfigSource for DirectoryConfigSource {
    async fn load(&self) -> Result<Vec<DocumentTypeConfig>> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || DocumentTypeLoader::new(dir).load_all())
            .await
            .map_err(|e| Error::Config(format!("config loader task failed: {}", e)))?
    }
}

/// Periodically reloads a [`ConfigSource`] into a [`ConfigStore`].
pub struct ConfigPoller {
    store: Arc<ConfigStore>,
    source: Arc<dyn ConfigSource>,
    check_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ConfigPoller {
    pub fn new(
        store: Arc<ConfigStore>,
        source: Arc<dyn ConfigSource>,
        check_interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            store,
            source,
            check_interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Load the source once and swap the result in.
    pub async fn reload(&self) -> Result<usize> {
        let configs = self.source.load().await?;
        self.store.replace_all(configs)
    }

    /// Run until [`ConfigPoller::stop`] is called. Failed reloads keep the
    /// previous configs and are retried on the next tick.
    pub async fn start(&self) {
        tracing::info!(
            "Config poller started (check interval: {:?})",
            self.check_interval
        );

        let mut ticker = interval(self.check_interval);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reload().await {
                        tracing::error!("Config reload failed: {}", e);
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Config poller shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
