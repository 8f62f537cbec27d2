//! Named configuration datasets loaded along a search path

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::load::{load_file, ConfigError, ConfigFormat, ConfigSource};
use crate::dataset::Dataset;

/// Cache of configuration datasets addressed by name.
///
/// `get("app")` looks for `app.toml`, `app.json` or `app.fiz` in every
/// directory of the search path and chains the files it finds so that
/// earlier directories take precedence. The result is published once as a
/// shared `Arc<Dataset>` and never mutated afterwards; every later `get`
/// returns the same tree until the cache is cleared.
#[derive(Debug, Default)]
pub struct ConfigCache {
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    search_path: Vec<PathBuf>,
    entries: HashMap<String, CachedConfig>,
}

#[derive(Debug)]
struct CachedConfig {
    dataset: Arc<Dataset>,
    sources: Vec<ConfigSource>,
}

impl ConfigCache {
    pub fn new<I, P>(search_path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inner: Mutex::new(CacheInner {
                search_path: search_path.into_iter().map(Into::into).collect(),
                entries: HashMap::new(),
            }),
        }
    }

    /// The dataset for `name`, loading it on first use.
    pub fn get(&self, name: &str) -> Result<Arc<Dataset>, ConfigError> {
        let mut inner = self.inner.lock();
        Ok(Arc::clone(&inner.populate(name)?.dataset))
    }

    /// Files that contributed to `name`, highest precedence first.
    pub fn sources(&self, name: &str) -> Result<Vec<ConfigSource>, ConfigError> {
        let mut inner = self.inner.lock();
        Ok(inner.populate(name)?.sources.clone())
    }

    /// Drop every cached dataset. Trees already handed out stay valid.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        debug!(entries = inner.entries.len(), "configuration cache cleared");
        inner.entries.clear();
    }

    /// Number of cached names
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn search_path(&self) -> Vec<PathBuf> {
        self.inner.lock().search_path.clone()
    }

    /// Replace the search path and clear the cache.
    pub fn set_search_path<I, P>(&self, search_path: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut inner = self.inner.lock();
        inner.search_path = search_path.into_iter().map(Into::into).collect();
        inner.entries.clear();
        debug!(dirs = inner.search_path.len(), "configuration search path replaced");
    }
}

impl CacheInner {
    fn populate(&mut self, name: &str) -> Result<&CachedConfig, ConfigError> {
        if !self.entries.contains_key(name) {
            let loaded = load_chain(&self.search_path, name)?;
            self.entries.insert(name.to_string(), loaded);
        } else {
            debug!(name, "configuration cache hit");
        }
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))
    }
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || Path::new(name).is_absolute();
    if bad {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// First file for `name` in `dir`, probing formats in order.
fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    ConfigFormat::ALL
        .into_iter()
        .map(|format| dir.join(format!("{}.{}", name, format.extension())))
        .find(|candidate| candidate.is_file())
}

fn load_chain(search_path: &[PathBuf], name: &str) -> Result<CachedConfig, ConfigError> {
    validate_name(name)?;

    let mut layers = Vec::new();
    let mut sources = Vec::new();
    for dir in search_path {
        if let Some(path) = find_in_dir(dir, name) {
            let (dataset, source) = load_file(&path)?;
            layers.push(dataset);
            sources.push(source);
        }
    }
    if layers.is_empty() {
        return Err(ConfigError::NotFound(name.to_string()));
    }
    debug!(name, layers = layers.len(), "configuration loaded");

    // Link from the lowest-precedence layer upwards
    let mut next: Option<Arc<Dataset>> = None;
    for mut layer in layers.into_iter().rev() {
        if let Some(fallback) = next.take() {
            layer.set_chain(fallback);
        }
        next = Some(Arc::new(layer));
    }
    let dataset = next.ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
    Ok(CachedConfig { dataset, sources })
}
