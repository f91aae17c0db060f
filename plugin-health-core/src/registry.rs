//! In-memory plugin store with whole-record swaps.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::plugin::Plugin;

/// Thread-safe store of plugin records.
///
/// Readers get an `Arc` snapshot; a pass works on its own copy and
/// [`PluginRegistry::commit`] swaps the whole record in, so a reader never
/// observes a half-updated result map.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, Arc<Plugin>>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the given plugins.
    pub fn from_plugins(plugins: impl IntoIterator<Item = Plugin>) -> Self {
        let plugins = plugins
            .into_iter()
            .map(|plugin| (plugin.name.clone(), Arc::new(plugin)))
            .collect();
        Self {
            plugins: RwLock::new(plugins),
        }
    }

    /// Load a registry from a JSON state file; a missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)?;
        let plugins: Vec<Plugin> = serde_json::from_str(&contents)?;
        Ok(Self::from_plugins(plugins))
    }

    /// Write the registry to a JSON state file, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let plugins: Vec<&Plugin> = snapshot.iter().map(Arc::as_ref).collect();
        let contents = serde_json::to_string_pretty(&plugins)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }

    /// Latest committed record for a plugin.
    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sorted plugin names.
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// All committed records, sorted by name.
    pub fn snapshot(&self) -> Vec<Arc<Plugin>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry holds no plugin.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the stored record of a plugin with a new one.
    pub fn commit(&self, plugin: Plugin) {
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plugin.name.clone(), Arc::new(plugin));
    }

    /// Add catalog plugins that are unknown and refresh release metadata of known ones.
    ///
    /// Returns the number of records that changed.
    pub fn sync_catalog(&self, catalog: &Catalog) -> usize {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = 0;
        for entry in catalog.plugins.values() {
            let current = plugins.get(&entry.name);
            let mut next = current
                .map(|plugin| plugin.as_ref().clone())
                .unwrap_or_else(|| Plugin::new(entry.name.clone()));
            next.version = entry.version.clone().or(next.version);
            next.scm = entry.scm.clone().or(next.scm);
            next.release_timestamp = entry.release_timestamp.or(next.release_timestamp);
            if current.map(|plugin| plugin.as_ref() != &next).unwrap_or(true) {
                plugins.insert(entry.name.clone(), Arc::new(next));
                changed += 1;
            }
        }
        changed
    }
}
