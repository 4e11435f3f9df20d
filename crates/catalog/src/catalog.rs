//! Catalog loading, lookup and merging

use conduit_plugin::PluginType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::{CatalogError, CatalogResult, PluginDefinition};

/// Catalog compiled into the binary
pub const BUNDLED_CATALOG: &str = include_str!("../discovery.yml");

/// Highest catalog format version understood by this build
const SUPPORTED_VERSION: u32 = 1;

/// Immutable, versioned set of plugin definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog format version
    pub version: u32,

    /// Definitions grouped by plugin type
    #[serde(default)]
    plugins: BTreeMap<PluginType, Vec<PluginDefinition>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            plugins: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Parse a catalog document
    pub fn from_yaml_str(content: &str) -> CatalogResult<Self> {
        let mut catalog: Catalog = serde_yaml::from_str(content)?;
        if catalog.version > SUPPORTED_VERSION {
            return Err(CatalogError::UnsupportedVersion(catalog.version));
        }

        for (plugin_type, definitions) in catalog.plugins.iter_mut() {
            for definition in definitions.iter_mut() {
                definition.plugin_type = *plugin_type;
            }
        }

        Ok(catalog)
    }

    /// Load a catalog document from disk
    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// The catalog bundled with this build
    pub fn bundled() -> CatalogResult<Self> {
        Self::from_yaml_str(BUNDLED_CATALOG)
    }

    /// Find a definition by type and name
    pub fn lookup(&self, plugin_type: PluginType, name: &str) -> CatalogResult<&PluginDefinition> {
        self.definitions(plugin_type)
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CatalogError::NotFound {
                plugin_type,
                name: name.to_string(),
            })
    }

    /// Find a definition by type and namespace
    pub fn find_by_namespace(
        &self,
        plugin_type: PluginType,
        namespace: &str,
    ) -> CatalogResult<&PluginDefinition> {
        self.definitions(plugin_type)
            .iter()
            .find(|d| d.namespace == namespace)
            .ok_or_else(|| CatalogError::NamespaceNotFound {
                plugin_type,
                namespace: namespace.to_string(),
            })
    }

    /// Definitions of one type, in declaration order
    pub fn definitions(&self, plugin_type: PluginType) -> &[PluginDefinition] {
        self.plugins
            .get(&plugin_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All definitions, type by type
    pub fn iter(&self) -> impl Iterator<Item = &PluginDefinition> {
        self.plugins.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.plugins.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Layer `additions` over this catalog
    ///
    /// A definition with the same type and name replaces the existing one in
    /// place; new definitions are appended to their type.
    pub fn merge(&mut self, additions: Catalog) {
        self.version = self.version.max(additions.version);

        for (plugin_type, definitions) in additions.plugins {
            let bucket = self.plugins.entry(plugin_type).or_default();
            for definition in definitions {
                match bucket.iter_mut().find(|d| d.name == definition.name) {
                    Some(existing) => {
                        debug!("Catalog override for {}", definition.plugin_ref());
                        *existing = definition;
                    }
                    None => bucket.push(definition),
                }
            }
        }
    }

    /// SHA-256 of the catalog content, identifying this catalog version
    pub fn fingerprint(&self) -> String {
        let content = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}
