//! Discovery catalog of known plugin definitions
//!
//! The catalog is immutable once loaded: the bundled `discovery.yml` is
//! parsed first, then project-level additions are merged on top of it.

pub mod catalog;
pub mod definition;

pub use catalog::{Catalog, BUNDLED_CATALOG};
pub use definition::PluginDefinition;

use conduit_plugin::PluginType;

/// Catalog errors
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("No {} named '{name}' in the catalog", .plugin_type.descriptor())]
    NotFound {
        plugin_type: PluginType,
        name: String,
    },

    #[error("No {} with namespace '{namespace}' in the catalog", .plugin_type.descriptor())]
    NamespaceNotFound {
        plugin_type: PluginType,
        namespace: String,
    },

    #[error("Unsupported catalog version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
