//! Plugin data model for conduit
//!
//! Types shared by the catalog, the project registry and the settings
//! resolver: plugin identity, the `name@profile` reference syntax, setting
//! schemas and installed plugin records.

pub mod install;
pub mod name;
pub mod profile;
pub mod setting;
pub mod types;

pub use install::{PluginBuckets, PluginInstall};
pub use name::{PluginName, PluginRef, DEFAULT_PROFILE, PROFILE_SEPARATOR};
pub use profile::{ConfigMap, Profile};
pub use setting::{env_var_name, SettingDefinition, SettingKind, SettingOption};
pub use types::{ConfigFormat, PluginType, TransformMode};

/// Errors raised by the plugin data model
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("Invalid plugin name '{input}': {reason}")]
    InvalidName { input: String, reason: String },

    #[error("Unknown plugin type: {0}")]
    UnknownPluginType(String),

    #[error("Unknown transform mode: {0} (expected run, skip or only)")]
    UnknownTransformMode(String),

    #[error("Unknown config format: {0} (expected json, yaml or env)")]
    UnknownConfigFormat(String),

    #[error("Invalid value for setting '{setting}': {reason}")]
    InvalidValue { setting: String, reason: String },

    #[error("Profile '{profile}' does not exist for plugin '{plugin}'")]
    ProfileNotFound { plugin: String, profile: String },

    #[error("Profile '{profile}' already exists for plugin '{plugin}'")]
    DuplicateProfile { plugin: String, profile: String },
}

/// Result type for the plugin data model
pub type PluginResult<T> = Result<T, PluginError>;
