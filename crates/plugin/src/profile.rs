//! Named configuration variants of an installed plugin

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::{PluginError, PluginResult, DEFAULT_PROFILE, PROFILE_SEPARATOR};

/// Setting values keyed by setting name
pub type ConfigMap = BTreeMap<String, Value>;

/// A named configuration variant
///
/// The default profile is implicit: it is never stored, and its values live
/// in the plugin's base `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Profile-level setting overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            config: ConfigMap::new(),
        }
    }

    /// The implicit default profile
    pub fn default_profile() -> Self {
        Self {
            name: DEFAULT_PROFILE.to_string(),
            label: Some("Default".to_string()),
            config: ConfigMap::new(),
        }
    }

    /// Check that `name` can be addressed as `plugin@name`
    pub fn validate_name(name: &str) -> PluginResult<()> {
        let invalid = |reason: &str| PluginError::InvalidName {
            input: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("profile name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed"));
        }
        if name.contains(PROFILE_SEPARATOR) {
            return Err(invalid("profile name contains the profile separator"));
        }
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PROFILE
    }

    /// Add a setting override
    pub fn with_setting(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config.insert(name.into(), value);
        self
    }
}
