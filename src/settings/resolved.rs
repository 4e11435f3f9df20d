//! Results of a resolution pass

use conduit_plugin::{ConfigMap, PluginName, SettingDefinition};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

use super::SettingSource;
use crate::utils::value_to_string;
use crate::{ConduitError, ConduitResult};

/// Placeholder shown instead of password values
pub const REDACTED: &str = "(redacted)";

/// The effective value of one setting
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSetting {
    pub definition: SettingDefinition,
    pub value: Option<Value>,
    pub source: SettingSource,
    /// Variable that overrides this setting, and that carries it into the plugin
    pub env_var: String,
}

impl ResolvedSetting {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

/// One row of a display listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingListing {
    pub name: String,
    pub value: Option<String>,
    pub source: SettingSource,
    pub env_var: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Every setting of one plugin profile, declared settings first in schema
/// order followed by undeclared keys
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    plugin: PluginName,
    settings: Vec<ResolvedSetting>,
}

impl ResolvedSettings {
    pub(crate) fn new(plugin: PluginName, settings: Vec<ResolvedSetting>) -> Self {
        Self { plugin, settings }
    }

    /// Qualified name of the plugin profile these settings belong to
    pub fn plugin(&self) -> &PluginName {
        &self.plugin
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedSetting> {
        self.settings.iter().find(|s| s.name() == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(|s| s.value.as_ref())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedSetting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Strict mode: fail on the first required setting without a value
    pub fn require(&self) -> ConduitResult<()> {
        match self
            .settings
            .iter()
            .find(|s| s.definition.required && !s.is_defined())
        {
            Some(missing) => Err(ConduitError::MissingRequiredSetting {
                plugin: self.plugin.to_string(),
                setting: missing.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Defined values whose source has at least the precedence of `lowest`
    pub fn to_config(&self, lowest: SettingSource) -> ConfigMap {
        self.settings
            .iter()
            .filter(|s| s.source.is_at_least(lowest))
            .filter_map(|s| Some((s.name().to_string(), s.value.clone()?)))
            .collect()
    }

    /// Every defined value keyed by its environment variable
    pub fn to_env(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .filter_map(|s| Some((s.env_var.clone(), value_to_string(s.value.as_ref()?))))
            .collect()
    }

    /// Like [`ResolvedSettings::to_config`], for display
    pub fn display_config(&self, lowest: SettingSource) -> ConfigMap {
        self.displayed()
            .filter(|s| s.source.is_at_least(lowest))
            .filter_map(|s| Some((s.name().to_string(), display_value(s)?)))
            .collect()
    }

    /// Like [`ResolvedSettings::to_env`], for display
    pub fn display_env(&self) -> BTreeMap<String, String> {
        self.displayed()
            .filter_map(|s| Some((s.env_var.clone(), value_to_string(&display_value(s)?))))
            .collect()
    }

    /// Display listing: hidden settings are left out, passwords are masked
    pub fn listing(&self) -> Vec<SettingListing> {
        self.displayed()
            .map(|s| SettingListing {
                name: s.name().to_string(),
                value: display_value(s).as_ref().map(value_to_string),
                source: s.source,
                env_var: s.env_var.clone(),
                description: s.definition.description.clone(),
            })
            .collect()
    }
}

impl ResolvedSettings {
    fn displayed(&self) -> impl Iterator<Item = &ResolvedSetting> {
        self.settings
            .iter()
            .filter(|s| !s.definition.kind.is_hidden())
    }
}

fn display_value(setting: &ResolvedSetting) -> Option<Value> {
    let value = setting.value.as_ref()?;
    if setting.definition.kind.is_redacted() {
        Some(Value::String(REDACTED.to_string()))
    } else {
        Some(value.clone())
    }
}

impl<'a> IntoIterator for &'a ResolvedSettings {
    type Item = &'a ResolvedSetting;
    type IntoIter = std::slice::Iter<'a, ResolvedSetting>;

    fn into_iter(self) -> Self::IntoIter {
        self.settings.iter()
    }
}
