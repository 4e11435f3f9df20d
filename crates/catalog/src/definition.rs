//! Plugin definitions as declared in a catalog

use conduit_plugin::{ConfigFormat, PluginInstall, PluginRef, PluginType, SettingDefinition};
use serde::{Deserialize, Serialize};

/// A known plugin, independent of any project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinition {
    /// Assigned from the owning bucket on load
    #[serde(skip)]
    pub plugin_type: PluginType,

    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_format: Option<ConfigFormat>,
}

impl PluginDefinition {
    pub fn plugin_ref(&self) -> PluginRef {
        PluginRef::new(self.plugin_type, self.name.clone())
    }

    /// Bind this definition into a project record, seeding its settings
    /// schema and capabilities
    pub fn to_install(&self) -> PluginInstall {
        let mut install = PluginInstall::new(self.plugin_type, &self.name, &self.namespace);
        install.pip_url = self.pip_url.clone();
        install.executable = self.executable.clone();
        install.capabilities = self.capabilities.clone();
        install.settings = self.settings.clone();
        install.config_format = self.config_format;
        install
    }
}
