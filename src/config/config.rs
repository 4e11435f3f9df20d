//! The project document persisted in `conduit.yml`

use conduit_plugin::{PluginBuckets, Profile, DEFAULT_PROFILE};
use conduit_state::StateDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::ToolConfig;
use crate::schedule::Schedule;

/// Supported project document version
pub const CONFIG_VERSION: u32 = 1;

/// Main project document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Document version
    pub version: u32,

    /// Stable project identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Tool settings
    #[serde(default)]
    pub settings: ToolConfig,

    /// Installed plugins, by type
    #[serde(default)]
    pub plugins: PluginBuckets,

    /// Scheduled pipelines, in creation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedules: Vec<Schedule>,
}

impl ProjectConfig {
    /// Create an empty project document
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            project_id: Some(project_id.into()),
            settings: ToolConfig::default(),
            plugins: PluginBuckets::default(),
            schedules: Vec::new(),
        }
    }

    /// Validate the document
    pub fn validate(&self) -> Result<(), String> {
        if self.version != CONFIG_VERSION {
            return Err(format!(
                "Unsupported configuration version: {}",
                self.version
            ));
        }

        self.settings.validate()?;

        let mut seen = HashSet::new();
        for plugin in self.plugins.iter() {
            if plugin.name.is_empty() {
                return Err(format!(
                    "A {} has an empty name",
                    plugin.plugin_type.descriptor()
                ));
            }
            if !seen.insert(plugin.plugin_ref()) {
                return Err(format!("{} is declared more than once", plugin.plugin_ref()));
            }

            let mut profiles = HashSet::new();
            for profile in &plugin.profiles {
                Profile::validate_name(&profile.name).map_err(|e| e.to_string())?;
                if profile.name == DEFAULT_PROFILE || !profiles.insert(profile.name.as_str()) {
                    return Err(format!(
                        "Profile '{}' of {} is declared more than once",
                        profile.name,
                        plugin.plugin_ref()
                    ));
                }
            }
        }

        let mut names = HashSet::new();
        for schedule in &self.schedules {
            if !names.insert(schedule.name.as_str()) {
                return Err(format!(
                    "Schedule '{}' is declared more than once",
                    schedule.name
                ));
            }
            schedule.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

impl StateDocument for ProjectConfig {
    fn validate(&self) -> Result<(), String> {
        ProjectConfig::validate(self)
    }
}
