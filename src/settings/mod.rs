//! Layered settings resolution
//!
//! A setting's effective value comes from the first layer that defines it:
//!
//! 1. environment variable override
//! 2. named profile override
//! 3. base config stored in the project
//! 4. default declared in the settings schema
//! 5. kind-specific fallback
//!
//! Protected settings ignore the environment once the project pins a value.

mod resolved;
mod source;

#[cfg(test)]
mod tests;

pub use resolved::{ResolvedSetting, ResolvedSettings, SettingListing, REDACTED};
pub use source::{EnvSource, ProcessEnv, SettingSource};

use conduit_catalog::Catalog;
use conduit_plugin::{PluginInstall, PluginType, Profile, SettingDefinition, SettingKind};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::registry::{PluginRegistry, ResolvedPlugin};
use crate::ConduitResult;

/// Resolves plugin settings against the registry, catalog and environment
#[derive(Clone)]
pub struct SettingsResolver {
    registry: PluginRegistry,
    catalog: Arc<Catalog>,
    env: Arc<dyn EnvSource>,
}

impl SettingsResolver {
    pub fn new(registry: PluginRegistry, catalog: Arc<Catalog>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            registry,
            catalog,
            env,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn env(&self) -> &dyn EnvSource {
        self.env.as_ref()
    }

    /// Declared settings of a plugin
    ///
    /// Plugins installed without a schema fall back to their catalog entry.
    pub fn schema(&self, install: &PluginInstall) -> Vec<SettingDefinition> {
        if !install.settings.is_empty() {
            return install.settings.clone();
        }

        self.catalog
            .lookup(install.plugin_type, &install.name)
            .map(|definition| definition.settings.clone())
            .unwrap_or_default()
    }

    /// Resolve one setting; unknown names resolve as plain strings
    pub fn resolve(&self, plugin: &ResolvedPlugin, name: &str) -> ResolvedSetting {
        let definition = self
            .schema(&plugin.install)
            .into_iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| SettingDefinition::new(name, SettingKind::String));

        self.resolve_definition(&plugin.install, &plugin.profile, definition)
    }

    /// Resolve every declared setting, then every undeclared key stored in
    /// the profile or base config
    pub fn resolve_all(&self, plugin: &ResolvedPlugin) -> ResolvedSettings {
        let schema = self.schema(&plugin.install);
        let declared: BTreeSet<String> = schema.iter().map(|s| s.name.clone()).collect();

        let undeclared: BTreeSet<&String> = plugin
            .profile
            .config
            .keys()
            .chain(plugin.install.config.keys())
            .filter(|key| !declared.contains(*key))
            .collect();

        let mut settings: Vec<ResolvedSetting> = schema
            .into_iter()
            .map(|definition| self.resolve_definition(&plugin.install, &plugin.profile, definition))
            .collect();

        for key in undeclared {
            let definition = SettingDefinition::new(key.as_str(), SettingKind::String);
            settings.push(self.resolve_definition(&plugin.install, &plugin.profile, definition));
        }

        ResolvedSettings::new(plugin.name(), settings)
    }

    /// Find a plugin by `name[@profile]` and resolve all of its settings
    pub fn for_plugin(
        &self,
        name: &str,
        plugin_type: Option<PluginType>,
    ) -> ConduitResult<ResolvedSettings> {
        let plugin = self.registry.find(name, plugin_type)?;
        Ok(self.resolve_all(&plugin))
    }

    fn resolve_definition(
        &self,
        install: &PluginInstall,
        profile: &Profile,
        definition: SettingDefinition,
    ) -> ResolvedSetting {
        let name = definition.name.as_str();
        let env_var = definition.env_var(&install.name);

        let profile_value = if profile.is_default() {
            None
        } else {
            profile.config.get(name).filter(|v| !v.is_null())
        };
        let project_value = install.config.get(name).filter(|v| !v.is_null());
        let pinned = definition.protected && (profile_value.is_some() || project_value.is_some());

        let env_value = if pinned {
            None
        } else {
            self.env.var(&env_var)
        };

        let (value, source) = if let Some(raw) = env_value {
            (Some(definition.kind.coerce(&raw)), SettingSource::Env)
        } else if let Some(value) = profile_value {
            (Some(self.expand(value)), SettingSource::Profile)
        } else if let Some(value) = project_value {
            (Some(self.expand(value)), SettingSource::Project)
        } else if let Some(value) = &definition.value {
            (Some(value.clone()), SettingSource::Default)
        } else if let Some(value) = definition.kind.fallback() {
            (Some(value), SettingSource::Fallback)
        } else {
            (None, SettingSource::Undefined)
        };

        debug!(
            "Resolved {}.{} from {}{}",
            install.name,
            name,
            source,
            if pinned { " (protected)" } else { "" }
        );

        ResolvedSetting {
            definition,
            value,
            source,
            env_var,
        }
    }

    /// Expand `$VAR` references in stored string values
    fn expand(&self, value: &Value) -> Value {
        match value {
            Value::String(s) if s.contains('$') => Value::String(
                shellexpand::env_with_context_no_errors(s, |var| self.env.var(var)).into_owned(),
            ),
            other => other.clone(),
        }
    }

    /// Store a value in the plugin's selected profile
    ///
    /// The default profile writes the base config, a named profile its own
    /// overrides. Declared settings validate the value first.
    pub fn set(&self, plugin: &ResolvedPlugin, setting: &str, value: Value) -> ConduitResult<()> {
        let definition = self
            .schema(&plugin.install)
            .into_iter()
            .find(|s| s.name == setting)
            .unwrap_or_else(|| SettingDefinition::new(setting, SettingKind::String));
        definition.validate(&value)?;

        self.registry
            .update_config(&plugin.plugin_ref(), plugin.profile_name(), |config| {
                config.insert(setting.to_string(), value);
                Ok(())
            })?;

        info!("Set '{}' for {}", setting, plugin.name());
        Ok(())
    }

    /// Like [`SettingsResolver::set`], coercing a raw string by the setting's kind
    pub fn set_from_str(
        &self,
        plugin: &ResolvedPlugin,
        setting: &str,
        raw: &str,
    ) -> ConduitResult<()> {
        let kind = self
            .schema(&plugin.install)
            .iter()
            .find(|s| s.name == setting)
            .map(|s| s.kind)
            .unwrap_or_default();

        self.set(plugin, setting, kind.coerce(raw))
    }

    /// Remove a stored value from the plugin's selected profile
    pub fn unset(&self, plugin: &ResolvedPlugin, setting: &str) -> ConduitResult<Option<Value>> {
        let previous = self
            .registry
            .update_config(&plugin.plugin_ref(), plugin.profile_name(), |config| {
                Ok(config.remove(setting))
            })?;

        if previous.is_some() {
            info!("Unset '{}' for {}", setting, plugin.name());
        }
        Ok(previous)
    }
}
