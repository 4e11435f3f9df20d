//! Plugins installed into a project

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    ConfigFormat, ConfigMap, PluginError, PluginRef, PluginResult, PluginType, Profile,
    SettingDefinition, DEFAULT_PROFILE,
};

/// A catalog definition bound into a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInstall {
    /// Assigned from the owning bucket on load
    #[serde(skip)]
    pub plugin_type: PluginType,

    pub name: String,

    /// Associates models, dashboards and transforms with an extractor
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Package locator used by the installer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_url: Option<String>,

    /// Executable name, defaults to the plugin name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,

    /// Declared settings schema, seeded from the catalog on install
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_format: Option<ConfigFormat>,

    /// Base config, i.e. the default profile's values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: ConfigMap,

    /// Named profiles, in creation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

impl PluginInstall {
    pub fn new(
        plugin_type: PluginType,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            plugin_type,
            name: name.into(),
            namespace: namespace.into(),
            pip_url: None,
            executable: None,
            capabilities: Vec::new(),
            settings: Vec::new(),
            config_format: None,
            config: ConfigMap::new(),
            profiles: Vec::new(),
        }
    }

    pub fn plugin_ref(&self) -> PluginRef {
        PluginRef::new(self.plugin_type, self.name.clone())
    }

    pub fn executable(&self) -> &str {
        self.executable.as_deref().unwrap_or(&self.name)
    }

    pub fn config_format(&self) -> ConfigFormat {
        self.config_format
            .unwrap_or_else(|| self.plugin_type.default_config_format())
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Look up a declared setting
    pub fn setting(&self, name: &str) -> Option<&SettingDefinition> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn has_profile(&self, name: &str) -> bool {
        name == DEFAULT_PROFILE || self.profiles.iter().any(|p| p.name == name)
    }

    /// Resolve a profile by name; the default profile always exists
    pub fn profile(&self, name: &str) -> PluginResult<Profile> {
        if name == DEFAULT_PROFILE {
            return Ok(Profile::default_profile());
        }

        self.profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| PluginError::ProfileNotFound {
                plugin: self.name.clone(),
                profile: name.to_string(),
            })
    }

    /// Add a named profile
    pub fn add_profile(&mut self, profile: Profile) -> PluginResult<()> {
        Profile::validate_name(&profile.name)?;
        if self.has_profile(&profile.name) {
            return Err(PluginError::DuplicateProfile {
                plugin: self.name.clone(),
                profile: profile.name,
            });
        }

        self.profiles.push(profile);
        Ok(())
    }

    /// Config map written for `profile`: the base config for the default
    /// profile, the profile's own overrides otherwise
    pub fn config_mut(&mut self, profile: &str) -> PluginResult<&mut ConfigMap> {
        if profile == DEFAULT_PROFILE {
            return Ok(&mut self.config);
        }

        let plugin = self.name.clone();
        self.profiles
            .iter_mut()
            .find(|p| p.name == profile)
            .map(|p| &mut p.config)
            .ok_or_else(|| PluginError::ProfileNotFound {
                plugin,
                profile: profile.to_string(),
            })
    }
}

/// Installed plugins grouped by type, insertion ordered within each type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<PluginType, Vec<PluginInstall>>",
    into = "BTreeMap<PluginType, Vec<PluginInstall>>"
)]
pub struct PluginBuckets {
    buckets: BTreeMap<PluginType, Vec<PluginInstall>>,
}

impl From<BTreeMap<PluginType, Vec<PluginInstall>>> for PluginBuckets {
    fn from(mut buckets: BTreeMap<PluginType, Vec<PluginInstall>>) -> Self {
        for (plugin_type, plugins) in buckets.iter_mut() {
            for plugin in plugins.iter_mut() {
                plugin.plugin_type = *plugin_type;
            }
        }
        buckets.retain(|_, plugins| !plugins.is_empty());
        Self { buckets }
    }
}

impl From<PluginBuckets> for BTreeMap<PluginType, Vec<PluginInstall>> {
    fn from(value: PluginBuckets) -> Self {
        value.buckets
    }
}

impl PluginBuckets {
    /// All plugins, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = &PluginInstall> {
        self.buckets.values().flatten()
    }

    /// Plugins of one type, in insertion order
    pub fn of_type(&self, plugin_type: PluginType) -> &[PluginInstall] {
        self.buckets
            .get(&plugin_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, plugin_ref: &PluginRef) -> bool {
        self.get(plugin_ref).is_some()
    }

    pub fn get(&self, plugin_ref: &PluginRef) -> Option<&PluginInstall> {
        self.of_type(plugin_ref.plugin_type)
            .iter()
            .find(|p| p.name == plugin_ref.name)
    }

    pub fn get_mut(&mut self, plugin_ref: &PluginRef) -> Option<&mut PluginInstall> {
        self.buckets
            .get_mut(&plugin_ref.plugin_type)?
            .iter_mut()
            .find(|p| p.name == plugin_ref.name)
    }

    /// Append to the plugin's type bucket; uniqueness is the caller's concern
    pub fn push(&mut self, plugin: PluginInstall) {
        self.buckets.entry(plugin.plugin_type).or_default().push(plugin);
    }

    /// Replace the stored plugin with the same ref, returning the previous one
    pub fn replace(&mut self, plugin: PluginInstall) -> Option<PluginInstall> {
        let slot = self.get_mut(&plugin.plugin_ref())?;
        Some(std::mem::replace(slot, plugin))
    }

    pub fn remove(&mut self, plugin_ref: &PluginRef) -> Option<PluginInstall> {
        let bucket = self.buckets.get_mut(&plugin_ref.plugin_type)?;
        let index = bucket.iter().position(|p| p.name == plugin_ref.name)?;
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.buckets.remove(&plugin_ref.plugin_type);
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_yaml::Value;

    #[test]
    fn test_buckets_assign_types_on_load() {
        let yaml = r#"
extractors:
  - name: tap-mock
    namespace: tap_mock
  - name: tap-gitlab
    namespace: tap_gitlab
loaders:
  - name: target-mock
"#;
        let buckets: PluginBuckets = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(buckets.len(), 3);

        let extractors = buckets.of_type(PluginType::Extractor);
        assert_eq!(extractors[0].name, "tap-mock");
        assert_eq!(extractors[1].name, "tap-gitlab");
        assert_eq!(buckets.of_type(PluginType::Loader)[0].plugin_type, PluginType::Loader);
        assert!(buckets.of_type(PluginType::Model).is_empty());
    }

    #[test]
    fn test_buckets_replace_and_remove() {
        let mut buckets = PluginBuckets::default();
        buckets.push(PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock"));

        let mut updated = PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock");
        updated.config.insert("test".to_string(), Value::String("x".into()));

        let previous = buckets.replace(updated.clone()).unwrap();
        assert!(previous.config.is_empty());
        assert_eq!(buckets.get(&updated.plugin_ref()), Some(&updated));

        assert!(buckets.remove(&updated.plugin_ref()).is_some());
        assert!(buckets.is_empty());
        assert!(buckets.replace(updated).is_none());
    }

    #[test]
    fn test_profiles() {
        let mut plugin = PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock");
        assert!(plugin.profile(DEFAULT_PROFILE).unwrap().is_default());
        assert!(plugin.profile("prod").is_err());

        plugin.add_profile(Profile::new("prod")).unwrap();
        assert!(matches!(
            plugin.add_profile(Profile::new("prod")),
            Err(PluginError::DuplicateProfile { .. })
        ));
        assert!(matches!(
            plugin.add_profile(Profile::new(DEFAULT_PROFILE)),
            Err(PluginError::DuplicateProfile { .. })
        ));

        plugin
            .config_mut("prod")
            .unwrap()
            .insert("start_date".to_string(), Value::String("2020-01-01".into()));
        assert_eq!(plugin.profile("prod").unwrap().config.len(), 1);
        assert!(plugin.config.is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("a@b")]
    #[case("@prod")]
    #[case("prod east")]
    #[case("prod\t")]
    fn test_add_profile_rejects_unaddressable_names(#[case] name: &str) {
        let mut plugin = PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock");

        assert!(matches!(
            plugin.add_profile(Profile::new(name)),
            Err(PluginError::InvalidName { .. })
        ));
        assert!(plugin.profiles.is_empty());
    }

    #[test]
    fn test_defaults() {
        let plugin = PluginInstall::new(PluginType::Transformer, "dbt", "dbt");
        assert_eq!(plugin.executable(), "dbt");
        assert_eq!(plugin.config_format(), ConfigFormat::Env);
        assert!(!plugin.has_capability("state"));
    }
}
