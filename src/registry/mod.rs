//! Registry of the plugins installed into a project

use conduit_plugin::{ConfigMap, PluginInstall, PluginName, PluginRef, PluginType, Profile};
use tracing::{debug, info};

use crate::project::Project;
use crate::{ConduitError, ConduitResult};

/// An installed plugin paired with the profile a lookup selected
///
/// Lookups never modify the stored plugin; the selected profile travels
/// alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlugin {
    pub install: PluginInstall,
    pub profile: Profile,
}

impl ResolvedPlugin {
    pub fn plugin_ref(&self) -> PluginRef {
        self.install.plugin_ref()
    }

    /// Qualified `name@profile` reference
    pub fn name(&self) -> PluginName {
        PluginName::new(&self.install.name, Some(self.profile.name.as_str()))
    }

    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }
}

/// Snapshot of installed plugins, taken when the listing was requested
#[derive(Debug, Clone, Default)]
pub struct PluginList {
    plugins: Vec<PluginInstall>,
}

impl PluginList {
    pub fn iter(&self) -> std::slice::Iter<'_, PluginInstall> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl IntoIterator for PluginList {
    type Item = PluginInstall;
    type IntoIter = std::vec::IntoIter<PluginInstall>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.into_iter()
    }
}

impl<'a> IntoIterator for &'a PluginList {
    type Item = &'a PluginInstall;
    type IntoIter = std::slice::Iter<'a, PluginInstall>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

/// Installed plugins of one project
///
/// Every mutation goes through [`Project::update`], so the project document
/// is rewritten as a whole under the exclusive lock.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    project: Project,
}

impl PluginRegistry {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Install a plugin; its ref must not be taken yet
    pub fn add(&self, install: PluginInstall) -> ConduitResult<PluginInstall> {
        self.project.update(|config| {
            let plugin_ref = install.plugin_ref();
            if config.plugins.contains(&plugin_ref) {
                return Err(ConduitError::DuplicatePlugin { plugin: plugin_ref });
            }

            config.plugins.push(install.clone());
            Ok(())
        })?;

        info!("Installed {}", install.plugin_ref());
        Ok(install)
    }

    /// Find a plugin by `name` or `name@profile`
    ///
    /// Without a type filter the bare name must match plugins of a single
    /// type; a name installed under several types is reported as ambiguous.
    pub fn find(
        &self,
        name: &str,
        plugin_type: Option<PluginType>,
    ) -> ConduitResult<ResolvedPlugin> {
        let name = PluginName::parse(name)?;
        let config = self.project.config()?;

        let mut matches: Vec<&PluginInstall> = config
            .plugins
            .iter()
            .filter(|p| p.name == name.name())
            .filter(|p| plugin_type.map_or(true, |t| p.plugin_type == t))
            .collect();

        let install = match matches.len() {
            0 => return Err(ConduitError::plugin_not_found(name.name(), plugin_type)),
            1 => matches.remove(0).clone(),
            _ => {
                return Err(ConduitError::AmbiguousPlugin {
                    name: name.name().to_string(),
                    types: matches
                        .iter()
                        .map(|p| p.plugin_type.descriptor().to_string())
                        .collect(),
                })
            }
        };

        let profile = install.profile(name.profile_name())?;
        debug!("Resolved '{}' to {} ({})", name, install.plugin_ref(), profile.name);

        Ok(ResolvedPlugin { install, profile })
    }

    /// Find the plugin of `plugin_type` that owns `namespace`
    pub fn find_by_namespace(
        &self,
        plugin_type: PluginType,
        namespace: &str,
    ) -> ConduitResult<PluginInstall> {
        let config = self.project.config()?;
        config
            .plugins
            .of_type(plugin_type)
            .iter()
            .find(|p| p.namespace == namespace)
            .cloned()
            .ok_or_else(|| ConduitError::plugin_not_found(namespace, Some(plugin_type)))
    }

    /// Fetch a plugin by its exact ref
    pub fn get(&self, plugin_ref: &PluginRef) -> ConduitResult<PluginInstall> {
        let config = self.project.config()?;
        config
            .plugins
            .get(plugin_ref)
            .cloned()
            .ok_or_else(|| {
                ConduitError::plugin_not_found(&plugin_ref.name, Some(plugin_ref.plugin_type))
            })
    }

    /// Fetch a plugin by ref and select one of its profiles
    pub fn resolve(&self, plugin_ref: &PluginRef, profile: &str) -> ConduitResult<ResolvedPlugin> {
        let install = self.get(plugin_ref)?;
        let profile = install.profile(profile)?;
        Ok(ResolvedPlugin { install, profile })
    }

    /// Replace the stored plugin with the same ref, returning the previous value
    pub fn update(&self, install: PluginInstall) -> ConduitResult<PluginInstall> {
        let plugin_ref = install.plugin_ref();
        let previous = self.project.update(|config| {
            config
                .plugins
                .replace(install)
                .ok_or_else(|| {
                    ConduitError::plugin_not_found(&plugin_ref.name, Some(plugin_ref.plugin_type))
                })
        })?;

        info!("Updated {}", plugin_ref);
        Ok(previous)
    }

    /// Uninstall a plugin
    pub fn remove(&self, plugin_ref: &PluginRef) -> ConduitResult<PluginInstall> {
        self.project.update(|config| {
            config.plugins.remove(plugin_ref).ok_or_else(|| {
                ConduitError::plugin_not_found(&plugin_ref.name, Some(plugin_ref.plugin_type))
            })
        })
    }

    /// Snapshot of installed plugins, optionally of one type
    pub fn list(&self, plugin_type: Option<PluginType>) -> ConduitResult<PluginList> {
        let config = self.project.config()?;
        let plugins = match plugin_type {
            Some(t) => config.plugins.of_type(t).to_vec(),
            None => config.plugins.iter().cloned().collect(),
        };
        Ok(PluginList { plugins })
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.find(name, None).is_ok()
    }

    /// Add a named profile to an installed plugin
    pub fn add_profile(&self, plugin_ref: &PluginRef, profile: Profile) -> ConduitResult<()> {
        let profile_name = profile.name.clone();
        self.project.update(|config| {
            let install = config.plugins.get_mut(plugin_ref).ok_or_else(|| {
                ConduitError::plugin_not_found(&plugin_ref.name, Some(plugin_ref.plugin_type))
            })?;
            install.add_profile(profile)?;
            Ok(())
        })?;

        info!("Added profile '{}' to {}", profile_name, plugin_ref);
        Ok(())
    }

    /// Edit the config map a profile writes to (the base config for the
    /// default profile)
    pub fn update_config<R, F>(
        &self,
        plugin_ref: &PluginRef,
        profile: &str,
        edit: F,
    ) -> ConduitResult<R>
    where
        F: FnOnce(&mut ConfigMap) -> ConduitResult<R>,
    {
        self.project.update(|config| {
            let install = config.plugins.get_mut(plugin_ref).ok_or_else(|| {
                ConduitError::plugin_not_found(&plugin_ref.name, Some(plugin_ref.plugin_type))
            })?;
            edit(install.config_mut(profile)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_plugin::DEFAULT_PROFILE;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn registry() -> (TempDir, PluginRegistry) {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        (dir, PluginRegistry::new(project))
    }

    fn tap() -> PluginInstall {
        PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock")
    }

    #[test]
    fn test_add_then_find() {
        let (_dir, registry) = registry();
        let added = registry.add(tap()).unwrap();

        let found = registry.find("tap-mock", Some(PluginType::Extractor)).unwrap();
        assert_eq!(found.install, added);
        assert_eq!(found.profile_name(), DEFAULT_PROFILE);
    }

    #[test]
    fn test_add_duplicate() {
        let (_dir, registry) = registry();
        registry.add(tap()).unwrap();

        assert!(matches!(
            registry.add(tap()),
            Err(ConduitError::DuplicatePlugin { .. })
        ));
        assert_eq!(registry.list(None).unwrap().len(), 1);
    }

    #[test]
    fn test_same_name_different_types_is_ambiguous_without_filter() {
        let (_dir, registry) = registry();
        registry.add(tap()).unwrap();
        registry
            .add(PluginInstall::new(PluginType::Transform, "tap-mock", "tap_mock"))
            .unwrap();

        assert!(matches!(
            registry.find("tap-mock", None),
            Err(ConduitError::AmbiguousPlugin { .. })
        ));
        let transform = registry.find("tap-mock", Some(PluginType::Transform)).unwrap();
        assert_eq!(transform.install.plugin_type, PluginType::Transform);
    }

    #[test]
    fn test_find_missing() {
        let (_dir, registry) = registry();
        let err = registry.find("tap-absent", None).unwrap_err();
        assert!(matches!(err, ConduitError::PluginNotFound { .. }));
        assert!(!registry.has_plugin("tap-absent"));
    }

    #[test]
    fn test_find_with_profile() {
        let (_dir, registry) = registry();
        registry.add(tap()).unwrap();
        let plugin_ref = tap().plugin_ref();

        assert!(registry.find("tap-mock@prod", None).is_err());

        registry.add_profile(&plugin_ref, Profile::new("prod")).unwrap();
        let found = registry.find("tap-mock@prod", None).unwrap();
        assert_eq!(found.profile_name(), "prod");
        assert_eq!(found.name().to_string(), "tap-mock@prod");

        // the lookup left the stored plugin untouched
        assert_eq!(registry.get(&plugin_ref).unwrap().profiles.len(), 1);
    }

    #[test]
    fn test_update_returns_previous() {
        let (_dir, registry) = registry();
        registry.add(tap()).unwrap();

        let mut changed = tap();
        changed.config.insert("test".to_string(), Value::String("x".into()));
        let previous = registry.update(changed.clone()).unwrap();

        assert!(previous.config.is_empty());
        assert_eq!(registry.get(&changed.plugin_ref()).unwrap(), changed);

        let missing = PluginInstall::new(PluginType::Loader, "target-absent", "");
        assert!(matches!(
            registry.update(missing),
            Err(ConduitError::PluginNotFound { .. })
        ));
    }

    #[test]
    fn test_find_by_namespace_and_remove() {
        let (_dir, registry) = registry();
        registry.add(tap()).unwrap();

        let found = registry
            .find_by_namespace(PluginType::Extractor, "tap_mock")
            .unwrap();
        assert_eq!(found.name, "tap-mock");
        assert!(registry
            .find_by_namespace(PluginType::Model, "tap_mock")
            .is_err());

        registry.remove(&found.plugin_ref()).unwrap();
        assert!(registry.list(None).unwrap().is_empty());
        assert!(registry.remove(&found.plugin_ref()).is_err());
    }

    #[test]
    fn test_list_order_and_snapshot() {
        let (_dir, registry) = registry();
        for name in ["tap-b", "tap-a", "tap-c"] {
            registry
                .add(PluginInstall::new(PluginType::Extractor, name, name))
                .unwrap();
        }
        registry
            .add(PluginInstall::new(PluginType::Loader, "target-mock", ""))
            .unwrap();

        let extractors = registry.list(Some(PluginType::Extractor)).unwrap();
        let names: Vec<&str> = extractors.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["tap-b", "tap-a", "tap-c"]);

        registry
            .add(PluginInstall::new(PluginType::Extractor, "tap-d", ""))
            .unwrap();
        assert_eq!(extractors.len(), 3);
        // restartable
        assert_eq!(extractors.iter().count(), extractors.iter().count());
        assert_eq!(registry.list(None).unwrap().len(), 5);
    }
}
