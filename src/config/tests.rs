//! Configuration tests

use super::*;
use crate::schedule::Schedule;
use conduit_plugin::{PluginInstall, PluginType, TransformMode};
use conduit_state::StateStore;
use tempfile::TempDir;

fn schedule(name: &str) -> Schedule {
    Schedule {
        name: name.to_string(),
        extractor: "tap-mock".to_string(),
        loader: "target-mock".to_string(),
        transform: TransformMode::Skip,
        interval: "@daily".to_string(),
        start_date: chrono::Utc::now(),
        env: Default::default(),
    }
}

#[test]
fn test_config_serialization() {
    let mut config = ProjectConfig::new("project-1");
    config
        .plugins
        .push(PluginInstall::new(PluginType::Extractor, "tap-mock", "tap_mock"));
    config.schedules.push(schedule("daily"));

    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("extractors:"));

    let parsed: ProjectConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config, parsed);
    assert_eq!(
        parsed.plugins.of_type(PluginType::Extractor)[0].plugin_type,
        PluginType::Extractor
    );
}

#[test]
fn test_minimal_document_defaults() {
    let config: ProjectConfig = serde_yaml::from_str("version: 1\n").unwrap();
    assert!(config.plugins.is_empty());
    assert!(config.schedules.is_empty());
    assert_eq!(config.settings, ToolConfig::default());
    assert_eq!(config.settings.env_var("JOB_ID"), "CONDUIT_JOB_ID");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let mut config = ProjectConfig::new("project-1");
    config.version = 2;
    assert!(config.validate().is_err());

    let mut config = ProjectConfig::new("project-1");
    config.schedules.push(schedule("daily"));
    config.schedules.push(schedule("daily"));
    assert!(config.validate().is_err());

    let mut config = ProjectConfig::new("project-1");
    config.settings.env_prefix = "lower".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_duplicate_plugins_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.yml");
    std::fs::write(
        &path,
        "version: 1\nplugins:\n  extractors:\n    - name: tap-mock\n    - name: tap-mock\n",
    )
    .unwrap();

    let store: StateStore<ProjectConfig> = StateStore::new(path);
    let err = store.read().unwrap_err();
    assert!(err.to_string().contains("declared more than once"));
}

fn with_profiles(profiles: &str) -> String {
    format!(
        "version: 1\nplugins:\n  extractors:\n    - name: tap-mock\n      profiles: {}\n",
        profiles
    )
}

#[test]
fn test_unaddressable_profiles_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<ProjectConfig> = StateStore::new(dir.path().join("conduit.yml"));

    for profiles in [
        "[{name: prod}, {name: prod}]",
        "[{name: default}]",
        "[{name: 'a@b'}]",
        "[{name: ''}]",
    ] {
        std::fs::write(store.path(), with_profiles(profiles)).unwrap();
        assert!(store.read().is_err(), "accepted profiles {}", profiles);
    }

    std::fs::write(store.path(), with_profiles("[{name: prod}]")).unwrap();
    assert!(store.read().is_ok());
}
