use super::*;
use crate::project::Project;
use conduit_plugin::{PluginError, PluginRef, DEFAULT_PROFILE};
use std::collections::HashMap;
use tempfile::TempDir;

const CATALOG: &str = r#"
version: 1
plugins:
  extractors:
    - name: tap-mock
      namespace: tap_mock
      settings:
        - name: test
          value: mock
        - name: start_date
          kind: date
        - name: protected
          protected: true
        - name: secure
          kind: password
        - name: hidden
          kind: hidden
          value: 42
        - name: boolean
          kind: boolean
        - name: port
          kind: integer
        - name: token
          env: MOCK_TOKEN
          required: true
"#;

struct Fixture {
    _dir: TempDir,
    registry: PluginRegistry,
    catalog: Arc<Catalog>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let registry = PluginRegistry::new(project);
        let catalog = Arc::new(Catalog::from_yaml_str(CATALOG).unwrap());

        let definition = catalog.lookup(PluginType::Extractor, "tap-mock").unwrap();
        registry.add(definition.to_install()).unwrap();

        Self {
            _dir: dir,
            registry,
            catalog,
        }
    }

    fn resolver(&self, env: &[(&str, &str)]) -> SettingsResolver {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SettingsResolver::new(self.registry.clone(), Arc::clone(&self.catalog), Arc::new(env))
    }

    fn plugin(&self, name: &str) -> ResolvedPlugin {
        self.registry.find(name, Some(PluginType::Extractor)).unwrap()
    }

    fn tap_ref(&self) -> PluginRef {
        PluginRef::new(PluginType::Extractor, "tap-mock")
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

#[test]
fn test_default_and_fallback_layers() {
    let fixture = Fixture::new();
    let settings = fixture.resolver(&[]).resolve_all(&fixture.plugin("tap-mock"));

    let test = settings.get("test").unwrap();
    assert_eq!(test.value, Some(string("mock")));
    assert_eq!(test.source, SettingSource::Default);

    let boolean = settings.get("boolean").unwrap();
    assert_eq!(boolean.value, Some(Value::Bool(false)));
    assert_eq!(boolean.source, SettingSource::Fallback);

    let start_date = settings.get("start_date").unwrap();
    assert_eq!(start_date.value, None);
    assert_eq!(start_date.source, SettingSource::Undefined);
}

#[test]
fn test_profile_beats_catalog_default() {
    let fixture = Fixture::new();
    fixture
        .registry
        .add_profile(&fixture.tap_ref(), Profile::new("prod").with_setting("test", string("prod")))
        .unwrap();

    let resolver = fixture.resolver(&[]);
    let prod = resolver.resolve(&fixture.plugin("tap-mock@prod"), "test");
    assert_eq!(prod.value, Some(string("prod")));
    assert_eq!(prod.source, SettingSource::Profile);

    let default = resolver.resolve(&fixture.plugin("tap-mock"), "test");
    assert_eq!(default.source, SettingSource::Default);
}

#[test]
fn test_project_layer_and_profile_precedence() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[]);
    resolver
        .set(&fixture.plugin("tap-mock"), "test", string("base"))
        .unwrap();
    fixture
        .registry
        .add_profile(&fixture.tap_ref(), Profile::new("prod").with_setting("test", string("prod")))
        .unwrap();
    fixture
        .registry
        .add_profile(&fixture.tap_ref(), Profile::new("staging"))
        .unwrap();

    let base = resolver.resolve(&fixture.plugin("tap-mock"), "test");
    assert_eq!((base.value, base.source), (Some(string("base")), SettingSource::Project));

    let prod = resolver.resolve(&fixture.plugin("tap-mock@prod"), "test");
    assert_eq!(prod.source, SettingSource::Profile);

    // a profile without its own value inherits the base config
    let staging = resolver.resolve(&fixture.plugin("tap-mock@staging"), "test");
    assert_eq!(staging.value, Some(string("base")));
    assert_eq!(staging.source, SettingSource::Project);
}

#[test]
fn test_env_overrides_everything() {
    let fixture = Fixture::new();
    fixture
        .registry
        .add_profile(&fixture.tap_ref(), Profile::new("prod").with_setting("test", string("prod")))
        .unwrap();

    let resolver = fixture.resolver(&[
        ("TAP_MOCK_TEST", "from-env"),
        ("TAP_MOCK_BOOLEAN", "yes"),
        ("TAP_MOCK_PORT", "5432"),
        ("MOCK_TOKEN", "abc"),
    ]);
    let settings = resolver.resolve_all(&fixture.plugin("tap-mock@prod"));

    assert_eq!(settings.value("test"), Some(&string("from-env")));
    assert_eq!(settings.get("test").unwrap().source, SettingSource::Env);
    assert_eq!(settings.value("boolean"), Some(&Value::Bool(true)));
    assert_eq!(settings.value("port"), Some(&Value::Number(5432.into())));
    assert_eq!(settings.value("token"), Some(&string("abc")));
}

#[test]
fn test_protected_setting_ignores_env_once_pinned() {
    let fixture = Fixture::new();
    let env = [("TAP_MOCK_PROTECTED", "from-env")];

    // not pinned yet, the environment applies
    let unpinned = fixture
        .resolver(&env)
        .resolve(&fixture.plugin("tap-mock"), "protected");
    assert_eq!(unpinned.source, SettingSource::Env);

    fixture
        .resolver(&[])
        .set(&fixture.plugin("tap-mock"), "protected", string("pinned"))
        .unwrap();

    let pinned = fixture
        .resolver(&env)
        .resolve(&fixture.plugin("tap-mock"), "protected");
    assert_eq!(pinned.value, Some(string("pinned")));
    assert_eq!(pinned.source, SettingSource::Project);
}

#[test]
fn test_undeclared_keys_are_listed_after_schema() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[]);
    resolver
        .set(&fixture.plugin("tap-mock"), "extra", string("x"))
        .unwrap();

    let settings = resolver.resolve_all(&fixture.plugin("tap-mock"));
    let last = settings.iter().last().unwrap();
    assert_eq!(last.name(), "extra");
    assert_eq!(last.source, SettingSource::Project);
    assert_eq!(last.env_var, "TAP_MOCK_EXTRA");
}

#[test]
fn test_set_validates_declared_kind() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[]);
    let plugin = fixture.plugin("tap-mock");

    let err = resolver
        .set(&plugin, "start_date", string("yesterday"))
        .unwrap_err();
    assert!(matches!(
        err,
        crate::ConduitError::Plugin(PluginError::InvalidValue { .. })
    ));

    resolver.set_from_str(&plugin, "port", "8080").unwrap();
    let port = resolver.resolve(&fixture.plugin("tap-mock"), "port");
    assert_eq!(port.value, Some(Value::Number(8080.into())));
}

#[test]
fn test_set_writes_selected_profile_and_unset() {
    let fixture = Fixture::new();
    fixture
        .registry
        .add_profile(&fixture.tap_ref(), Profile::new("prod"))
        .unwrap();
    let resolver = fixture.resolver(&[]);

    resolver
        .set(&fixture.plugin("tap-mock@prod"), "start_date", string("2020-01-01"))
        .unwrap();

    let stored = fixture.registry.get(&fixture.tap_ref()).unwrap();
    assert!(stored.config.is_empty());
    assert_eq!(stored.profile("prod").unwrap().config.len(), 1);

    let previous = resolver
        .unset(&fixture.plugin("tap-mock@prod"), "start_date")
        .unwrap();
    assert_eq!(previous, Some(string("2020-01-01")));
    assert_eq!(
        resolver.unset(&fixture.plugin("tap-mock@prod"), "start_date").unwrap(),
        None
    );
}

#[test]
fn test_listing_hides_and_redacts() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[("TAP_MOCK_SECURE", "hunter2")]);
    let listing = resolver.resolve_all(&fixture.plugin("tap-mock")).listing();

    assert!(listing.iter().all(|row| row.name != "hidden"));
    let secure = listing.iter().find(|row| row.name == "secure").unwrap();
    assert_eq!(secure.value.as_deref(), Some(REDACTED));

    // hidden settings still resolve
    let settings = resolver.resolve_all(&fixture.plugin("tap-mock"));
    assert_eq!(settings.value("hidden"), Some(&Value::Number(42.into())));
    assert_eq!(settings.to_env().get("TAP_MOCK_SECURE").map(String::as_str), Some("hunter2"));
}

#[test]
fn test_display_config_and_env_mask_secrets() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[("TAP_MOCK_SECURE", "hunter2"), ("MOCK_TOKEN", "abc")]);
    let settings = resolver.resolve_all(&fixture.plugin("tap-mock"));

    let config = settings.display_config(SettingSource::Fallback);
    assert_eq!(config.get("secure"), Some(&string(REDACTED)));
    assert_eq!(config.get("test"), Some(&string("mock")));
    assert_eq!(config.get("token"), Some(&string("abc")));
    assert!(!config.contains_key("hidden"));

    let env = settings.display_env();
    assert_eq!(env.get("TAP_MOCK_SECURE").map(String::as_str), Some(REDACTED));
    assert!(!env.contains_key("TAP_MOCK_HIDDEN"));
    assert!(env.values().all(|value| value != "hunter2"));

    // the plugin itself still receives the real values
    assert_eq!(
        settings.to_config(SettingSource::Fallback).get("secure"),
        Some(&string("hunter2"))
    );
}

#[test]
fn test_require_names_first_missing_setting() {
    let fixture = Fixture::new();
    let settings = fixture.resolver(&[]).resolve_all(&fixture.plugin("tap-mock"));

    match settings.require() {
        Err(crate::ConduitError::MissingRequiredSetting { plugin, setting }) => {
            assert_eq!(plugin, "tap-mock");
            assert_eq!(setting, "token");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let settings = fixture
        .resolver(&[("MOCK_TOKEN", "abc")])
        .resolve_all(&fixture.plugin("tap-mock"));
    assert!(settings.require().is_ok());
}

#[test]
fn test_to_config_by_precedence() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[("MOCK_TOKEN", "abc")]);
    resolver
        .set(&fixture.plugin("tap-mock"), "start_date", string("2020-01-01"))
        .unwrap();
    let settings = resolver.resolve_all(&fixture.plugin("tap-mock"));

    let explicit = settings.to_config(SettingSource::Project);
    assert_eq!(explicit.len(), 2);
    assert!(explicit.contains_key("token"));
    assert!(explicit.contains_key("start_date"));

    let everything = settings.to_config(SettingSource::Fallback);
    assert_eq!(everything.get("test"), Some(&string("mock")));
    assert_eq!(everything.get("boolean"), Some(&Value::Bool(false)));
    assert!(!everything.contains_key("secure"));
}

#[test]
fn test_stored_values_expand_env_references() {
    let fixture = Fixture::new();
    fixture
        .resolver(&[])
        .set(&fixture.plugin("tap-mock"), "test", string("$HOME/data"))
        .unwrap();

    let resolved = fixture
        .resolver(&[("HOME", "/home/conduit")])
        .resolve(&fixture.plugin("tap-mock"), "test");
    assert_eq!(resolved.value, Some(string("/home/conduit/data")));
}

#[test]
fn test_schema_falls_back_to_catalog() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver(&[]);

    let mut bare = fixture.registry.get(&fixture.tap_ref()).unwrap();
    bare.settings.clear();
    fixture.registry.update(bare.clone()).unwrap();

    assert_eq!(resolver.schema(&bare).len(), 8);
    let plugin = fixture.plugin(&format!("tap-mock@{DEFAULT_PROFILE}"));
    assert_eq!(resolver.resolve(&plugin, "test").source, SettingSource::Default);
}
