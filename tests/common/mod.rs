//! Shared fixtures for integration tests

#![allow(dead_code)]

use conduit::{Catalog, Conduit, PluginInstall, PluginType, Project};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const MOCK_CATALOG: &str = r#"
version: 1
plugins:
  extractors:
    - name: tap-mock
      namespace: tap_mock
      pip_url: tap-mock
      capabilities: [state, catalog]
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
  loaders:
    - name: target-mock
      namespace: target_mock
      settings:
        - name: schema
          value: public
  transforms:
    - name: tap-mock-transform
      namespace: tap_mock
  transformers:
    - name: transformer-mock
      namespace: transformer_mock
      settings:
        - name: target
          value: dev
  models:
    - name: model-gitlab
      namespace: tap_gitlab
"#;

/// A fresh project in a temporary directory, wired to the mock catalog
pub struct TestProject {
    pub dir: TempDir,
    pub app: Conduit,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    pub fn with_env(env: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let app = Self::open(&project, env);
        Self { dir, app }
    }

    /// Another view of the same project with a different environment
    pub fn reopen(&self, env: &[(&str, &str)]) -> Conduit {
        Self::open(self.app.project(), env)
    }

    fn open(project: &Project, env: &[(&str, &str)]) -> Conduit {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let catalog = Catalog::from_yaml_str(MOCK_CATALOG).unwrap();
        Conduit::with_parts(project.clone(), catalog, Arc::new(env))
    }

    pub fn add(&self, plugin_type: PluginType, name: &str) -> PluginInstall {
        self.app.add_plugin(plugin_type, name).unwrap()
    }

    /// Install the extractor and loader used by most pipeline tests
    pub fn add_tap_and_target(&self) {
        self.add(PluginType::Extractor, "tap-mock");
        self.add(PluginType::Loader, "target-mock");
    }
}
