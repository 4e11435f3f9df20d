//! Project location and persisted project state

use conduit_state::StateStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::job::JobId;
use crate::utils;
use crate::{ConduitError, ConduitResult};

/// Project document file name
pub const PROJECT_FILE: &str = "conduit.yml";

/// Project-level catalog additions
pub const CATALOG_FILE: &str = "discovery.yml";

/// Directory holding generated and runtime files
pub const SYSTEM_DIR: &str = ".conduit";

/// A conduit project rooted at a directory containing `conduit.yml`
///
/// The persisted document is only ever changed through [`Project::update`],
/// which runs under the store's exclusive lock.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    store: Arc<StateStore<ProjectConfig>>,
}

impl Project {
    /// Create a new project in `root`
    pub fn init(root: &Path) -> ConduitResult<Self> {
        utils::ensure_directory(root)?;
        let project = Self::at(root);

        if project.store.exists() {
            return Err(ConduitError::ProjectExists(project.root.clone()));
        }

        let config = ProjectConfig::new(uuid::Uuid::new_v4().to_string());
        project.store.write(&config)?;
        utils::ensure_directory(&project.system_dir())?;

        info!("Initialized project in {:?}", project.root);
        Ok(project)
    }

    /// Open the project rooted exactly at `root`
    pub fn open(root: &Path) -> ConduitResult<Self> {
        let project = Self::at(root);
        if !project.store.exists() {
            return Err(ConduitError::ProjectNotFound(root.to_path_buf()));
        }
        Ok(project)
    }

    /// Find the project containing `start`, searching parent directories
    pub fn find(start: &Path) -> ConduitResult<Self> {
        for dir in start.ancestors() {
            if dir.join(PROJECT_FILE).is_file() {
                debug!("Found project in {:?}", dir);
                return Ok(Self::at(dir));
            }
        }

        Err(ConduitError::ProjectNotFound(start.to_path_buf()))
    }

    fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            store: Arc::new(StateStore::new(root.join(PROJECT_FILE))),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    /// Consistent snapshot of the project document
    pub fn config(&self) -> ConduitResult<ProjectConfig> {
        Ok(self.store.read()?)
    }

    /// Run `update` against the current document and atomically rewrite it
    ///
    /// Nothing is written when `update` fails.
    pub fn update<R, F>(&self, update: F) -> ConduitResult<R>
    where
        F: FnOnce(&mut ProjectConfig) -> ConduitResult<R>,
    {
        self.store.scoped_update(update)
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join(SYSTEM_DIR)
    }

    /// Catalog additions declared by the project
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    /// Generated files for one plugin profile
    pub fn run_dir(&self, plugin_name: &str, profile: &str) -> PathBuf {
        let dir = self
            .system_dir()
            .join("run")
            .join(utils::sanitize_filename(plugin_name));

        if profile == conduit_plugin::DEFAULT_PROFILE {
            dir
        } else {
            dir.join(utils::sanitize_filename(profile))
        }
    }

    /// Logs and records of one pipeline job
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.system_dir()
            .join("logs")
            .join("elt")
            .join(job_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_find() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.config_path().exists());
        assert!(project.system_dir().is_dir());
        assert!(project.config().unwrap().project_id.is_some());

        let nested = dir.path().join("transform").join("models");
        std::fs::create_dir_all(&nested).unwrap();
        let found = Project::find(&nested).unwrap();
        assert_eq!(found.root(), dir.path());
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();
        assert!(matches!(
            Project::init(dir.path()),
            Err(ConduitError::ProjectExists(_))
        ));
    }

    #[test]
    fn test_open_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Project::open(dir.path()),
            Err(ConduitError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_failed_update_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let before = project.config().unwrap();

        let result: ConduitResult<()> = project.update(|config| {
            config.settings.env_prefix = "CHANGED".to_string();
            Err(ConduitError::Config("rejected".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(project.config().unwrap(), before);
    }

    #[test]
    fn test_run_dir_per_profile() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let default_dir = project.run_dir("tap-mock", "default");
        let prod_dir = project.run_dir("tap-mock", "prod");
        assert!(default_dir.ends_with(".conduit/run/tap-mock"));
        assert!(prod_dir.ends_with(".conduit/run/tap-mock/prod"));
    }
}
