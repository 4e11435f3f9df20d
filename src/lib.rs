//! Conduit Library
//!
//! Manages the data-integration plugins installed into a project, resolves
//! their layered settings, and prepares plugin processes and ELT pipelines
//! for execution.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod elt;
pub mod invocation;
pub mod invoker;
pub mod job;
pub mod project;
pub mod registry;
pub mod schedule;
pub mod settings;
pub mod utils;

pub use config::{ProjectConfig, ToolConfig};
pub use discovery::DiscoveryService;
pub use elt::{EltContext, EltContextBuilder};
pub use invocation::{ConfigFile, InvocationContext, InvocationContextBuilder, LogSink};
pub use invoker::{EltRunner, Invoker, ProcessInvoker};
pub use job::{JobId, JobLoggingService, JobRecord, JobState};
pub use project::Project;
pub use registry::{PluginList, PluginRegistry, ResolvedPlugin};
pub use schedule::{Schedule, ScheduleList, ScheduleService};
pub use settings::{
    EnvSource, ProcessEnv, ResolvedSetting, ResolvedSettings, SettingListing, SettingSource,
    SettingsResolver,
};

pub use conduit_catalog::{Catalog, CatalogError, PluginDefinition};
pub use conduit_plugin::{
    ConfigFormat, PluginError, PluginInstall, PluginName, PluginRef, PluginType, Profile,
    SettingDefinition, SettingKind, TransformMode, DEFAULT_PROFILE,
};
pub use conduit_state::StateError;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Main application context that wires the services of one project
#[derive(Clone)]
pub struct Conduit {
    project: Project,
    catalog: Arc<Catalog>,
    registry: PluginRegistry,
    settings: SettingsResolver,
}

impl Conduit {
    /// Open a project, loading its catalog and reading settings overrides
    /// from the process environment
    pub fn open(project: Project) -> ConduitResult<Self> {
        let catalog = DiscoveryService::new(project.clone()).load()?;
        Ok(Self::with_parts(project, catalog, Arc::new(ProcessEnv)))
    }

    /// Assemble the context from an already loaded catalog and environment
    pub fn with_parts(project: Project, catalog: Catalog, env: Arc<dyn EnvSource>) -> Self {
        let catalog = Arc::new(catalog);
        let registry = PluginRegistry::new(project.clone());
        let settings = SettingsResolver::new(registry.clone(), Arc::clone(&catalog), env);

        Self {
            project,
            catalog,
            registry,
            settings,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SettingsResolver {
        &self.settings
    }

    pub fn schedules(&self) -> ScheduleService {
        ScheduleService::new(self.project.clone(), self.settings.clone())
    }

    pub fn invocation_builder(&self) -> ConduitResult<InvocationContextBuilder> {
        InvocationContextBuilder::new(self.project.clone(), self.settings.clone())
    }

    pub fn elt_builder(&self) -> ConduitResult<EltContextBuilder> {
        Ok(EltContextBuilder::new(
            self.registry.clone(),
            self.invocation_builder()?,
        ))
    }

    pub fn jobs(&self) -> JobLoggingService {
        JobLoggingService::new(self.project.clone())
    }

    /// Install a catalog plugin into the project
    ///
    /// The catalog definition seeds the installed plugin's settings schema
    /// and capabilities.
    pub fn add_plugin(&self, plugin_type: PluginType, name: &str) -> ConduitResult<PluginInstall> {
        let definition = self.catalog.lookup(plugin_type, name)?;
        let install = self.registry.add(definition.to_install())?;
        info!("Added {} to {:?}", install.plugin_ref(), self.project.root());
        Ok(install)
    }

    /// Uninstall a plugin from the project
    pub fn remove_plugin(&self, plugin_ref: &PluginRef) -> ConduitResult<PluginInstall> {
        let removed = self.registry.remove(plugin_ref)?;
        info!("Removed {} from {:?}", plugin_ref, self.project.root());
        Ok(removed)
    }
}

/// Application error types
#[derive(thiserror::Error, Debug)]
pub enum ConduitError {
    #[error("{plugin} is already installed; update it instead")]
    DuplicatePlugin { plugin: PluginRef },

    #[error("{kind} '{name}' is not installed")]
    PluginNotFound { kind: String, name: String },

    #[error(
        "Plugin name '{name}' is ambiguous, installed as: {}; specify a plugin type",
        .types.join(", ")
    )]
    AmbiguousPlugin { name: String, types: Vec<String> },

    #[error("Setting '{setting}' of '{plugin}' is required but has no value")]
    MissingRequiredSetting { plugin: String, setting: String },

    #[error("Schedule '{0}' already exists")]
    DuplicateSchedule(String),

    #[error("Schedule '{0}' does not exist")]
    ScheduleNotFound(String),

    #[error("Incompatible pipeline: {0}")]
    IncompatiblePipeline(String),

    #[error("Invalid schedule interval '{interval}': {reason}")]
    InvalidInterval { interval: String, reason: String },

    #[error("No conduit project found in {0:?} or any parent directory")]
    ProjectNotFound(PathBuf),

    #[error("A conduit project already exists in {0:?}")]
    ProjectExists(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{plugin} exited with {status}")]
    PluginFailed { plugin: String, status: String },

    #[error("Job {0} was cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ConduitError {
    pub(crate) fn plugin_not_found(name: &str, plugin_type: Option<PluginType>) -> Self {
        ConduitError::PluginNotFound {
            kind: plugin_type
                .map(|t| t.descriptor().to_string())
                .unwrap_or_else(|| "Plugin".to_string()),
            name: name.to_string(),
        }
    }
}

/// Result type for the main application
pub type ConduitResult<T> = Result<T, ConduitError>;
