//! Everything a plugin process needs before it is spawned

use conduit_plugin::{ConfigFormat, PluginName, PluginRef, PluginType};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::tool::prefixed_env_var;
use crate::config::ToolConfig;
use crate::job::JobId;
use crate::project::Project;
use crate::registry::ResolvedPlugin;
use crate::settings::{SettingSource, SettingsResolver};
use crate::utils;
use crate::ConduitResult;

/// State file kept per extractor profile across runs
pub const STATE_FILE: &str = "state.json";

/// Where a process stream goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Shared with the parent process
    Inherit,
    /// Captured by the invoker, e.g. to feed another process
    Pipe,
    /// Appended to a file
    File(PathBuf),
}

/// A generated configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub format: ConfigFormat,
    pub content: String,
}

/// Prepared inputs of a single plugin process
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub plugin: PluginRef,
    pub profile: String,
    pub namespace: String,
    pub executable: String,
    pub args: Vec<String>,
    pub config_format: ConfigFormat,
    pub config_files: Vec<ConfigFile>,
    /// Complete environment of the process; nothing else is inherited
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    /// Generated files of this plugin profile
    pub run_dir: PathBuf,
    pub stdout: LogSink,
    pub stderr: LogSink,
    pub job_id: Option<JobId>,
    env_prefix: String,
}

impl InvocationContext {
    /// Qualified `name@profile` of the invoked plugin
    pub fn name(&self) -> PluginName {
        PluginName::new(&self.plugin.name, Some(self.profile.as_str()))
    }

    /// Executable followed by its arguments
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.executable.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_stdout(mut self, sink: LogSink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn with_stderr(mut self, sink: LogSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Set a variable the tool injects, e.g. `EXTRACTOR_NAMESPACE`
    pub fn set_tool_env(&mut self, name: &str, value: impl Into<String>) {
        self.env
            .insert(prefixed_env_var(&self.env_prefix, name), value.into());
    }

    /// Attach the context to a job
    pub fn bind_job(mut self, job_id: &JobId) -> Self {
        self.set_tool_env("JOB_ID", job_id.as_str());
        self.job_id = Some(job_id.clone());
        self
    }

    /// Where the extractor's state is kept between runs
    pub fn state_path(&self) -> PathBuf {
        self.run_dir.join(STATE_FILE)
    }

    /// Write generated config files and create sink directories
    pub fn materialize(&self) -> ConduitResult<()> {
        utils::ensure_directory(&self.run_dir)?;

        for file in &self.config_files {
            if let Some(parent) = file.path.parent() {
                utils::ensure_directory(parent)?;
            }
            fs::write(&file.path, &file.content)?;
            debug!("Wrote {:?}", file.path);
        }

        for sink in [&self.stdout, &self.stderr] {
            if let LogSink::File(path) = sink {
                if let Some(parent) = path.parent() {
                    utils::ensure_directory(parent)?;
                }
            }
        }

        Ok(())
    }
}

/// Builds invocation contexts for the plugins of one project
#[derive(Clone)]
pub struct InvocationContextBuilder {
    project: Project,
    settings: SettingsResolver,
    tool: ToolConfig,
}

impl InvocationContextBuilder {
    pub fn new(project: Project, settings: SettingsResolver) -> ConduitResult<Self> {
        let tool = project.config()?.settings;
        Ok(Self {
            project,
            settings,
            tool,
        })
    }

    pub fn settings(&self) -> &SettingsResolver {
        &self.settings
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Find a plugin by `name[@profile]` and build its context
    pub fn build_for_name(
        &self,
        name: &str,
        plugin_type: Option<PluginType>,
    ) -> ConduitResult<InvocationContext> {
        let plugin = self.settings.registry().find(name, plugin_type)?;
        self.build(&plugin)
    }

    /// Build a context bound to `job_id`
    pub fn build_for_job(
        &self,
        plugin: &ResolvedPlugin,
        job_id: &JobId,
    ) -> ConduitResult<InvocationContext> {
        Ok(self.build(plugin)?.bind_job(job_id))
    }

    /// Resolve settings strictly and prepare the plugin's process inputs
    ///
    /// Nothing is written to disk; see [`InvocationContext::materialize`].
    pub fn build(&self, plugin: &ResolvedPlugin) -> ConduitResult<InvocationContext> {
        let install = &plugin.install;
        let settings = self.settings.resolve_all(plugin);
        settings.require()?;

        let run_dir = self.project.run_dir(&install.name, plugin.profile_name());
        let config_format = install.config_format();
        let mut args = Vec::new();
        let mut config_files = Vec::new();

        if let Some(extension) = config_format.extension() {
            let config = settings.to_config(SettingSource::Fallback);
            let content = match config_format {
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
                _ => serde_yaml::to_string(&config)?,
            };
            let path = run_dir.join(format!(
                "{}.config.{}",
                utils::sanitize_filename(&install.name),
                extension
            ));

            args.push("--config".to_string());
            args.push(path.display().to_string());
            config_files.push(ConfigFile {
                path,
                format: config_format,
                content,
            });
        }

        if install.plugin_type == PluginType::Extractor {
            self.extractor_args(install, &run_dir, &mut args);
        }

        let mut env = BTreeMap::new();
        for name in &self.tool.passthrough_env {
            if let Some(value) = self.settings.env().var(name) {
                env.insert(name.clone(), value);
            }
        }
        env.extend(settings.to_env());

        let mut context = InvocationContext {
            plugin: install.plugin_ref(),
            profile: plugin.profile_name().to_string(),
            namespace: install.namespace.clone(),
            executable: install.executable().to_string(),
            args,
            config_format,
            config_files,
            env,
            working_dir: self.project.root().to_path_buf(),
            run_dir,
            stdout: LogSink::Inherit,
            stderr: LogSink::Inherit,
            job_id: None,
            env_prefix: self.tool.env_prefix.clone(),
        };
        context.set_tool_env("PROJECT_ROOT", self.project.root().display().to_string());

        info!("Prepared invocation of {}", context.name());
        Ok(context)
    }

    fn extractor_args(
        &self,
        install: &conduit_plugin::PluginInstall,
        run_dir: &Path,
        args: &mut Vec<String>,
    ) {
        let state = run_dir.join(STATE_FILE);
        if install.has_capability("state") && state.is_file() {
            args.push("--state".to_string());
            args.push(state.display().to_string());
        }

        let catalog = run_dir.join(format!(
            "{}.catalog.json",
            utils::sanitize_filename(&install.name)
        ));
        if catalog.is_file() {
            if install.has_capability("catalog") {
                args.push("--catalog".to_string());
                args.push(catalog.display().to_string());
            } else if install.has_capability("properties") {
                args.push("--properties".to_string());
                args.push(catalog.display().to_string());
            }
        }
    }
}
