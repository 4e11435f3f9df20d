//! Extract-load-transform pipeline contexts

use conduit_plugin::{PluginType, TransformMode, DEFAULT_PROFILE};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::invocation::{InvocationContext, InvocationContextBuilder, LogSink};
use crate::job::JobId;
use crate::registry::{PluginRegistry, ResolvedPlugin};
use crate::{ConduitError, ConduitResult};

/// Produces the identifier of each new job
pub type JobIdGenerator = Arc<dyn Fn() -> JobId + Send + Sync>;

/// Every process of one pipeline run, bound to a single job
#[derive(Debug, Clone)]
pub struct EltContext {
    job_id: JobId,
    pub job_dir: PathBuf,
    pub transform: TransformMode,
    pub extractor: InvocationContext,
    pub loader: InvocationContext,
    pub transformer: Option<InvocationContext>,
}

impl EltContext {
    /// Fixed for the lifetime of the context
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Pipeline description, e.g. `tap-mock:target-mock@prod`
    pub fn elt_uri(&self) -> String {
        format!("{}:{}", self.extractor.name(), self.loader.name())
    }

    /// Contexts that run, in execution order
    ///
    /// `only` runs the transformer alone.
    pub fn contexts(&self) -> impl Iterator<Item = &InvocationContext> {
        let extract_load = self.transform != TransformMode::Only;
        [
            Some(&self.extractor).filter(|_| extract_load),
            Some(&self.loader).filter(|_| extract_load),
            self.transformer.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Builds pipeline contexts; a pipeline is either fully resolved or not
/// built at all
#[derive(Clone)]
pub struct EltContextBuilder {
    registry: PluginRegistry,
    invocation: InvocationContextBuilder,
    job_ids: JobIdGenerator,
}

impl EltContextBuilder {
    pub fn new(registry: PluginRegistry, invocation: InvocationContextBuilder) -> Self {
        Self {
            registry,
            invocation,
            job_ids: Arc::new(JobId::new),
        }
    }

    /// Replace the job identifier source
    pub fn with_job_ids(mut self, job_ids: JobIdGenerator) -> Self {
        self.job_ids = job_ids;
        self
    }

    /// Resolve the extractor, loader and, depending on `transform`, the
    /// transformer, then bind them to a new job
    ///
    /// Any failure aborts before a job identifier is allocated.
    pub fn build(
        &self,
        extractor: &str,
        loader: &str,
        transform: TransformMode,
    ) -> ConduitResult<EltContext> {
        let extractor = self.registry.find(extractor, Some(PluginType::Extractor))?;
        let loader = self.registry.find(loader, Some(PluginType::Loader))?;
        let transformer = self.transformer_for(&extractor, transform)?;

        let extractor_context = self.invocation.build(&extractor)?;
        let loader_context = self.invocation.build(&loader)?;
        let transformer_context = match &transformer {
            Some(plugin) => Some(self.invocation.build(plugin)?),
            None => None,
        };

        let job_id = (self.job_ids)();
        let job_dir = self.registry.project().job_dir(&job_id);
        let log = |role: &str, extension: &str| {
            LogSink::File(job_dir.join(format!("{role}.{extension}")))
        };

        let extractor_context = extractor_context
            .bind_job(&job_id)
            .with_stdout(LogSink::Pipe)
            .with_stderr(log("extractor", "log"));
        let loader_context = loader_context
            .bind_job(&job_id)
            .with_stdout(log("state", "out"))
            .with_stderr(log("loader", "log"));

        let transformer_context = transformer_context.map(|context| {
            let namespace = extractor.install.namespace.clone();
            let mut context = context
                .bind_job(&job_id)
                .with_args(["run", "--models", namespace.as_str()])
                .with_stdout(log("transformer", "out"))
                .with_stderr(log("transformer", "log"));

            context.env.extend(self.invocation.settings().resolve_all(&loader).to_env());
            context.set_tool_env("EXTRACTOR_NAMESPACE", namespace);
            context
        });

        let context = EltContext {
            job_id,
            job_dir,
            transform,
            extractor: extractor_context,
            loader: loader_context,
            transformer: transformer_context,
        };

        info!(
            "Built pipeline {} ({}) as job {}",
            context.elt_uri(),
            transform,
            context.job_id
        );
        Ok(context)
    }

    fn transformer_for(
        &self,
        extractor: &ResolvedPlugin,
        transform: TransformMode,
    ) -> ConduitResult<Option<ResolvedPlugin>> {
        if transform == TransformMode::Skip {
            return Ok(None);
        }

        let namespace = &extractor.install.namespace;
        let package = self
            .registry
            .find_by_namespace(PluginType::Transform, namespace)
            .ok();

        let package = match (package, transform) {
            (Some(package), _) => package,
            (None, TransformMode::Only) => {
                return Err(ConduitError::IncompatiblePipeline(format!(
                    "no transform is installed for namespace '{namespace}' of {}",
                    extractor.plugin_ref()
                )))
            }
            (None, _) => {
                debug!("No transform for '{}', skipping transformation", namespace);
                return Ok(None);
            }
        };

        let transformers = self.registry.list(Some(PluginType::Transformer))?;
        let count = transformers.len();
        let mut transformers = transformers.into_iter();
        let transformer = match (transformers.next(), transformers.next()) {
            (Some(transformer), None) => transformer,
            _ => {
                return Err(ConduitError::IncompatiblePipeline(format!(
                    "{} needs exactly one transformer, {} installed",
                    package.plugin_ref(),
                    count
                )))
            }
        };

        Ok(Some(self.registry.resolve(&transformer.plugin_ref(), DEFAULT_PROFILE)?))
    }
}
