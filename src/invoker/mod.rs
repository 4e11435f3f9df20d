//! Spawning plugin processes from prepared contexts

use async_trait::async_trait;
use conduit_plugin::TransformMode;
use std::fs::OpenOptions;
use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::elt::EltContext;
use crate::invocation::{InvocationContext, LogSink};
use crate::job::{JobLoggingService, JobRecord, JobState};
use crate::utils::format_duration;
use crate::{ConduitError, ConduitResult};

/// Runs a single prepared plugin process to completion
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, context: &InvocationContext) -> ConduitResult<ExitStatus>;
}

/// Invoker backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    /// Command for `context`, with a cleared environment and the context's sinks
    pub fn command(context: &InvocationContext, stdin: Stdio) -> ConduitResult<Command> {
        let mut command = Command::new(&context.executable);
        command
            .args(&context.args)
            .env_clear()
            .envs(&context.env)
            .current_dir(&context.working_dir)
            .stdin(stdin)
            .stdout(sink_stdio(&context.stdout)?)
            .stderr(sink_stdio(&context.stderr)?)
            .kill_on_drop(true);
        Ok(command)
    }

    /// Materialize the context and start its process
    pub fn spawn(context: &InvocationContext, stdin: Stdio) -> ConduitResult<Child> {
        context.materialize()?;
        debug!("Spawning {:?}", context.command_line());

        let child = Self::command(context, stdin)?.spawn()?;
        info!("Started {} (pid {:?})", context.name(), child.id());
        Ok(child)
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, context: &InvocationContext) -> ConduitResult<ExitStatus> {
        let child = Self::spawn(context, Stdio::inherit())?;
        let output = child.wait_with_output().await?;
        Ok(output.status)
    }
}

fn sink_stdio(sink: &LogSink) -> ConduitResult<Stdio> {
    Ok(match sink {
        LogSink::Inherit => Stdio::inherit(),
        LogSink::Pipe => Stdio::piped(),
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Stdio::from(file)
        }
    })
}

fn check_status(context: &InvocationContext, status: ExitStatus) -> ConduitResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(ConduitError::PluginFailed {
            plugin: context.name().to_string(),
            status: status.to_string(),
        })
    }
}

fn cancelled(context: &EltContext) -> ConduitError {
    ConduitError::Cancelled(context.job_id().to_string())
}

async fn terminate(context: &InvocationContext, child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("Failed to stop {}: {}", context.name(), e);
    }
}

/// Runs pipeline contexts and records their jobs
#[derive(Debug, Clone)]
pub struct EltRunner {
    jobs: JobLoggingService,
}

impl EltRunner {
    pub fn new(jobs: JobLoggingService) -> Self {
        Self { jobs }
    }

    /// Run the pipeline, stopping every process of the job on Ctrl-C
    pub async fn run(&self, context: &EltContext) -> ConduitResult<JobRecord> {
        self.run_until(context, async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the pipeline until it finishes or `shutdown` resolves
    ///
    /// The job record reflects the outcome; the returned error is the one
    /// that ended the run.
    pub async fn run_until<F>(&self, context: &EltContext, shutdown: F) -> ConduitResult<JobRecord>
    where
        F: Future<Output = ()>,
    {
        let job_id = context.job_id();
        self.jobs.start(job_id, &context.elt_uri())?;

        let started = Instant::now();
        let outcome = self.execute(context, shutdown).await;
        let (state, error) = match &outcome {
            Ok(()) => (JobState::Success, None),
            Err(ConduitError::Cancelled(_)) => (JobState::Cancelled, None),
            Err(e) => (JobState::Failed, Some(e.to_string())),
        };

        let record = self.jobs.finish(job_id, state, error)?;
        info!(
            "Job {} ended {:?} after {}",
            job_id,
            record.state,
            format_duration(started.elapsed())
        );
        outcome.map(|_| record)
    }

    async fn execute<F>(&self, context: &EltContext, shutdown: F) -> ConduitResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if context.transform == TransformMode::Only {
            debug!("Skipping extract and load for job {}", context.job_id());
        } else {
            self.extract_load(context, &mut shutdown).await?;
        }

        match &context.transformer {
            Some(transformer) => self.transform(context, transformer, &mut shutdown).await,
            None => Ok(()),
        }
    }

    async fn extract_load<F>(
        &self,
        context: &EltContext,
        shutdown: &mut Pin<&mut F>,
    ) -> ConduitResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut extractor = ProcessInvoker::spawn(&context.extractor, Stdio::null())?;
        let mut loader = match ProcessInvoker::spawn(&context.loader, Stdio::piped()) {
            Ok(loader) => loader,
            Err(e) => {
                terminate(&context.extractor, &mut extractor).await;
                return Err(e);
            }
        };

        let pump = match (extractor.stdout.take(), loader.stdin.take()) {
            (Some(mut source), Some(mut sink)) => Some(tokio::spawn(async move {
                tokio::io::copy(&mut source, &mut sink).await
            })),
            _ => None,
        };

        let statuses = tokio::select! {
            result = async {
                Ok::<_, ConduitError>((extractor.wait().await?, loader.wait().await?))
            } => Some(result),
            _ = shutdown.as_mut() => None,
        };

        let (extractor_status, loader_status) = match statuses {
            Some(result) => result?,
            None => {
                warn!("Cancelling job {}", context.job_id());
                terminate(&context.extractor, &mut extractor).await;
                terminate(&context.loader, &mut loader).await;
                return Err(cancelled(context));
            }
        };

        if let Some(pump) = pump {
            match pump.await {
                Ok(Ok(bytes)) => debug!("Streamed {} bytes from extractor to loader", bytes),
                Ok(Err(e)) => warn!("Streaming to the loader stopped early: {}", e),
                Err(e) => warn!("Streaming task failed: {}", e),
            }
        }

        check_status(&context.extractor, extractor_status)?;
        check_status(&context.loader, loader_status)?;
        self.save_state(context)
    }

    async fn transform<F>(
        &self,
        context: &EltContext,
        transformer: &InvocationContext,
        shutdown: &mut Pin<&mut F>,
    ) -> ConduitResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut child = ProcessInvoker::spawn(transformer, Stdio::null())?;
        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = shutdown.as_mut() => None,
        };

        match status {
            Some(status) => check_status(transformer, status),
            None => {
                terminate(transformer, &mut child).await;
                Err(cancelled(context))
            }
        }
    }

    /// Keep the loader's last state message for the extractor's next run
    fn save_state(&self, context: &EltContext) -> ConduitResult<()> {
        let LogSink::File(output) = &context.loader.stdout else {
            return Ok(());
        };
        if !output.is_file() {
            return Ok(());
        }

        let content = std::fs::read_to_string(output)?;
        let Some(line) = content.lines().rev().find(|line| !line.trim().is_empty()) else {
            return Ok(());
        };

        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(state) => {
                let path = context.extractor.state_path();
                std::fs::write(&path, serde_json::to_string_pretty(&state)?)?;
                info!("Saved state for {} to {:?}", context.extractor.name(), path);
            }
            Err(e) => warn!("Ignoring invalid state message from the loader: {}", e),
        }

        Ok(())
    }
}
