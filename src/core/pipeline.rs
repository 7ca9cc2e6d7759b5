//! Remote pipeline orchestration: trigger or reuse an execution on a
//! third-party CI system, reconcile synchronous and fire-and-forget modes,
//! poll under a deadline, and record the result in output parameters.
//!
//! The command depends only on the capability traits below; concrete
//! backends (GitLab, Jenkins, ...) implement them behind their own wire
//! protocols.

use std::collections::BTreeMap;

use serde_yml::Value;

use crate::core::command::{ExecutionCommand, Outcome};
use crate::core::context::ExecutionContext;
use crate::core::error::Result;
use crate::core::info::{ExecutionInfo, ExecutionStatus};
use crate::core::retry::{self, RetryPolicy};

pub const DEFAULT_RETRY_TIMEOUT_SECONDS: u64 = 180;
pub const DEFAULT_RETRY_WAIT_SECONDS: u64 = 1;
pub const DEFAULT_WAIT_SECONDS: u64 = 5;

/// How a new execution is started on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerKind {
    /// Create the execution through the backend's regular (authenticated) API.
    #[default]
    CreatePipeline,
    /// Start it through a backend-specific trigger token.
    TriggerPipeline,
}

/// Selector for reusing an execution instead of starting a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingPipeline {
    /// The most recently created execution, as ordered by the backend.
    Latest,
    /// A backend-native execution id.
    Id(String),
}

impl std::fmt::Display for ExistingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExistingPipeline::Latest => f.write_str("latest"),
            ExistingPipeline::Id(id) => f.write_str(id),
        }
    }
}

/// Everything a backend needs to locate or start an execution.
#[derive(Debug, Clone, Default)]
pub struct PipelineTarget {
    pub path: String,
    pub branch: Option<String>,
    pub variables: BTreeMap<String, String>,
    pub trigger_kind: TriggerKind,
}

/// Result of one backend-connection probe. Transient unavailability is a
/// value, so the retry condition decides whether to keep probing instead
/// of an exception-type allowlist.
pub enum ConnectAttempt {
    Connected(Box<dyn PipelineBackend>),
    Unavailable(String),
}

/// Builds backend clients from context configuration.
pub trait PipelineConnector {
    /// Key of the credential block under `systems.<name>`.
    fn system(&self) -> &str;

    /// Context paths that must be present before connecting.
    fn required_params(&self) -> Vec<String>;

    /// Poll deadline applied when `params.timeout_seconds` is absent.
    fn default_timeout_seconds(&self) -> u64 {
        1800
    }

    /// Probe the backend and build a client. Fatal problems (bad
    /// credentials, unknown deployment) are errors; a backend that may
    /// come back shortly is `ConnectAttempt::Unavailable`.
    fn connect(&self, context: &ExecutionContext) -> Result<ConnectAttempt>;
}

/// Minimal operation set a remote CI system must expose to be orchestrated.
pub trait PipelineBackend {
    fn trigger(&self, target: &PipelineTarget) -> Result<ExecutionInfo>;
    fn find_execution(
        &self,
        target: &PipelineTarget,
        selector: &ExistingPipeline,
    ) -> Result<ExecutionInfo>;
    fn refresh(&self, target: &PipelineTarget, info: &ExecutionInfo) -> Result<ExecutionInfo>;
}

/// Pluggable importer for whatever "artifacts" means on a given platform
/// (build logs, files, structured JSON).
pub trait PipelineDataImporter {
    fn import_pipeline_data(
        &mut self,
        context: &mut ExecutionContext,
        info: &ExecutionInfo,
    ) -> Result<()>;
}

/// Poll the backend until the execution reaches a terminal status or the
/// deadline elapses; the last fetched snapshot is returned either way.
pub fn wait_until_terminal(
    backend: &dyn PipelineBackend,
    target: &PipelineTarget,
    info: &ExecutionInfo,
    policy: RetryPolicy,
) -> Result<ExecutionInfo> {
    retry::execute(policy, || backend.refresh(target, info), ExecutionInfo::is_terminal)
}

/// Parameters parsed during validation. Extensions receive the command
/// mutably and may rewrite any of these before the body runs.
#[derive(Debug, Clone)]
pub struct RunPipelineParams {
    pub target: PipelineTarget,
    pub use_existing: Option<ExistingPipeline>,
    pub timeout_seconds: u64,
    pub wait_seconds: u64,
    pub retry_policy: RetryPolicy,
    pub import_artifacts: bool,
}

impl Default for RunPipelineParams {
    fn default() -> Self {
        Self {
            target: PipelineTarget::default(),
            use_existing: None,
            timeout_seconds: 0,
            wait_seconds: DEFAULT_WAIT_SECONDS,
            retry_policy: RetryPolicy::new(DEFAULT_RETRY_TIMEOUT_SECONDS, DEFAULT_RETRY_WAIT_SECONDS),
            import_artifacts: false,
        }
    }
}

pub struct RunPipelineCommand {
    context: ExecutionContext,
    connector: Box<dyn PipelineConnector>,
    data_importer: Option<Box<dyn PipelineDataImporter>>,
    pub params: RunPipelineParams,
}

impl RunPipelineCommand {
    pub fn new(context: ExecutionContext, connector: Box<dyn PipelineConnector>) -> Self {
        Self {
            context,
            connector,
            data_importer: None,
            params: RunPipelineParams::default(),
        }
    }

    pub fn with_data_importer(mut self, importer: Box<dyn PipelineDataImporter>) -> Self {
        self.data_importer = Some(importer);
        self
    }

    fn parse_params(&mut self) -> Result<()> {
        let ctx = &self.context;
        let mut params = RunPipelineParams {
            timeout_seconds: ctx
                .input_i64("params.timeout_seconds")?
                .map(non_negative("params.timeout_seconds"))
                .transpose()?
                .unwrap_or_else(|| self.connector.default_timeout_seconds()),
            wait_seconds: ctx
                .input_i64("params.wait_seconds")?
                .map(non_negative("params.wait_seconds"))
                .transpose()?
                .unwrap_or(DEFAULT_WAIT_SECONDS),
            import_artifacts: ctx.input_bool("params.import_artifacts")?.unwrap_or(false),
            ..RunPipelineParams::default()
        };

        params.retry_policy = RetryPolicy::new(
            ctx.input_i64("params.retry_timeout_seconds")?
                .map(non_negative("params.retry_timeout_seconds"))
                .transpose()?
                .unwrap_or(DEFAULT_RETRY_TIMEOUT_SECONDS),
            ctx.input_i64("params.retry_wait_seconds")?
                .map(non_negative("params.retry_wait_seconds"))
                .transpose()?
                .unwrap_or(DEFAULT_RETRY_WAIT_SECONDS),
        );

        params.target.path = ctx.input_str("params.pipeline_path").unwrap_or_default();
        params.target.branch = ctx.input_str("params.pipeline_branch").filter(|b| !b.is_empty());
        params.target.trigger_kind = match ctx.input_str("params.trigger_type").as_deref() {
            None | Some("CREATE_PIPELINE") => TriggerKind::CreatePipeline,
            Some("TRIGGER_PIPELINE") => TriggerKind::TriggerPipeline,
            Some(other) => {
                return Err(crate::core::error::Error::validation_invalid_parameter(
                    "params.trigger_type",
                    format!("unknown trigger type '{}'", other),
                ))
            }
        };
        if let Some(Value::Mapping(map)) = ctx.input_param_get("params.pipeline_params") {
            for (key, value) in map {
                if let (Some(key), Some(value)) = (key.as_str(), scalar_str(value)) {
                    params.target.variables.insert(key.to_string(), value);
                }
            }
        }

        params.use_existing = ctx
            .input_str("params.use_existing_pipeline")
            .filter(|v| !v.is_empty())
            .map(|v| {
                if v.eq_ignore_ascii_case("latest") {
                    ExistingPipeline::Latest
                } else {
                    ExistingPipeline::Id(v)
                }
            });

        self.params = params;
        Ok(())
    }

    /// Connect to the backend, retrying transient unavailability under the
    /// client retry policy. Fatal connect errors propagate immediately.
    fn connect_backend(&self) -> Result<std::result::Result<Box<dyn PipelineBackend>, String>> {
        let attempt = retry::execute(
            self.params.retry_policy,
            || self.connector.connect(&self.context),
            |attempt| matches!(attempt, ConnectAttempt::Connected(_)),
        )?;
        Ok(match attempt {
            ConnectAttempt::Connected(backend) => Ok(backend),
            ConnectAttempt::Unavailable(reason) => Err(reason),
        })
    }

    fn resolve_execution(&self, backend: &dyn PipelineBackend) -> Result<ExecutionInfo> {
        let logger = self.context.logger();
        match &self.params.use_existing {
            Some(selector) => {
                logger.info(format!(
                    "Reusing existing pipeline '{}' in '{}'",
                    selector, self.params.target.path
                ));
                backend.find_execution(&self.params.target, selector)
            }
            None => {
                logger.info(format!("Triggering pipeline in '{}'", self.params.target.path));
                backend.trigger(&self.params.target)
            }
        }
    }

    /// Record execution metadata in output params. Called on the success,
    /// failure and async paths alike so downstream jobs can always see
    /// what ran, where, and how it ended.
    fn save_execution_info(&mut self, info: &ExecutionInfo) -> Result<()> {
        self.context.output_param_set("params.build.url", Value::from(info.url.clone()));
        self.context.output_param_set("params.build.id", Value::from(info.id.clone()));
        self.context
            .output_param_set("params.build.status", Value::from(info.status.as_str()));
        self.context.output_param_set("params.build.date", Value::from(info.date_str()));
        self.context
            .output_param_set("params.build.duration", Value::from(info.duration_str()));
        self.context.output_param_set("params.build.name", Value::from(info.name.clone()));
        self.context.output_params_save()
    }
}

impl ExecutionCommand for RunPipelineCommand {
    fn name(&self) -> &str {
        "run-pipeline"
    }

    fn context(&self) -> &ExecutionContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    fn validate(&mut self) -> Result<bool> {
        let mut names = vec![
            "paths.input.params".to_string(),
            "paths.output.params".to_string(),
            "params.pipeline_path".to_string(),
        ];
        names.extend(self.connector.required_params());
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        if !self.context.validate(&name_refs) {
            return Ok(false);
        }

        if let Err(e) = self.parse_params() {
            self.context.logger().error(e.message);
            return Ok(false);
        }
        Ok(true)
    }

    fn execute(&mut self) -> Result<Outcome> {
        let backend = match self.connect_backend()? {
            Ok(backend) => backend,
            Err(reason) => {
                return Ok(Outcome::stop_failure(format!(
                    "Backend '{}' is unavailable: {}",
                    self.connector.system(),
                    reason
                )))
            }
        };

        let info = self.resolve_execution(backend.as_ref())?;
        self.context
            .logger()
            .info(format!("Pipeline execution: id={}, status={}", info.id, info.status));

        if self.params.timeout_seconds == 0 {
            self.context.logger().info("Pipeline was started in asynchronous mode");
            self.save_execution_info(&info)?;
            return Ok(Outcome::Done);
        }

        let final_info = if info.is_terminal() {
            info
        } else {
            wait_until_terminal(
                backend.as_ref(),
                &self.params.target,
                &info,
                RetryPolicy::new(self.params.timeout_seconds, self.params.wait_seconds),
            )?
        };
        self.save_execution_info(&final_info)?;

        if final_info.status != ExecutionStatus::Success {
            return Ok(Outcome::stop_failure(format!(
                "Pipeline finished with status {}",
                final_info.status
            )));
        }

        if self.params.import_artifacts {
            if let Some(importer) = self.data_importer.as_mut() {
                importer.import_pipeline_data(&mut self.context, &final_info)?;
            }
        }

        Ok(Outcome::Done)
    }
}

fn non_negative(param: &'static str) -> impl Fn(i64) -> Result<u64> {
    move |value| {
        u64::try_from(value).map_err(|_| {
            crate::core::error::Error::validation_invalid_parameter(param, "must not be negative")
        })
    }
}

fn scalar_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
