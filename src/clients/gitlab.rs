//! GitLab backend client.
//!
//! Implements the pipeline capability traits over the GitLab REST API with
//! a blocking HTTP client. Configuration comes from the `systems.gitlab`
//! block: `url` (defaults to gitlab.com), `password` (a private token) and,
//! for the trigger-token sub-mode, `trigger_token`.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};

use crate::core::context::ExecutionContext;
use crate::core::error::{Error, Result};
use crate::core::info::{ExecutionInfo, ExecutionStatus};
use crate::core::pipeline::{
    ConnectAttempt, ExistingPipeline, PipelineBackend, PipelineConnector, PipelineTarget,
    TriggerKind,
};

pub const DEFAULT_URL: &str = "https://gitlab.com";

pub struct GitlabConnector;

impl GitlabConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GitlabConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConnector for GitlabConnector {
    fn system(&self) -> &str {
        "gitlab"
    }

    fn required_params(&self) -> Vec<String> {
        vec!["systems.gitlab.password".to_string()]
    }

    fn connect(&self, context: &ExecutionContext) -> Result<ConnectAttempt> {
        let base_url = context
            .input_str("systems.gitlab.url")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let token = context.input_str("systems.gitlab.password").unwrap_or_default();
        let trigger_token = context
            .input_str("systems.gitlab.trigger_token")
            .filter(|t| !t.is_empty());

        let client = GitlabClient::new(base_url, token, trigger_token);
        match client.probe() {
            Ok(version) => {
                context
                    .logger()
                    .debug(format!("Connected to GitLab {} at {}", version, client.base_url));
                Ok(ConnectAttempt::Connected(Box::new(client)))
            }
            Err(e) if e.retryable == Some(true) => Ok(ConnectAttempt::Unavailable(e.message)),
            Err(e) => Err(e),
        }
    }
}

pub struct GitlabClient {
    http: Client,
    base_url: String,
    token: String,
    trigger_token: Option<String>,
}

impl GitlabClient {
    pub fn new(base_url: String, token: String, trigger_token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            trigger_token,
        }
    }

    /// Contact the deployment to verify reachability and credentials.
    fn probe(&self) -> Result<String> {
        let value = self.get("/version")?;
        Ok(value
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v4{}", self.base_url, endpoint)
    }

    fn get(&self, endpoint: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.url(endpoint))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .map_err(|e| Error::backend_transport(e.to_string()))?;
        parse_json_response("gitlab", response)
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.url(endpoint))
            .header("PRIVATE-TOKEN", &self.token)
            .json(body)
            .send()
            .map_err(|e| Error::backend_transport(e.to_string()))?;
        parse_json_response("gitlab", response)
    }

    fn post_form(&self, endpoint: &str, form: &[(String, String)]) -> Result<Value> {
        let response = self
            .http
            .post(self.url(endpoint))
            .form(form)
            .send()
            .map_err(|e| Error::backend_transport(e.to_string()))?;
        parse_json_response("gitlab", response)
    }

    fn default_branch(&self, project: &str) -> Result<String> {
        let value = self.get(&format!("/projects/{}", encode_path(project)))?;
        value
            .get("default_branch")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::validation_invalid_parameter(
                    "params.pipeline_branch",
                    format!("project '{}' has no default branch to fall back to", project),
                )
            })
    }

    fn resolve_ref(&self, target: &PipelineTarget) -> Result<String> {
        match &target.branch {
            Some(branch) => Ok(branch.clone()),
            None => self.default_branch(&target.path),
        }
    }
}

impl PipelineBackend for GitlabClient {
    fn trigger(&self, target: &PipelineTarget) -> Result<ExecutionInfo> {
        let git_ref = self.resolve_ref(target)?;
        let project = encode_path(&target.path);

        let value = match target.trigger_kind {
            TriggerKind::CreatePipeline => {
                let variables: Vec<Value> = target
                    .variables
                    .iter()
                    .map(|(key, value)| json!({ "key": key, "value": value }))
                    .collect();
                self.post(
                    &format!("/projects/{}/pipeline", project),
                    &json!({ "ref": git_ref, "variables": variables }),
                )?
            }
            TriggerKind::TriggerPipeline => {
                let token = self.trigger_token.clone().ok_or_else(|| {
                    Error::validation_missing_parameter("systems.gitlab.trigger_token")
                })?;
                let mut form = vec![("token".to_string(), token), ("ref".to_string(), git_ref)];
                for (key, value) in &target.variables {
                    form.push((format!("variables[{}]", key), value.clone()));
                }
                self.post_form(&format!("/projects/{}/trigger/pipeline", project), &form)?
            }
        };

        Ok(parse_pipeline(&value, &target.path))
    }

    fn find_execution(
        &self,
        target: &PipelineTarget,
        selector: &ExistingPipeline,
    ) -> Result<ExecutionInfo> {
        let project = encode_path(&target.path);
        let value = match selector {
            ExistingPipeline::Id(id) => self.get(&format!("/projects/{}/pipelines/{}", project, id))?,
            ExistingPipeline::Latest => {
                // The list endpoint orders by recency on the backend side;
                // the first entry is the newest pipeline.
                let list = self.get(&format!("/projects/{}/pipelines?per_page=1", project))?;
                list.as_array()
                    .and_then(|items| items.first())
                    .cloned()
                    .ok_or_else(|| Error::pipeline_not_found(&target.path, "latest"))?
            }
        };
        Ok(parse_pipeline(&value, &target.path))
    }

    fn refresh(&self, target: &PipelineTarget, info: &ExecutionInfo) -> Result<ExecutionInfo> {
        let value = self.get(&format!(
            "/projects/{}/pipelines/{}",
            encode_path(&target.path),
            info.id
        ))?;
        Ok(parse_pipeline(&value, &target.path))
    }
}

/// Percent-encode a `group/project` path for use as a path parameter.
fn encode_path(project: &str) -> String {
    project.replace('/', "%2F")
}

fn parse_json_response(system: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| Error::backend_transport(e.to_string()))?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::backend_auth_failed(system, status.as_u16()));
    }
    if !status.is_success() {
        return Err(Error::backend_request_failed(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| Error::internal_json(e.to_string(), Some("parse backend response".to_string())))
}

fn parse_pipeline(value: &Value, project_path: &str) -> ExecutionInfo {
    let id = match value.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let mut info = ExecutionInfo::new(id);
    info.url = value
        .get("web_url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    info.name = project_path.to_string();
    info.status = value
        .get("status")
        .and_then(Value::as_str)
        .map(ExecutionStatus::from_vendor)
        .unwrap_or(ExecutionStatus::NotStarted);
    info.time_start = parse_time(value, "started_at").or_else(|| parse_time(value, "created_at"));
    info.time_end = parse_time(value, "finished_at");
    info
}

fn parse_time(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}
