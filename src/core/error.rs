use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ContextInvalidDocument,

    ValidationMissingParameter,
    ValidationInvalidParameter,

    BackendUnavailable,
    BackendAuthFailed,
    BackendRequestFailed,

    PipelineNotFound,

    InternalIoError,
    InternalYamlError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ContextInvalidDocument => "context.invalid_document",

            ErrorCode::ValidationMissingParameter => "validation.missing_parameter",
            ErrorCode::ValidationInvalidParameter => "validation.invalid_parameter",

            ErrorCode::BackendUnavailable => "backend.unavailable",
            ErrorCode::BackendAuthFailed => "backend.auth_failed",
            ErrorCode::BackendRequestFailed => "backend.request_failed",

            ErrorCode::PipelineNotFound => "pipeline.not_found",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalYamlError => "internal.yaml_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    /// Whether a retry loop may reasonably re-attempt the failed operation.
    /// `None` means the classification is unknown to the error site.
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn context_invalid_document(path: impl Into<String>, problem: impl Into<String>) -> Self {
        let path = path.into();
        let problem = problem.into();
        Self::new(
            ErrorCode::ContextInvalidDocument,
            format!("Invalid context document '{}': {}", path, problem),
            json!({ "path": path, "problem": problem }),
        )
    }

    pub fn validation_missing_parameter(param: impl Into<String>) -> Self {
        let param = param.into();
        Self::new(
            ErrorCode::ValidationMissingParameter,
            format!("Parameter '{}' is mandatory", param),
            json!({ "parameter": param }),
        )
    }

    pub fn validation_invalid_parameter(param: impl Into<String>, problem: impl Into<String>) -> Self {
        let param = param.into();
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidParameter,
            format!("Parameter '{}' is invalid: {}", param, problem),
            json!({ "parameter": param, "problem": problem }),
        )
    }

    pub fn backend_unavailable(system: impl Into<String>, reason: impl Into<String>) -> Self {
        let system = system.into();
        let reason = reason.into();
        Self::new(
            ErrorCode::BackendUnavailable,
            format!("Backend '{}' is unavailable: {}", system, reason),
            json!({ "system": system, "reason": reason }),
        )
        .with_retryable(true)
    }

    pub fn backend_auth_failed(system: impl Into<String>, status: u16) -> Self {
        let system = system.into();
        Self::new(
            ErrorCode::BackendAuthFailed,
            format!("Authentication against '{}' failed: HTTP {}", system, status),
            json!({ "system": system, "status": status }),
        )
        .with_retryable(false)
    }

    pub fn backend_request_failed(status: u16, body: &str) -> Self {
        Self::new(
            ErrorCode::BackendRequestFailed,
            format!("Backend request failed: HTTP {}", status),
            json!({ "status": status, "body": body }),
        )
        .with_retryable(status >= 500)
    }

    pub fn backend_transport(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::BackendRequestFailed,
            format!("Backend request failed: {}", error),
            json!({ "error": error }),
        )
        .with_retryable(true)
    }

    pub fn pipeline_not_found(path: impl Into<String>, selector: impl Into<String>) -> Self {
        let path = path.into();
        let selector = selector.into();
        Self::new(
            ErrorCode::PipelineNotFound,
            format!("No pipeline matching '{}' found in '{}'", selector, path),
            json!({ "path": path, "selector": selector }),
        )
        .with_retryable(false)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalIoError,
            format!("IO error: {}", error),
            json!({ "error": error, "context": context }),
        )
    }

    pub fn internal_yaml(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalYamlError,
            format!("YAML error: {}", error),
            json!({ "error": error, "context": context }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalJsonError,
            format!("JSON error: {}", error),
            json!({ "error": error, "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(ErrorCode::InternalUnexpected, error.clone(), json!({ "error": error }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_message_names_the_path() {
        let err = Error::validation_missing_parameter("systems.gitlab.password");
        assert_eq!(err.code.as_str(), "validation.missing_parameter");
        assert_eq!(err.message, "Parameter 'systems.gitlab.password' is mandatory");
    }

    #[test]
    fn request_failures_classify_retryability_by_status() {
        assert_eq!(Error::backend_request_failed(503, "").retryable, Some(true));
        assert_eq!(Error::backend_request_failed(400, "").retryable, Some(false));
    }

    #[test]
    fn hints_accumulate() {
        let err = Error::pipeline_not_found("group/repo", "latest")
            .with_hint("Check that the project has at least one pipeline");
        assert_eq!(err.hints.len(), 1);
    }
}
