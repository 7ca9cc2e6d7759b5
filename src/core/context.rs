//! Layered, path-addressable parameter store backing one command invocation.
//!
//! Two physical input layers (insecure and secure) merge into one logical
//! read view; the secure layer wins when both define the same path. Writes
//! go exclusively to the output document, so secrets are never echoed into
//! output artifacts. Paths are dot-separated strings; reading an absent
//! path yields `None`, never an error.

use crate::core::context_file::{self, ContextFile};
use crate::core::error::{Error, Result};
use crate::core::logger::ExecutionLogger;
use serde_yml::Value;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ExecutionContext {
    descriptor: ContextFile,
    input_params: ContextFile,
    input_params_secure: ContextFile,
    output_params: ContextFile,
    logger: ExecutionLogger,
    folder: Option<PathBuf>,
}

impl ExecutionContext {
    /// Build a context from an on-disk descriptor file. The descriptor's
    /// `paths.input.*` entries name the parameter documents to load; a
    /// missing or unreadable document becomes an empty layer.
    pub fn from_descriptor_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let descriptor = ContextFile::load(path);
        if descriptor.get_str("kind").as_deref() != Some(context_file::KIND_CONTEXT_DESCRIPTOR) {
            return Err(Error::context_invalid_document(
                path.display().to_string(),
                "not a context descriptor",
            ));
        }

        let input_params = load_layer(&descriptor, "paths.input.params");
        let input_params_secure = load_layer(&descriptor, "paths.input.params_secure");
        let logger = logger_for(&descriptor);

        Ok(Self {
            descriptor,
            input_params,
            input_params_secure,
            output_params: ContextFile::params_insecure(),
            logger,
            folder: None,
        })
    }

    /// Build an ephemeral context from directly-supplied parameter maps.
    ///
    /// The folder (a generated temp folder when absent) is populated with
    /// `input/`, `output/` and `logs/` subfolders and the input documents
    /// are written to disk, so commands that validate `paths.input.params`
    /// behave exactly as they do with a descriptor file.
    pub fn ephemeral(
        folder: Option<&Path>,
        input_params: Option<Value>,
        input_params_secure: Option<Value>,
    ) -> Result<Self> {
        let folder = match folder {
            Some(folder) => folder.to_path_buf(),
            None => std::env::temp_dir().join(format!("conveyor-exec-{}", uuid::Uuid::new_v4())),
        };
        for sub in ["input", "input/files", "output", "output/files", "logs"] {
            std::fs::create_dir_all(folder.join(sub)).map_err(|e| {
                Error::internal_io(e.to_string(), Some("prepare execution folder".to_string()))
            })?;
        }

        let input_params = ContextFile::from_content(
            context_file::KIND_PARAMS_INSECURE,
            input_params.unwrap_or_else(empty_mapping),
        );
        let input_params_secure = ContextFile::from_content(
            context_file::KIND_PARAMS_SECURE,
            input_params_secure.unwrap_or_else(empty_mapping),
        );
        input_params.save(&folder.join("input/params.yaml"))?;
        input_params_secure.save(&folder.join("input/params_secure.yaml"))?;

        let mut descriptor = ContextFile::context_descriptor();
        descriptor.set_multiple([
            ("paths.logs".to_string(), path_value(&folder.join("logs"))),
            (
                "paths.input.params".to_string(),
                path_value(&folder.join("input/params.yaml")),
            ),
            (
                "paths.input.params_secure".to_string(),
                path_value(&folder.join("input/params_secure.yaml")),
            ),
            (
                "paths.input.files".to_string(),
                path_value(&folder.join("input/files")),
            ),
            (
                "paths.output.params".to_string(),
                path_value(&folder.join("output/params.yaml")),
            ),
            (
                "paths.output.files".to_string(),
                path_value(&folder.join("output/files")),
            ),
        ]);
        let logger = logger_for(&descriptor);

        Ok(Self {
            descriptor,
            input_params,
            input_params_secure,
            output_params: ContextFile::params_insecure(),
            logger,
            folder: Some(folder),
        })
    }

    pub fn logger(&self) -> &ExecutionLogger {
        &self.logger
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Merged read view: secure layer, then insecure layer, then the
    /// descriptor (which carries the `paths.*` tree).
    pub fn input_param_get(&self, path: &str) -> Option<&Value> {
        self.input_params_secure
            .get(path)
            .or_else(|| self.input_params.get(path))
            .or_else(|| self.descriptor.get(path))
    }

    /// String accessor, coercing bare scalars (numbers, bools) to text.
    pub fn input_str(&self, path: &str) -> Option<String> {
        scalar_to_string(self.input_param_get(path)?)
    }

    /// Integer accessor, accepting numeric strings.
    pub fn input_i64(&self, path: &str) -> Result<Option<i64>> {
        let Some(value) = self.input_param_get(path) else {
            return Ok(None);
        };
        if let Some(n) = value.as_i64() {
            return Ok(Some(n));
        }
        if let Some(s) = value.as_str() {
            if let Ok(n) = s.trim().parse::<i64>() {
                return Ok(Some(n));
            }
        }
        Err(Error::validation_invalid_parameter(path, "expected an integer"))
    }

    /// Boolean accessor, accepting "true"/"false" strings in any case.
    pub fn input_bool(&self, path: &str) -> Result<Option<bool>> {
        let Some(value) = self.input_param_get(path) else {
            return Ok(None);
        };
        if let Some(b) = value.as_bool() {
            return Ok(Some(b));
        }
        if let Some(s) = value.as_str() {
            match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => return Ok(Some(true)),
                "false" | "no" | "0" => return Ok(Some(false)),
                _ => {}
            }
        }
        Err(Error::validation_invalid_parameter(path, "expected a boolean"))
    }

    /// Check that every named path resolves to a non-empty value in the
    /// merged view. All violations are collected and logged, so operators see
    /// every missing parameter in one run, not one per run.
    pub fn validate(&self, names: &[&str]) -> bool {
        let missing = self.missing_params(names);
        for name in &missing {
            self.logger
                .error(Error::validation_missing_parameter(name.clone()).message);
        }
        missing.is_empty()
    }

    pub fn missing_params(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| is_missing(self.input_param_get(name)))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn output_param_set(&mut self, path: &str, value: Value) {
        self.output_params.set(path, value);
    }

    pub fn output_param_set_multiple(
        &mut self,
        values: impl IntoIterator<Item = (String, Value)>,
    ) {
        self.output_params.set_multiple(values);
    }

    pub fn output_param_get(&self, path: &str) -> Option<&Value> {
        self.output_params.get(path)
    }

    /// Persist the output document to `paths.output.params`. Idempotent:
    /// the full in-memory document overwrites the artifact on every call.
    pub fn output_params_save(&self) -> Result<()> {
        let path = self
            .input_str("paths.output.params")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::validation_missing_parameter("paths.output.params"))?;
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::internal_io(e.to_string(), Some("prepare output folder".to_string()))
            })?;
        }
        self.output_params.save(&path)
    }
}

fn load_layer(descriptor: &ContextFile, path_key: &str) -> ContextFile {
    match descriptor.get_str(path_key).filter(|p| !p.is_empty()) {
        Some(path) => ContextFile::load(Path::new(&path)),
        None => ContextFile::empty(),
    }
}

fn logger_for(descriptor: &ContextFile) -> ExecutionLogger {
    match descriptor.get_str("paths.logs").filter(|p| !p.is_empty()) {
        Some(path) => {
            let path = PathBuf::from(path);
            let _ = std::fs::create_dir_all(&path);
            ExecutionLogger::new(&path)
        }
        None => ExecutionLogger::detached(),
    }
}

fn empty_mapping() -> Value {
    Value::Mapping(serde_yml::Mapping::new())
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(yaml: &str) -> Value {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn secure_layer_wins_over_insecure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::ephemeral(
            Some(dir.path()),
            Some(params("systems:\n  gitlab:\n    password: plain\n    url: https://gitlab.com\n")),
            Some(params("systems:\n  gitlab:\n    password: vaulted\n")),
        )
        .unwrap();

        assert_eq!(ctx.input_str("systems.gitlab.password").as_deref(), Some("vaulted"));
        // Paths only present in the insecure layer still resolve.
        assert_eq!(ctx.input_str("systems.gitlab.url").as_deref(), Some("https://gitlab.com"));
    }

    #[test]
    fn validate_collects_every_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::ephemeral(
            Some(dir.path()),
            Some(params("params:\n  present: x\n  empty: ''\n")),
            None,
        )
        .unwrap();

        let missing = ctx.missing_params(&[
            "params.present",
            "params.empty",
            "params.absent",
            "systems.gitlab.password",
        ]);
        assert_eq!(
            missing,
            vec!["params.empty", "params.absent", "systems.gitlab.password"]
        );
        assert!(!ctx.validate(&["params.absent"]));
        assert!(ctx.validate(&["params.present", "paths.input.params"]));
    }

    #[test]
    fn ephemeral_context_writes_input_documents() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::ephemeral(
            Some(dir.path()),
            Some(params("params:\n  param_1: 5\n")),
            None,
        )
        .unwrap();

        assert!(dir.path().join("input/params.yaml").is_file());
        assert!(dir.path().join("input/params_secure.yaml").is_file());
        assert!(ctx.validate(&["paths.input.params", "paths.output.params"]));
    }

    #[test]
    fn output_params_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ExecutionContext::ephemeral(Some(dir.path()), None, None).unwrap();

        ctx.output_param_set("params.result", Value::from(20));
        ctx.output_params_save().unwrap();
        let first = std::fs::read(dir.path().join("output/params.yaml")).unwrap();
        ctx.output_params_save().unwrap();
        let second = std::fs::read(dir.path().join("output/params.yaml")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn typed_accessors_coerce_strings() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::ephemeral(
            Some(dir.path()),
            Some(params(
                "params:\n  timeout_seconds: '300'\n  import_artifacts: 'True'\n  pipeline_id: 123\n",
            )),
            None,
        )
        .unwrap();

        assert_eq!(ctx.input_i64("params.timeout_seconds").unwrap(), Some(300));
        assert_eq!(ctx.input_bool("params.import_artifacts").unwrap(), Some(true));
        assert_eq!(ctx.input_str("params.pipeline_id").as_deref(), Some("123"));
        assert!(ctx.input_i64("params.import_artifacts").is_err());
        assert_eq!(ctx.input_i64("params.absent").unwrap(), None);
    }

    #[test]
    fn descriptor_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let params_path = dir.path().join("params.yaml");
        let mut input = ContextFile::params_insecure();
        input.set("params.param_1", Value::from(9));
        input.save(&params_path).unwrap();

        let mut descriptor = ContextFile::context_descriptor();
        descriptor.set("paths.input.params", path_value(&params_path));
        descriptor.set(
            "paths.output.params",
            path_value(&dir.path().join("result.yaml")),
        );
        let descriptor_path = dir.path().join("context.yaml");
        descriptor.save(&descriptor_path).unwrap();

        let mut ctx = ExecutionContext::from_descriptor_file(&descriptor_path).unwrap();
        assert_eq!(ctx.input_i64("params.param_1").unwrap(), Some(9));

        ctx.output_param_set("params.result", Value::from(19));
        ctx.output_params_save().unwrap();
        assert!(dir.path().join("result.yaml").is_file());
    }

    #[test]
    fn rejects_non_descriptor_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        ContextFile::params_insecure().save(&path).unwrap();

        let err = ExecutionContext::from_descriptor_file(&path).unwrap_err();
        assert_eq!(err.code.as_str(), "context.invalid_document");
    }
}
