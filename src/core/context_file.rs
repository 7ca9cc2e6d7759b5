//! Typed YAML parameter documents.
//!
//! Every document the toolkit reads or writes carries a `kind` and an
//! `apiVersion` header. Three kinds exist: the context descriptor (which
//! points at the other files) and the insecure/secure parameter documents.
//! Loading is lenient: a missing file or an unsupported header yields an
//! empty document rather than an error, so a half-provisioned job folder
//! fails later with a precise "parameter is mandatory" message instead of
//! a parse failure.

use crate::core::error::Result;
use crate::utils::{io, path as ypath};
use serde_yml::{Mapping, Value};
use std::path::Path;

pub const KIND_CONTEXT_DESCRIPTOR: &str = "ModuleContextDescriptor";
pub const KIND_PARAMS_INSECURE: &str = "ModuleParamsInsecure";
pub const KIND_PARAMS_SECURE: &str = "ModuleParamsSecure";
pub const SUPPORTED_KINDS: [&str; 3] = [
    KIND_CONTEXT_DESCRIPTOR,
    KIND_PARAMS_INSECURE,
    KIND_PARAMS_SECURE,
];

pub const API_VERSION_V1: &str = "v1";
pub const SUPPORTED_API_VERSIONS: [&str; 1] = [API_VERSION_V1];

#[derive(Debug, Clone)]
pub struct ContextFile {
    content: Value,
}

impl ContextFile {
    pub fn empty() -> Self {
        let mut content = Value::Mapping(Mapping::new());
        ypath::set_by_path(&mut content, "kind", Value::from(""));
        ypath::set_by_path(&mut content, "apiVersion", Value::from(""));
        Self { content }
    }

    /// Descriptor skeleton: paths to input/output parameter files, input and
    /// output file folders, and the logs folder.
    pub fn context_descriptor() -> Self {
        let mut file = Self::with_kind(KIND_CONTEXT_DESCRIPTOR);
        for path in [
            "paths.logs",
            "paths.input.params",
            "paths.input.params_secure",
            "paths.input.files",
            "paths.output.params",
            "paths.output.params_secure",
            "paths.output.files",
        ] {
            file.set(path, Value::from(""));
        }
        file
    }

    pub fn params_insecure() -> Self {
        Self::params_skeleton(KIND_PARAMS_INSECURE)
    }

    pub fn params_secure() -> Self {
        Self::params_skeleton(KIND_PARAMS_SECURE)
    }

    fn params_skeleton(kind: &str) -> Self {
        let mut file = Self::with_kind(kind);
        for section in ["params", "files", "systems"] {
            file.set(section, Value::Mapping(Mapping::new()));
        }
        file
    }

    fn with_kind(kind: &str) -> Self {
        let mut content = Value::Mapping(Mapping::new());
        ypath::set_by_path(&mut content, "kind", Value::from(kind));
        ypath::set_by_path(&mut content, "apiVersion", Value::from(API_VERSION_V1));
        Self { content }
    }

    /// Seed a parameter document of the given kind from caller-supplied
    /// content (the ephemeral-context construction path). The header is
    /// stamped over whatever the caller provided.
    pub fn from_content(kind: &str, content: Value) -> Self {
        let mut file = Self { content };
        file.set("kind", Value::from(kind));
        file.set("apiVersion", Value::from(API_VERSION_V1));
        file
    }

    /// Load a document from disk. Unsupported headers and unreadable files
    /// reset the document to empty.
    pub fn load(path: &Path) -> Self {
        let content = match io::read_yaml(path, "load context file") {
            Ok(content) => content,
            Err(_) => return Self::empty(),
        };

        let file = Self { content };
        let kind = file.get_str("kind").unwrap_or_default();
        if !SUPPORTED_KINDS.contains(&kind.as_str()) {
            tracing::error!(
                "Incorrect kind value: '{}' in file '{}'. Only {:?} are supported",
                kind,
                path.display(),
                SUPPORTED_KINDS
            );
            return Self::empty();
        }
        let api_version = file.get_str("apiVersion").unwrap_or_default();
        if !SUPPORTED_API_VERSIONS.contains(&api_version.as_str()) {
            tracing::error!(
                "Incorrect apiVersion value: '{}' in file '{}'. Only {:?} are supported",
                api_version,
                path.display(),
                SUPPORTED_API_VERSIONS
            );
            return Self::empty();
        }
        file
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_yaml_atomic(path, &self.content, "save context file")
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        ypath::get_by_path(&self.content, path)
    }

    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(Value::as_str).map(str::to_string)
    }

    pub fn set(&mut self, path: &str, value: Value) -> &mut Self {
        ypath::set_by_path(&mut self.content, path, value);
        self
    }

    pub fn set_multiple(&mut self, values: impl IntoIterator<Item = (String, Value)>) -> &mut Self {
        for (path, value) in values {
            self.set(&path, value);
        }
        self
    }

    pub fn content(&self) -> &Value {
        &self.content
    }
}
