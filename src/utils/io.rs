//! File I/O primitives with consistent error handling.

use crate::core::error::{Error, Result};
use serde_yml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a YAML document from disk.
pub fn read_yaml(path: &Path, operation: &str) -> Result<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))?;
    serde_yml::from_str(&content)
        .map_err(|e| Error::internal_yaml(e.to_string(), Some(operation.to_string())))
}

/// Serialize a YAML document and write it atomically (write to .tmp, then rename).
///
/// The rename is atomic on POSIX filesystems, so readers always see either
/// the old content or the new content, never a partial write.
pub fn write_yaml_atomic(path: &Path, value: &Value, operation: &str) -> Result<()> {
    let content = serde_yml::to_string(value)
        .map_err(|e| Error::internal_yaml(e.to_string(), Some(operation.to_string())))?;

    let parent = path.parent().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    })?;

    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    })?;

    let tmp_path = parent.join(format!("{}.tmp", filename.to_string_lossy()));

    fs::write(&tmp_path, &content)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation))))?;

    fs::rename(&tmp_path, path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("{} (rename)", operation))))?;

    Ok(())
}

/// Create a fresh execution folder, replacing any directory already there.
///
/// Refuses to clobber a regular file at the same path.
pub fn create_exec_dir(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| {
                Error::internal_io(e.to_string(), Some("clean execution folder".to_string()))
            })?;
        } else {
            return Err(Error::internal_io(
                format!("Path '{}' exists and is a file, not a directory", path.display()),
                Some("create execution folder".to_string()),
            ));
        }
    }
    fs::create_dir_all(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some("create execution folder".to_string())))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yml::Mapping;

    #[test]
    fn yaml_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");

        let mut doc = Value::Mapping(Mapping::new());
        crate::utils::path::set_by_path(&mut doc, "params.result", Value::from(20));

        write_yaml_atomic(&path, &doc, "test write").unwrap();
        let loaded = read_yaml(&path, "test read").unwrap();
        assert_eq!(
            crate::utils::path::get_by_path(&loaded, "params.result").and_then(Value::as_i64),
            Some(20)
        );
    }

    #[test]
    fn read_yaml_returns_error_for_missing_file() {
        let err = read_yaml(Path::new("/nonexistent/params.yaml"), "test read").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn create_exec_dir_replaces_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("exec");
        fs::create_dir_all(exec.join("stale")).unwrap();

        create_exec_dir(&exec).unwrap();
        assert!(exec.is_dir());
        assert!(!exec.join("stale").exists());
    }

    #[test]
    fn create_exec_dir_refuses_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("exec");
        fs::write(&exec, "not a dir").unwrap();

        let err = create_exec_dir(&exec).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }
}
