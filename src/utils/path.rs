//! Dot-separated path access into nested YAML mappings.
//!
//! Paths like `systems.gitlab.password` address keys in nested mappings.
//! Reads never fail: any absent segment (or a non-mapping in the middle of
//! the path) resolves to `None`. Writes create intermediate mappings as
//! needed and overwrite whatever terminal value was there before.

use serde_yml::{Mapping, Value};

/// Gets a value from a YAML tree using a dot-notation path.
pub fn get_by_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;

    for segment in path.split('.') {
        current = current.as_mapping()?.get(Value::from(segment))?;
    }

    Some(current)
}

/// Sets a value in a YAML tree using a dot-notation path.
///
/// Intermediate segments that are missing or hold non-mapping values are
/// replaced with fresh mappings so the terminal write always lands.
pub fn set_by_path(root: &mut Value, path: &str, value: Value) {
    if !root.is_mapping() {
        *root = Value::Mapping(Mapping::new());
    }

    let mut current = root;
    let segments: Vec<&str> = path.split('.').collect();

    for (idx, segment) in segments.iter().enumerate() {
        let map = current.as_mapping_mut().expect("cursor is always a mapping");
        let key = Value::from(*segment);

        if idx == segments.len() - 1 {
            map.insert(key, value);
            return;
        }

        let entry = map
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !entry.is_mapping() {
            *entry = Value::Mapping(Mapping::new());
        }
        current = entry;
    }
}
