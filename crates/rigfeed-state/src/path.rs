//! Dot-path navigation over nested JSON maps.
//!
//! A key like `truck.engine.rpm` is a nesting instruction: each segment is
//! one level of nested object. Writing through a segment whose existing
//! value is not an object silently replaces it with one — structural type
//! changes are legal and last-writer-wins.

use serde_json::{Map, Value};

/// Write `value` at `path`, creating intermediate objects as needed.
pub(crate) fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            let _ = map.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Remove the value at `path`, pruning intermediate objects it empties.
///
/// Returns whether anything was removed. A path that runs through a
/// non-object (the key was structurally overwritten since it was set)
/// removes nothing.
pub(crate) fn remove_path(map: &mut Map<String, Value>, path: &str) -> bool {
    match path.split_once('.') {
        None => map.remove(path).is_some(),
        Some((head, rest)) => {
            let Some(Value::Object(child)) = map.get_mut(head) else {
                return false;
            };
            let removed = remove_path(child, rest);
            if removed && child.is_empty() {
                let _ = map.remove(head);
            }
            removed
        }
    }
}
