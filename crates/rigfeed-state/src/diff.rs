//! Recursive structural diff between two state trees.
//!
//! The diff is asymmetric by design: keys present only in the previous
//! export are not reported as deletions. Consumers that need deletion
//! visibility must use full-snapshot exports instead.

use std::mem::discriminant;

use serde_json::{Map, Value};

/// Minimal difference of `curr` against `prev`.
///
/// Per key, recursive:
/// - absent in `prev` → include the new value wholesale
/// - both objects of the same JSON type → recurse, include only a non-empty sub-diff
/// - same JSON type, different value → include the new value wholesale
/// - different JSON type → include the new value wholesale
/// - equal → omit
/// - absent in `curr` → omitted (no deletion reporting)
pub(crate) fn diff_maps(
    prev: &Map<String, Value>,
    curr: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, new) in curr {
        match prev.get(key) {
            None => {
                let _ = out.insert(key.clone(), new.clone());
            }
            Some(old) if discriminant(old) != discriminant(new) => {
                let _ = out.insert(key.clone(), new.clone());
            }
            Some(Value::Object(old_obj)) => {
                if let Value::Object(new_obj) = new {
                    let sub = diff_maps(old_obj, new_obj);
                    if !sub.is_empty() {
                        let _ = out.insert(key.clone(), Value::Object(sub));
                    }
                }
            }
            Some(old) => {
                if old != new {
                    let _ = out.insert(key.clone(), new.clone());
                }
            }
        }
    }
    out
}
