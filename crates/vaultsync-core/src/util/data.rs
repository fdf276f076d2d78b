//! JSON data handling utilities.

use vaultsync_types::{bug, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Deep merge two values.
/// Recursively merges objects, with overlay values taking precedence.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay_val) => overlay_val,
    }
}

/// Convert a serializable structure into the flat object the backend
/// expects as a write body.
pub fn struct_to_map(item: &impl Serialize) -> Result<Map<String, Value>> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bug!("expected a JSON object for a write body, got {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge() {
        let base = json!({"vault": {"address": "a", "insecure": false}, "x": 1});
        let overlay = json!({"vault": {"address": "b"}, "y": 2});
        let merged = deep_merge(base, overlay);

        assert_eq!(merged, json!({"vault": {"address": "b", "insecure": false}, "x": 1, "y": 2}));
    }

    #[test]
    fn test_struct_to_map() {
        #[derive(Serialize)]
        struct Lease {
            lease: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            lease_max: Option<String>,
        }

        let map = struct_to_map(&Lease { lease: "1h".to_string(), lease_max: None }).unwrap();
        assert_eq!(map.get("lease").unwrap(), "1h");
        assert!(!map.contains_key("lease_max"));

        assert!(matches!(struct_to_map(&"scalar"), Err(vaultsync_types::SyncError::Bug(_))));
    }
}
