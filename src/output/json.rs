//! JSON serialization of diff results.

use crate::diff::DiffResult;

pub fn serialize_diff_result(result: &DiffResult) -> serde_json::Result<String> {
    serde_json::to_string(result)
}

pub fn deserialize_diff_result(json: &str) -> serde_json::Result<DiffResult> {
    serde_json::from_str(json)
}
