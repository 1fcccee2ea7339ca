//! Size-bounded JSON encoding for opaque blobs stored as strings.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::limits::MAX_CUSTOM_PROPERTIES_BYTES;

/// Encodes `value` as JSON, failing if the result exceeds `limit` bytes.
pub fn encode_bounded<T: Serialize + ?Sized>(value: &T, limit: usize) -> Result<String> {
    let encoded = serde_json::to_string(value)?;
    if encoded.len() > limit {
        return Err(Error::validation(format!(
            "encoded value {}KB exceeds {}KB limit",
            encoded.len() / 1024,
            limit / 1024
        )));
    }
    Ok(encoded)
}

/// Encodes custom event properties for storage.
///
/// Missing properties become `{}`. Oversized maps are replaced by a marker
/// object recording the dropped size, so the event row is still written.
pub fn encode_properties(properties: Option<&serde_json::Value>) -> String {
    let Some(value) = properties.filter(|v| !v.is_null()) else {
        return "{}".to_string();
    };

    match encode_bounded(value, MAX_CUSTOM_PROPERTIES_BYTES) {
        Ok(encoded) => encoded,
        Err(_) => {
            let size = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
            serde_json::json!({ "_truncated": true, "_bytes": size }).to_string()
        }
    }
}
