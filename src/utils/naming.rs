// Object naming for uploaded files

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Name a client picks for a direct upload: `{millis}-{original}`.
pub fn client_object_name(original_name: &str, millis: i64) -> String {
    format!("{}-{}", millis, base_name(original_name))
}

/// Name the server picks for a relayed file: `{millis}-{uuid}{.ext}`.
pub fn relay_object_name(original_name: &str, millis: i64, id: Uuid) -> String {
    match extension_of(original_name) {
        Some(ext) => format!("{}-{}.{}", millis, id, ext),
        None => format!("{}-{}", millis, id),
    }
}

/// Extension of the last path component, without the dot.
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(base_name(name))
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

// Browsers send bare names but raw uploads may carry a path.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
