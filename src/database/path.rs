use crate::database::error::{invalid_argument, DatabaseResult};

/// Longest key accepted by the Realtime Database, in bytes.
const MAX_KEY_BYTES: usize = 768;

const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Splits a slash-delimited path into validated segments. Empty segments are skipped, so the
/// empty path (or `/`) addresses the root.
pub(crate) fn normalize_path(path: &str) -> DatabaseResult<Vec<String>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| validate_key(segment).map(|_| segment.to_string()))
        .collect()
}

fn validate_key(key: &str) -> DatabaseResult<()> {
    if key.len() > MAX_KEY_BYTES {
        return Err(invalid_argument(format!(
            "Database key exceeds {MAX_KEY_BYTES} bytes"
        )));
    }
    if let Some(bad) = key
        .chars()
        .find(|ch| FORBIDDEN_KEY_CHARS.contains(ch) || ch.is_ascii_control())
    {
        return Err(invalid_argument(format!(
            "Database key '{}' contains the forbidden character {bad:?}",
            key.escape_debug()
        )));
    }
    Ok(())
}

pub(crate) fn join_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}
