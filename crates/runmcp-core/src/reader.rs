//! Bounded file reading and guarded decoding.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;
use crate::paths::{is_json_file, is_yaml_file};

/// Hard cap on config file size. Anything larger is refused before reading.
pub const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;

/// Read a config file, refusing anything over [`MAX_CONFIG_SIZE`].
pub fn read_config(path: &Path) -> Result<Vec<u8>, ParseError> {
    let io_err = |source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };

    let meta = std::fs::metadata(path).map_err(io_err)?;
    if meta.len() > MAX_CONFIG_SIZE {
        return Err(ParseError::TooLarge {
            size: meta.len(),
            max: MAX_CONFIG_SIZE,
        });
    }
    std::fs::read(path).map_err(io_err)
}

/// Decode `data` as JSON or YAML based on the file extension.
///
/// JSON documents are additionally checked for case-insensitive key
/// collisions before being handed downstream; two sibling keys that lowercase
/// to the same value would silently shadow each other in permissive decoders,
/// so the whole file is rejected instead.
pub fn decode(path: &Path, data: &[u8]) -> Result<Value, ParseError> {
    if is_json_file(path) {
        let value: Value = serde_json::from_slice(data).map_err(|e| ParseError::Syntax {
            format: "JSON",
            message: e.to_string(),
        })?;
        detect_case_insensitive_key_collisions(&value)?;
        return Ok(value);
    }
    if is_yaml_file(path) {
        return serde_yaml::from_slice(data).map_err(|e| ParseError::Syntax {
            format: "YAML",
            message: e.to_string(),
        });
    }
    debug!(path = %path.display(), "unknown config extension");
    Err(ParseError::UnknownExtension {
        path: path.to_path_buf(),
    })
}

/// Reject documents containing sibling keys that differ only by letter case.
///
/// See <https://blog.trailofbits.com/2025/06/17/unexpected-security-footguns-in-gos-parsers/>.
pub fn detect_case_insensitive_key_collisions(value: &Value) -> Result<(), ParseError> {
    check_collisions_recursive(value, "")
}

fn check_collisions_recursive(value: &Value, path: &str) -> Result<(), ParseError> {
    match value {
        Value::Object(map) => {
            // Track the first-seen original spelling per lowercased key.
            let mut lower_to_original: std::collections::HashMap<String, &str> =
                std::collections::HashMap::with_capacity(map.len());
            for (key, child) in map {
                let lower = key.to_lowercase();
                if let Some(first) = lower_to_original.get(lower.as_str()) {
                    // Prefer the variant carrying upper-case letters in the
                    // reported path.
                    let path_key = if key.chars().any(|c| c.is_uppercase()) {
                        key.as_str()
                    } else {
                        first
                    };
                    return Err(ParseError::KeyCollision {
                        path: join_path(path, path_key),
                        current: key.clone(),
                        first: (*first).to_string(),
                    });
                }
                lower_to_original.insert(lower, key);

                check_collisions_recursive(child, &join_path(path, key))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_collisions_recursive(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
