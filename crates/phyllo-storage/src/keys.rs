//! Storage key generation and validation.
//!
//! Key format: `{label}_{id}{ext}` where `label` is the normalized classification
//! label, `id` is exactly seven digits and `ext` is the original file extension
//! including its dot, e.g. `zea-mays_0004711.jpg`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::traits::{StorageError, StorageResult};

/// Width of the numeric identifier segment.
pub const KEY_ID_WIDTH: usize = 7;

/// Label used when normalization leaves nothing behind.
const FALLBACK_LABEL: &str = "unknown";

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_-]+_\d{7}\.[A-Za-z0-9]+$").expect("key pattern is a valid regex")
});

/// Normalize a classification label for use in a key.
///
/// Every character outside `[A-Za-z0-9-]` becomes `_`, runs of `_` collapse to
/// one, leading and trailing `_` are trimmed and the result is lowercased.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '-' {
            c.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Generate a storage key from a classification label, a numeric identifier of at
/// most seven digits and a file extension (with or without the leading dot).
///
/// Identifiers wider than seven digits are rejected rather than widened, so every
/// generated key keeps matching [`is_valid_key`].
pub fn generate_key(label: &str, unique_id: &str, extension: &str) -> StorageResult<String> {
    if unique_id.is_empty() || !unique_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(StorageError::InvalidKey(format!(
            "Key identifier must be numeric: {:?}",
            unique_id
        )));
    }
    if unique_id.len() > KEY_ID_WIDTH {
        return Err(StorageError::InvalidKey(format!(
            "Key identifier {} exceeds {} digits",
            unique_id, KEY_ID_WIDTH
        )));
    }

    let ext = extension.trim_start_matches('.');
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file extension: {:?}",
            extension
        )));
    }

    Ok(format!(
        "{}_{:0>width$}.{}",
        normalize_label(label),
        unique_id,
        ext,
        width = KEY_ID_WIDTH
    ))
}

/// Whether `key` has the shape of a generated remote key.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Extension of `filename` including the leading dot, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
}
