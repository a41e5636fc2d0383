//! Helpers for scrubbing text before it reaches clients or logs.
//!
//! Analyzer failures are stored on the job and shown to whoever polls it, so
//! they must not carry credentials or server filesystem layout.

use regex::{Captures, Regex};
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

pub const MAX_MESSAGE_CHARS: usize = 200;
const GENERIC_MESSAGE: &str = "Analysis failed";
const REDACTED: &str = "[redacted]";

fn absolute_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?P<lead>^|[\s'"(=])(?P<path>/(?:[^\s/'",:;]+/)+[^\s/'",:;]*)"#)
            .expect("absolute path pattern is valid")
    })
}

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sk-[A-Za-z0-9_\-]{8,}").expect("api key pattern is valid"))
}

fn unsafe_file_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("file name pattern is valid"))
}

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Produces a short client-safe error message: configured secrets and
/// anything shaped like an API key are masked, absolute paths are reduced to
/// their file name, and the result is capped at [`MAX_MESSAGE_CHARS`].
pub fn sanitize_message(message: &str, secrets: &[String]) -> String {
    let cleaned = scrub(message, secrets);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return GENERIC_MESSAGE.to_string();
    }
    if cleaned.chars().count() > MAX_MESSAGE_CHARS {
        let mut truncated: String = cleaned.chars().take(MAX_MESSAGE_CHARS - 3).collect();
        truncated.push_str("...");
        return truncated;
    }
    cleaned.to_string()
}

/// Applies the same masking as [`sanitize_message`] to every string inside a
/// JSON value, without truncating.
pub fn sanitize_json(value: &mut Value, secrets: &[String]) {
    match value {
        Value::String(text) => {
            let cleaned = scrub(text, secrets);
            *text = cleaned;
        }
        Value::Array(items) => items.iter_mut().for_each(|item| sanitize_json(item, secrets)),
        Value::Object(map) => map.values_mut().for_each(|item| sanitize_json(item, secrets)),
        _ => {}
    }
}

/// Masks secrets and shortens absolute paths, keeping the text otherwise intact.
pub fn scrub(text: &str, secrets: &[String]) -> String {
    let mut cleaned = text.to_string();
    for secret in secrets.iter().filter(|s| s.len() >= 4) {
        cleaned = cleaned.replace(secret.as_str(), REDACTED);
    }
    cleaned = api_key_re().replace_all(&cleaned, REDACTED).into_owned();
    absolute_path_re()
        .replace_all(&cleaned, |caps: &Captures| {
            format!("{}{}", &caps["lead"], redact_path(Path::new(&caps["path"])))
        })
        .into_owned()
}

/// Reduces a client-supplied file name to a safe single path component.
pub fn secure_file_name(name: &str) -> String {
    let last = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let replaced = unsafe_file_chars_re().replace_all(last, "_");
    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
