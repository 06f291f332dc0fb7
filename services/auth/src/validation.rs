//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Where users land when no usable redirect target was given
pub const DEFAULT_LANDING: &str = "/admin";

/// Resolve a user-supplied redirect to a same-origin relative path
///
/// Anything that is not a plain absolute path on this origin (`https://..`,
/// protocol-relative `//host`, backslash tricks, control characters) is
/// replaced with [`DEFAULT_LANDING`].
pub fn safe_redirect(target: Option<&str>) -> &str {
    let Some(target) = target.map(str::trim) else {
        return DEFAULT_LANDING;
    };

    let is_local = target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(|c| c.is_control() || c == '\\');

    if is_local { target } else { DEFAULT_LANDING }
}

/// Validate a station sign-in code
pub fn validate_station_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("Station code is required".to_string());
    }

    if code.len() > 64 {
        return Err("Station code must be at most 64 characters long".to_string());
    }

    static CODE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = CODE_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok());

    match regex {
        Some(regex) if regex.is_match(code) => Ok(()),
        _ => Err("Station code can only contain letters, numbers, dashes, and underscores".to_string()),
    }
}

/// Validate an event identifier (slug or id) taken from a path
pub fn validate_event_identifier(identifier: &str) -> Result<(), String> {
    if identifier.is_empty() {
        return Err("Event identifier is required".to_string());
    }

    if identifier.len() > 128 {
        return Err("Event identifier must be at most 128 characters long".to_string());
    }

    static IDENTIFIER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = IDENTIFIER_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").ok());

    match regex {
        Some(regex) if regex.is_match(identifier) => Ok(()),
        _ => Err("Invalid event identifier".to_string()),
    }
}
