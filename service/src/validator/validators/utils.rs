//! Utility functions for validators

use crate::descriptor::Parameters;
use graphguard_core::{BuildError, Value};

/// Reject parameters a constraint kind does not understand
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] naming the first unknown
/// parameter.
pub fn reject_unknown(kind: &str, params: &Parameters, allowed: &[&str]) -> Result<(), BuildError> {
    match params.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(unknown) => Err(BuildError::malformed(kind, unknown, "unknown parameter")),
        None => Ok(()),
    }
}

/// Read an optional integer parameter
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] if the parameter is present
/// but not an integer.
pub fn optional_i64(kind: &str, params: &Parameters, name: &str) -> Result<Option<i64>, BuildError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| BuildError::malformed(kind, name, format!("expected an integer, got {value}"))),
    }
}

/// Read a required integer parameter
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] if the parameter is missing or
/// not an integer.
pub fn required_i64(kind: &str, params: &Parameters, name: &str) -> Result<i64, BuildError> {
    optional_i64(kind, params, name)?.ok_or_else(|| BuildError::malformed(kind, name, "is required"))
}

/// Read a required non-negative integer parameter
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] if the parameter is missing,
/// not an integer or negative.
pub fn required_count(kind: &str, params: &Parameters, name: &str) -> Result<usize, BuildError> {
    let value = required_i64(kind, params, name)?;
    usize::try_from(value).map_err(|_| BuildError::malformed(kind, name, "must not be negative"))
}

/// Read an optional string parameter
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] if the parameter is present
/// but not a string.
pub fn optional_str<'a>(
    kind: &str,
    params: &'a Parameters,
    name: &str,
) -> Result<Option<&'a str>, BuildError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| BuildError::malformed(kind, name, format!("expected a string, got {value}"))),
    }
}

/// Read a list of strings; a single string counts as a one-element list
///
/// # Errors
///
/// Returns [`BuildError::MalformedParameter`] if the parameter holds
/// anything else.
pub fn string_list(kind: &str, params: &Parameters, name: &str) -> Result<Vec<String>, BuildError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::String(s)) => Ok(vec![s.clone()]),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    BuildError::malformed(kind, name, format!("expected strings, got {item}"))
                })
            })
            .collect(),
        Some(other) => Err(BuildError::malformed(
            kind,
            name,
            format!("expected a list of strings, got {other}"),
        )),
    }
}

/// Error for a value shape a validator cannot handle
#[must_use]
pub fn unsupported(kind: &str, value: &Value) -> anyhow::Error {
    anyhow::anyhow!("{kind} cannot validate a value of type {}", value.shape())
}
