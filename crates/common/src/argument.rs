//! Argument validation shared by constructors and request builders
//!
//! Blank strings and malformed URLs are rejected synchronously, before any
//! network activity happens.

use thiserror::Error;
use url::Url;

/// A required argument was missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid argument `{name}`: {reason}")]
pub struct ArgumentError {
    pub name: &'static str,
    pub reason: String,
}

impl ArgumentError {
    pub fn new(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}

/// Reject empty or whitespace-only values.
pub fn require_non_blank(name: &'static str, value: &str) -> Result<(), ArgumentError> {
    if value.trim().is_empty() {
        return Err(ArgumentError::new(
            name,
            "value cannot be empty or whitespace",
        ));
    }
    Ok(())
}

/// Parse `value` as an absolute URL with a host (e.g. `https://login.salesforce.com/...`).
pub fn require_absolute_url(name: &'static str, value: &str) -> Result<Url, ArgumentError> {
    require_non_blank(name, value)?;
    let url = Url::parse(value.trim())
        .map_err(|e| ArgumentError::new(name, format!("'{value}' is not a valid URL: {e}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ArgumentError::new(
            name,
            format!("'{value}' is not an absolute URL"),
        ));
    }
    Ok(url)
}
