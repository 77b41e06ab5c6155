//! Error types for API operations
//!
//! Every non-2xx answer that survives the single 401 retry becomes a
//! `RemoteServiceError` carrying the raw body. The data service refines that
//! into a `DataServiceError` when the body is its JSON error array.

use common::ArgumentError;
use serde_json::Value;
use transport::{Method, StatusCode};

/// Service name used in data-service error messages.
pub const SERVICE_NAME: &str = "Salesforce";

/// A request completed with a non-success status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RemoteServiceError {
    pub method: Method,
    pub status: StatusCode,
    /// Response body exactly as received
    pub body: String,
    message: String,
}

impl RemoteServiceError {
    pub fn new(method: Method, status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = format!(
            "{method} failed. HTTP {} - {} - {body}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
        );
        Self {
            method,
            status,
            body,
            message,
        }
    }
}

/// One element of the data service's error array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataErrorEntry {
    pub message: String,
    pub error_code: Option<String>,
    pub fields: Vec<String>,
}

/// Data service failure decoded from its `[{message, errorCode}, ...]` body.
///
/// The message lists each error as a numbered level:
///
/// ```text
/// ==== Level 1 ====
/// Required field missing
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DataServiceError {
    pub status: Option<StatusCode>,
    pub entries: Vec<DataErrorEntry>,
    pub body: String,
    message: String,
}

impl DataServiceError {
    /// Decode a raw error body.
    ///
    /// Elements without a `message` are skipped and do not consume a level
    /// number. A body that is not a JSON array, or that has an element whose
    /// `message` is `null`, is reported verbatim as a communication error.
    /// Non-string messages (numbers, booleans) are rendered as JSON text.
    pub fn parse(body: &str) -> Self {
        let items = match serde_json::from_str::<Value>(body) {
            Ok(Value::Array(items))
                if !items
                    .iter()
                    .any(|item| item.get("message").is_some_and(Value::is_null)) =>
            {
                items
            }
            _ => {
                return Self {
                    status: None,
                    entries: Vec::new(),
                    body: body.to_string(),
                    message: format!("Error communicating with {SERVICE_NAME}: {body}"),
                };
            }
        };

        let entries: Vec<DataErrorEntry> = items.iter().filter_map(entry_from_value).collect();

        let message = if entries.is_empty() {
            format!("An unexpected error occurred: {body}")
        } else {
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| format!("==== Level {} ====\n{}\n", i + 1, entry.message.trim()))
                .collect()
        };

        Self {
            status: None,
            entries,
            body: body.to_string(),
            message,
        }
    }

    pub fn from_remote(remote: &RemoteServiceError) -> Self {
        Self {
            status: Some(remote.status),
            ..Self::parse(&remote.body)
        }
    }
}

fn entry_from_value(value: &Value) -> Option<DataErrorEntry> {
    let object = value.as_object()?;
    let message = match object.get("message")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let error_code = object
        .get("errorCode")
        .and_then(Value::as_str)
        .map(str::to_string);
    let fields = object
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(DataErrorEntry {
        message,
        error_code,
        fields,
    })
}

/// Errors from API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    #[error(transparent)]
    Auth(#[from] sfdc_auth::Error),

    #[error(transparent)]
    Transport(#[from] transport::Error),

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error(transparent)]
    Data(#[from] DataServiceError),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidOperation(String),
}

impl Error {
    /// Refine a remote failure that carries a body into a `DataServiceError`.
    /// Anything else is returned unchanged.
    pub fn into_data_service(self) -> Self {
        match self {
            Error::Remote(remote) if !remote.body.trim().is_empty() => {
                Error::Data(DataServiceError::from_remote(&remote))
            }
            other => other,
        }
    }

    /// HTTP status of a remote failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Remote(e) => Some(e.status),
            Error::Data(e) => e.status,
            _ => None,
        }
    }

    /// Raw response body of a remote failure.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::Remote(e) => Some(&e.body),
            Error::Data(e) => Some(&e.body),
            _ => None,
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
