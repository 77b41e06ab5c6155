//! Error types for authentication operations

use common::ArgumentError;

/// Fault underneath a failed exchange (transport, JSON, or response shape).
pub type Fault = Box<dyn std::error::Error + Send + Sync>;

/// Generic message when the token endpoint returned no usable error fields.
pub const UNEXPECTED_REJECTION: &str = "An unexpected authentication error occurred";

/// Prefix for failures that are not a structured rejection from the endpoint.
pub const EXCHANGE_FAILURE: &str = "An error occurred authenticating";

/// Errors from obtaining a credential.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    /// The token endpoint answered non-2xx with `{error, error_description}`.
    #[error("{0}")]
    Rejected(String),

    /// The exchange failed before a structured answer could be read.
    #[error("{message}")]
    Exchange {
        message: String,
        #[source]
        source: Fault,
    },
}

impl Error {
    /// Build a rejection message from the endpoint's optional error fields.
    pub fn rejected(error: Option<&str>, description: Option<&str>) -> Self {
        let mut message = String::new();
        if let Some(error) = error.filter(|e| !e.trim().is_empty()) {
            message.push_str(error);
            message.push_str(": ");
        }
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            message.push_str(description);
        }
        if message.trim().is_empty() {
            message = UNEXPECTED_REJECTION.to_string();
        }
        Error::Rejected(message)
    }

    /// Wrap `source`, appending whatever raw response text was captured.
    pub fn exchange(source: impl Into<Fault>, response_text: &str) -> Self {
        let message = if response_text.trim().is_empty() {
            EXCHANGE_FAILURE.to_string()
        } else {
            format!("{EXCHANGE_FAILURE}: {response_text}")
        };
        Error::Exchange {
            message,
            source: source.into(),
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
