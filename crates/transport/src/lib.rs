//! HTTP transport abstraction for the Salesforce client
//!
//! Defines the `Transport` trait that decouples authentication and request
//! logic from the HTTP stack. `ReqwestTransport` sends over the network;
//! `ScriptedTransport` (behind the `testing` feature) answers from an
//! in-memory script and records every request it receives, which is what
//! the auth and api crates test against.

pub mod network;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use network::ReqwestTransport;
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedTransport;

pub use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
pub use reqwest::{Method, StatusCode};

use std::future::Future;
use std::pin::Pin;

/// Content type for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Content type for the OAuth token exchange.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Errors raised by a transport before a response status is available.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Request body with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub content_type: &'static str,
    pub content: String,
}

impl Body {
    pub fn json(content: String) -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE,
            content,
        }
    }

    pub fn form(content: String) -> Self {
        Self {
            content_type: FORM_CONTENT_TYPE,
            content,
        }
    }
}

/// One outbound HTTP request. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including any query string
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    pub fn bearer(mut self, token: &str) -> Result<Self> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::InvalidRequest(format!("invalid bearer token: {e}")))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// The bearer token carried by this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Status and full body text of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Capability to send one HTTP request and read the whole response.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
/// Timeouts and cancellation belong to the implementation.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>>;
}
