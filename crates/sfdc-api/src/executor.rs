//! Authenticated request execution with a single retry after 401
//!
//! Each logical request runs as at most two attempts:
//! 1. `attempt(is_retry = false)` with the current credential
//! 2. on 401, force `Authenticator::authenticate()` and run
//!    `attempt(is_retry = true)` with the same method, URL and body
//!
//! A 401 on the second attempt is a failure like any other non-2xx status.
//! Requests are not serialized against each other; only the authenticator's
//! exchanges are.

use std::fmt;
use std::sync::Arc;

use common::{ArgumentError, require_non_blank};
use sfdc_auth::Authenticator;
use tracing::{debug, info, warn};
use transport::{Body, HttpRequest, Method, StatusCode, Transport};

use crate::error::{RemoteServiceError, Result};

/// Maps a service-relative path to a path under the instance URL.
#[derive(Clone)]
pub struct PathResolver(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl PathResolver {
    /// Use paths as given.
    pub fn identity() -> Self {
        Self::from_fn(|suffix| suffix.to_string())
    }

    /// Prefix every path with a fixed service root such as `services/apexrest`.
    pub fn prefixed(root: impl Into<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        Self::from_fn(move |suffix| format!("{root}/{}", suffix.trim_start_matches('/')))
    }

    pub fn from_fn<F>(resolve: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(resolve))
    }

    pub fn resolve(&self, suffix: &str) -> String {
        (self.0)(suffix)
    }
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathResolver").field(&self.resolve("")).finish()
    }
}

/// Everything needed to rebuild the request for a retry.
struct Prepared {
    method: Method,
    url: String,
    body: Option<Body>,
}

enum Attempt {
    Success(String),
    /// First attempt came back 401; the caller may re-authenticate and retry.
    Unauthorized(RemoteServiceError),
}

/// Sends authenticated requests for one service root.
pub struct RequestExecutor {
    authenticator: Arc<Authenticator>,
    transport: Arc<dyn Transport>,
    resolver: PathResolver,
}

impl RequestExecutor {
    pub fn new(
        authenticator: Arc<Authenticator>,
        transport: Arc<dyn Transport>,
        resolver: PathResolver,
    ) -> Self {
        Self {
            authenticator,
            transport,
            resolver,
        }
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Send a body-less request. `query` pairs are appended as `?k=v&k=v`
    /// verbatim, in slice order.
    pub async fn send(&self, method: Method, path: &str, query: &[(&str, &str)]) -> Result<String> {
        require_non_blank("path", path)?;
        self.execute(method, path, query, None).await
    }

    /// Send `body` as compact UTF-8 JSON.
    pub async fn send_with_body(
        &self,
        method: Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        require_non_blank("path", path)?;
        let json = serde_json::to_string(body)
            .map_err(|e| ArgumentError::new("body", format!("not serializable: {e}")))?;
        self.execute(method, path, &[], Some(Body::json(json))).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<String> {
        let credential = self.authenticator.credential().await?;
        let prepared = Prepared {
            method,
            url: build_url(credential.instance_url(), &self.resolver.resolve(path), query),
            body,
        };

        match self.attempt(&prepared, credential.token(), false).await? {
            Attempt::Success(body) => Ok(body),
            Attempt::Unauthorized(_) => {
                info!(method = %prepared.method, url = %prepared.url, "received 401, re-authenticating");
                let fresh = self.authenticator.authenticate().await?;
                match self.attempt(&prepared, fresh.token(), true).await? {
                    Attempt::Success(body) => Ok(body),
                    Attempt::Unauthorized(remote) => Err(remote.into()),
                }
            }
        }
    }

    /// One send. Never yields `Unauthorized` when `is_retry` is set.
    async fn attempt(&self, prepared: &Prepared, token: &str, is_retry: bool) -> Result<Attempt> {
        let mut request = HttpRequest::new(prepared.method.clone(), prepared.url.as_str()).bearer(token)?;
        if let Some(body) = &prepared.body {
            request = request.with_body(body.clone());
        }

        debug!(method = %prepared.method, url = %prepared.url, retry = is_retry, "sending request");
        let response = self.transport.send(request).await?;

        if response.is_success() {
            return Ok(Attempt::Success(strip_enclosing_quotes(&response.body).to_string()));
        }

        let remote = RemoteServiceError::new(prepared.method.clone(), response.status, response.body);
        if remote.status == StatusCode::UNAUTHORIZED && !is_retry {
            return Ok(Attempt::Unauthorized(remote));
        }

        warn!(
            method = %prepared.method,
            url = %prepared.url,
            status = remote.status.as_u16(),
            retry = is_retry,
            "request failed"
        );
        Err(remote.into())
    }
}

/// `<base>/<path>` joined on a single slash, plus the raw query string.
fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> String {
    let mut url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if !query.is_empty() {
        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        url.push('?');
        url.push_str(&pairs.join("&"));
    }
    url
}

/// Remove one leading and one trailing `"` if present.
///
/// Scalar results come back quoted. The trim is applied to every body,
/// including JSON documents that happen to start or end with a quote.
pub fn strip_enclosing_quotes(body: &str) -> &str {
    let body = body.strip_prefix('"').unwrap_or(body);
    body.strip_suffix('"').unwrap_or(body)
}
