//! Tooling service façade (`services/data/v<version>/tooling`)

use std::sync::Arc;

use common::require_non_blank;
use serde_json::Value;
use sfdc_auth::Authenticator;
use transport::{Method, Transport};
use url::form_urlencoded;

use crate::error::Result;
use crate::executor::{PathResolver, RequestExecutor};
use crate::results::decode;
use crate::version::ApiVersion;

pub struct ToolingApi {
    executor: RequestExecutor,
}

impl ToolingApi {
    pub fn new(
        authenticator: Arc<Authenticator>,
        transport: Arc<dyn Transport>,
        version: ApiVersion,
    ) -> Self {
        Self {
            executor: RequestExecutor::new(
                authenticator,
                transport,
                PathResolver::prefixed(version.tooling_root()),
            ),
        }
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        self.executor.authenticator()
    }

    /// Tooling query, e.g. `SELECT Id, Name FROM ApexClass`.
    pub async fn query(&self, query: &str) -> Result<Value> {
        require_non_blank("query", query)?;
        let body = self.executor.send(Method::GET, "query", &[("q", query)]).await?;
        decode(&body)
    }

    /// Run anonymous Apex and return the compile/execution report.
    pub async fn execute_anonymous(&self, apex: &str) -> Result<Value> {
        require_non_blank("apex", apex)?;
        let encoded: String = form_urlencoded::byte_serialize(apex.as_bytes()).collect();
        let body = self
            .executor
            .send(Method::GET, "executeAnonymous/", &[("anonymousBody", &encoded)])
            .await?;
        decode(&body)
    }
}
