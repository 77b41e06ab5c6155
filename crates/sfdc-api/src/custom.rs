//! Custom Apex REST façade (`services/apexrest`)
//!
//! Bodies are returned as text; callers decode whatever their endpoint
//! produces.

use std::sync::Arc;

use serde_json::Value;
use sfdc_auth::Authenticator;
use transport::{Method, Transport};

use crate::error::Result;
use crate::executor::{PathResolver, RequestExecutor};

pub const APEX_REST_ROOT: &str = "services/apexrest";

pub struct CustomApi {
    executor: RequestExecutor,
}

impl CustomApi {
    pub fn new(authenticator: Arc<Authenticator>, transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: RequestExecutor::new(
                authenticator,
                transport,
                PathResolver::prefixed(APEX_REST_ROOT),
            ),
        }
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        self.executor.authenticator()
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        self.executor.send(Method::GET, path, query).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<String> {
        self.executor.send_with_body(Method::POST, path, body).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<String> {
        self.executor.send_with_body(Method::PATCH, path, body).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<String> {
        self.executor.send_with_body(Method::PUT, path, body).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        self.executor.send(Method::DELETE, path, query).await
    }
}
