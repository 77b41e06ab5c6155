//! Data service façade (`services/data/v<version>`)
//!
//! Failures that carry a response body are reported as `DataServiceError`,
//! decoded from the service's `[{message, errorCode}]` array.

use std::sync::Arc;

use common::require_non_blank;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sfdc_auth::Authenticator;
use tracing::debug;
use transport::{Method, Transport};

use crate::error::{Error, Result};
use crate::executor::{PathResolver, RequestExecutor};
use crate::results::{ReadResult, WriteResult, decode};
use crate::version::ApiVersion;

pub struct DataApi {
    executor: RequestExecutor,
    root: String,
}

impl DataApi {
    pub fn new(
        authenticator: Arc<Authenticator>,
        transport: Arc<dyn Transport>,
        version: ApiVersion,
    ) -> Self {
        let root = version.data_root();
        Self {
            executor: RequestExecutor::new(
                authenticator,
                transport,
                PathResolver::prefixed(root.clone()),
            ),
            root,
        }
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        self.executor.authenticator()
    }

    /// e.g. `services/data/v44.0`
    pub fn service_root(&self) -> &str {
        &self.root
    }

    async fn send(&self, method: Method, path: &str, query: &[(&str, &str)]) -> Result<String> {
        self.executor
            .send(method, path, query)
            .await
            .map_err(Error::into_data_service)
    }

    async fn send_with_body(&self, method: Method, path: &str, body: &Value) -> Result<String> {
        self.executor
            .send_with_body(method, path, body)
            .await
            .map_err(Error::into_data_service)
    }

    /// GET any path under the service root.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let body = self.send(Method::GET, path, &[]).await?;
        decode(&body)
    }

    pub async fn describe(&self, type_name: &str) -> Result<Value> {
        require_non_blank("type_name", type_name)?;
        let body = self
            .send(Method::GET, &format!("sobjects/{type_name}/describe"), &[])
            .await?;
        decode(&body)
    }

    /// Run a SOQL query. The statement is sent as-is in `q=`.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<ReadResult<T>> {
        require_non_blank("soql", soql)?;
        let body = self.send(Method::GET, "query", &[("q", soql)]).await?;
        decode(&body)
    }

    /// Run a query that must return exactly one record.
    pub async fn query_single<T: DeserializeOwned>(&self, soql: &str) -> Result<T> {
        let result = self.query::<T>(soql).await?;
        if !result.done {
            return Err(Error::InvalidOperation(format!("Query failed: {soql}")));
        }
        let count = result.records.len();
        let [record] = <[T; 1]>::try_from(result.records).map_err(|_| {
            Error::InvalidOperation(format!(
                "Expected to receive 1 record but received {count} with query {soql}"
            ))
        })?;
        Ok(record)
    }

    /// Fetch the page named by a previous result's `nextRecordsUrl`.
    ///
    /// Accepts the URL as returned (`/services/data/v44.0/query/01g...-2000`)
    /// or already relative to the service root.
    pub async fn next_page<T: DeserializeOwned>(
        &self,
        next_records_url: &str,
    ) -> Result<ReadResult<T>> {
        require_non_blank("next_records_url", next_records_url)?;
        let suffix = self.relative_to_root(next_records_url);
        debug!(suffix = %suffix, "fetching next page");
        let body = self.send(Method::GET, suffix, &[]).await?;
        decode(&body)
    }

    fn relative_to_root<'a>(&self, url: &'a str) -> &'a str {
        let url = url.trim_start_matches('/');
        url.strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(url)
    }

    /// Read one record with every field its type describes.
    pub async fn select_all_fields(&self, type_name: &str, id: &str) -> Result<Value> {
        require_non_blank("type_name", type_name)?;
        require_non_blank("id", id)?;

        let description = self.describe(type_name).await?;
        let fields = description
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::InvalidOperation("Expected describe result to contain fields".into())
            })?;
        let names = fields
            .iter()
            .map(|field| {
                field.get("name").and_then(Value::as_str).ok_or_else(|| {
                    Error::Decode(format!("describe field without a name: {field}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let soql = format!(
            "SELECT {} FROM {type_name} WHERE Id = '{id}'",
            names.join(",")
        );
        let result = self.query::<Value>(&soql).await?;
        let [record] = <[Value; 1]>::try_from(result.records).map_err(|_| {
            Error::InvalidOperation(format!("Could not retrieve '{type_name}' '{id}'"))
        })?;
        Ok(record)
    }

    /// Create a record and return its id.
    pub async fn create(&self, type_name: &str, record: &Value) -> Result<String> {
        require_non_blank("type_name", type_name)?;
        let body = self
            .send_with_body(Method::POST, &format!("sobjects/{type_name}"), record)
            .await?;
        let result: WriteResult = decode(&body)?;
        Ok(result.id)
    }

    pub async fn update(&self, type_name: &str, id: &str, record: &Value) -> Result<()> {
        require_non_blank("type_name", type_name)?;
        require_non_blank("id", id)?;
        self.send_with_body(Method::PATCH, &format!("sobjects/{type_name}/{id}"), record)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, type_name: &str, id: &str) -> Result<()> {
        require_non_blank("type_name", type_name)?;
        require_non_blank("id", id)?;
        self.send(Method::DELETE, &format!("sobjects/{type_name}/{id}"), &[])
            .await?;
        Ok(())
    }
}
