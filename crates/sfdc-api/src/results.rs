//! Response envelopes shared by the data and tooling services

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// One page of query results.
///
/// `next_records_url` is present only while `done` is false; pass it to
/// `DataApi::next_page` to fetch the following page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult<T> {
    pub done: bool,
    pub total_size: u64,
    #[serde(default)]
    pub next_records_url: Option<String>,
    pub records: Vec<T>,
}

/// Outcome of a create.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteResult {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Decode(format!("{e}: {body}")))
}
