//! Salesforce REST API façades
//!
//! Every façade owns a `RequestExecutor` bound to one service root and a
//! shared `Authenticator`. Each request:
//! 1. asks the authenticator for the current credential
//! 2. sends to `<instance_url>/<service root>/<path>` with a bearer token
//! 3. on 401, forces one re-authentication and resends once
//! 4. strips one pair of enclosing quotes from the success body
//!
//! `DataApi` decodes error bodies into `DataServiceError`; `ToolingApi` and
//! `CustomApi` report the raw `RemoteServiceError`.

pub mod custom;
pub mod data;
pub mod error;
pub mod executor;
pub mod results;
pub mod tooling;
pub mod version;

#[cfg(test)]
mod testing;

pub use custom::{APEX_REST_ROOT, CustomApi};
pub use data::DataApi;
pub use error::{DataErrorEntry, DataServiceError, Error, RemoteServiceError, Result, SERVICE_NAME};
pub use executor::{PathResolver, RequestExecutor, strip_enclosing_quotes};
pub use results::{ReadResult, WriteResult};
pub use tooling::ToolingApi;
pub use version::ApiVersion;
