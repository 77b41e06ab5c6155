//! Salesforce OAuth authentication library
//!
//! Implements the username-password flow against a Salesforce token endpoint
//! and caches the resulting bearer credential. The API crate asks the
//! `Authenticator` for a credential before every request and forces a fresh
//! exchange when the server answers 401.
//!
//! Credential flow:
//! 1. Caller builds a `PasswordGrant` and an `Authenticator` for a token endpoint
//! 2. `Authenticator::credential()` exchanges on first use and caches the result
//! 3. Later calls reuse the cache until the `ReauthFrequency` policy says it is due
//! 4. `Authenticator::authenticate()` forces a new exchange (used after a 401)

pub mod authenticator;
pub mod constants;
pub mod credential;
pub mod error;

pub use authenticator::{Authenticator, PasswordGrant, ReauthFrequency};
pub use constants::*;
pub use credential::{Credential, EpochMillis, TokenResponse};
pub use error::{Error, Result};
