//! Credential issued by the token endpoint
//!
//! A `Credential` is built once per successful exchange from the endpoint's
//! JSON answer and never changes afterwards. The authenticator hands out
//! `Arc<Credential>` clones; a newer exchange replaces the cached `Arc`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{Secret, require_absolute_url};
use serde::Deserialize;

use crate::error::{Error, Fault};

/// Successful token endpoint response.
///
/// `refresh_token` is the only optional field; the others are required and a
/// missing one fails the decode.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    pub id: String,
    pub issued_at: EpochMillis,
    pub signature: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Issue time in unix milliseconds. Salesforce sends it as a string; a bare
/// number is accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochMillis(pub u64);

impl<'de> Deserialize<'de> for EpochMillis {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(EpochMillis(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(EpochMillis)
                .map_err(|e| serde::de::Error::custom(format!("invalid issued_at '{s}': {e}"))),
        }
    }
}

/// Error-shaped token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<ErrorResponse> for Error {
    fn from(response: ErrorResponse) -> Self {
        Error::rejected(
            response.error.as_deref(),
            response.error_description.as_deref(),
        )
    }
}

/// Bearer credential for one Salesforce instance.
#[derive(Debug, Clone)]
pub struct Credential {
    token: Secret<String>,
    issued_at: u64,
    instance_url: String,
    signature: String,
    id: String,
    refresh_token: Option<Secret<String>>,
}

impl Credential {
    /// Validate a decoded token response and build the credential.
    ///
    /// The access token must be non-blank and `instance_url` absolute.
    pub fn from_response(response: TokenResponse) -> std::result::Result<Self, Fault> {
        if response.access_token.trim().is_empty() {
            return Err("token response has an empty 'access_token'".into());
        }
        require_absolute_url("instance_url", &response.instance_url)?;

        Ok(Self {
            token: Secret::new(response.access_token),
            issued_at: response.issued_at.0,
            instance_url: response.instance_url,
            signature: response.signature,
            id: response.id,
            refresh_token: response.refresh_token.map(Secret::new),
        })
    }

    /// Bearer token for `Authorization: Bearer <token>`.
    pub fn token(&self) -> &str {
        self.token.expose()
    }

    /// Issue time in unix milliseconds, as reported by the server.
    pub fn issued_at_millis(&self) -> u64 {
        self.issued_at
    }

    pub fn issued_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.issued_at)
    }

    /// Base URL every API request is rooted at.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Identity URL of the authenticated user.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose().as_str())
    }

    /// Time since issue according to `now_millis`; zero if the server clock is ahead.
    pub fn age_at(&self, now_millis: u64) -> Duration {
        Duration::from_millis(now_millis.saturating_sub(self.issued_at))
    }
}
