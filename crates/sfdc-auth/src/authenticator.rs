//! Username-password OAuth flow with a cached credential
//!
//! The authenticator owns exactly one cached `Credential`. A tokio Mutex
//! guards both the "is the cache still good?" decision and the cache write,
//! so concurrent callers sharing one authenticator never run two exchanges
//! at once and never see a half-replaced credential. Each instance has its
//! own lock; separate authenticators do not serialize against each other.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{Secret, require_absolute_url, require_non_blank};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use transport::{Body, HttpRequest, Method, Transport};
use url::Url;

use crate::constants::PASSWORD_GRANT_TYPE;
use crate::credential::{Credential, ErrorResponse, TokenResponse};
use crate::error::{Error, Result};

/// How often a cached credential is replaced without being asked to.
///
/// The executor re-authenticates on a 401 regardless of this policy, so
/// `Never` is a sensible default for long-running clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReauthFrequency {
    /// Exchange on every `credential()` call
    Always,
    /// Exchange once the credential is at least this old
    Every(Duration),
    /// Keep the first credential until a 401 forces a new one
    #[default]
    Never,
}

impl ReauthFrequency {
    /// `Duration::ZERO` means always, `Duration::MAX` means never.
    pub fn from_duration(frequency: Duration) -> Self {
        if frequency.is_zero() {
            ReauthFrequency::Always
        } else if frequency == Duration::MAX {
            ReauthFrequency::Never
        } else {
            ReauthFrequency::Every(frequency)
        }
    }

    /// Whether `credential` must be replaced at `now_millis`.
    pub fn is_due(&self, credential: &Credential, now_millis: u64) -> bool {
        match self {
            ReauthFrequency::Always => true,
            ReauthFrequency::Every(frequency) => credential.age_at(now_millis) >= *frequency,
            ReauthFrequency::Never => false,
        }
    }
}

/// Client and user secrets for the password grant.
#[derive(Debug)]
pub struct PasswordGrant {
    client_id: String,
    client_secret: Secret<String>,
    username: String,
    password: Secret<String>,
}

impl PasswordGrant {
    /// All four values must be non-blank.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        username: impl Into<String>,
        password: Secret<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let username = username.into();
        require_non_blank("client_id", &client_id)?;
        require_non_blank("client_secret", client_secret.expose())?;
        require_non_blank("username", &username)?;
        require_non_blank("password", password.expose())?;
        Ok(Self {
            client_id,
            client_secret,
            username,
            password,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `application/x-www-form-urlencoded` body for the token endpoint.
    fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", PASSWORD_GRANT_TYPE)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", self.client_secret.expose())
            .append_pair("username", &self.username)
            .append_pair("password", self.password.expose())
            .finish()
    }
}

/// Obtains, caches and refreshes the bearer credential.
pub struct Authenticator {
    grant: PasswordGrant,
    endpoint: Url,
    frequency: ReauthFrequency,
    transport: Arc<dyn Transport>,
    cached: Mutex<Option<Arc<Credential>>>,
}

impl Authenticator {
    /// `endpoint` must be an absolute token endpoint URL, e.g.
    /// [`PRODUCTION_TOKEN_ENDPOINT`](crate::PRODUCTION_TOKEN_ENDPOINT).
    pub fn new(
        grant: PasswordGrant,
        endpoint: &str,
        frequency: ReauthFrequency,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = require_absolute_url("endpoint", endpoint)?;
        Ok(Self {
            grant,
            endpoint,
            frequency,
            transport,
            cached: Mutex::new(None),
        })
    }

    /// Run the password-grant exchange now, whatever the cache holds.
    ///
    /// On success the new credential replaces the cached one. On failure the
    /// cache is left untouched.
    pub async fn authenticate(&self) -> Result<Arc<Credential>> {
        let mut cached = self.cached.lock().await;
        self.exchange_into(&mut cached).await
    }

    /// Return the cached credential, exchanging first when none is cached or
    /// the reauthentication policy says it is due.
    pub async fn credential(&self) -> Result<Arc<Credential>> {
        let mut cached = self.cached.lock().await;
        match cached.as_ref() {
            Some(credential) if !self.frequency.is_due(credential, now_millis()) => {
                Ok(credential.clone())
            }
            _ => self.exchange_into(&mut cached).await,
        }
    }

    /// The cached credential, if any, without touching the network.
    pub async fn cached(&self) -> Option<Arc<Credential>> {
        self.cached.lock().await.clone()
    }

    pub fn reauth_frequency(&self) -> ReauthFrequency {
        self.frequency
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn username(&self) -> &str {
        self.grant.username()
    }

    /// Must be called with the cache lock held.
    async fn exchange_into(&self, slot: &mut Option<Arc<Credential>>) -> Result<Arc<Credential>> {
        match self.exchange().await {
            Ok(credential) => {
                let credential = Arc::new(credential);
                *slot = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, username = %self.grant.username, error = %e, "authentication failed");
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<Credential> {
        debug!(endpoint = %self.endpoint, username = %self.grant.username, "requesting token");

        let request = HttpRequest::new(Method::POST, self.endpoint.as_str())
            .with_body(Body::form(self.grant.form_body()));
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| Error::exchange(e, ""))?;

        if !response.is_success() {
            let rejection: ErrorResponse = serde_json::from_str(&response.body)
                .map_err(|e| Error::exchange(e, &response.body))?;
            return Err(rejection.into());
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| Error::exchange(e, &response.body))?;
        let credential =
            Credential::from_response(token).map_err(|e| Error::exchange(e, &response.body))?;

        info!(
            instance_url = credential.instance_url(),
            issued_at = credential.issued_at_millis(),
            "authenticated"
        );
        Ok(credential)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
