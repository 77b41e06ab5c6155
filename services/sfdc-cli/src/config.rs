//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret and password come from SFDC_CLIENT_SECRET /
//! SFDC_PASSWORD or from `*_file` paths, never from the TOML itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use sfdc_api::ApiVersion;
use sfdc_auth::{PRODUCTION_TOKEN_ENDPOINT, ReauthFrequency};

pub const CLIENT_SECRET_ENV: &str = "SFDC_CLIENT_SECRET";
pub const PASSWORD_ENV: &str = "SFDC_PASSWORD";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Password-grant settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub username: String,
    /// Token endpoint; `https://test.salesforce.com/...` for sandboxes
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    /// Re-exchange once the credential is this old. `0` exchanges before
    /// every request; absent keeps the credential until a 401.
    #[serde(default)]
    pub reauth_frequency_secs: Option<u64>,
}

/// REST API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_version")]
    pub version: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    PRODUCTION_TOKEN_ENDPOINT.to_string()
}

fn default_version() -> f64 {
    44.0
}

fn default_timeout() -> u64 {
    60
}

impl AuthConfig {
    pub fn reauth_frequency(&self) -> ReauthFrequency {
        self.reauth_frequency_secs
            .map(|secs| ReauthFrequency::from_duration(Duration::from_secs(secs)))
            .unwrap_or_default()
    }
}

impl ApiConfig {
    pub fn api_version(&self) -> common::Result<ApiVersion> {
        ApiVersion::new(self.version).map_err(|e| common::Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order, for both the client secret and the password:
    /// 1. env var (SFDC_CLIENT_SECRET / SFDC_PASSWORD)
    /// 2. `*_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.auth.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        if config.auth.username.trim().is_empty() {
            return Err(common::Error::Config("username must not be empty".into()));
        }

        if !config.auth.endpoint.starts_with("http://")
            && !config.auth.endpoint.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "endpoint must start with http:// or https://, got: {}",
                config.auth.endpoint
            )));
        }

        config.api.api_version()?;

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        config.auth.client_secret = Some(resolve_secret(
            "client_secret",
            CLIENT_SECRET_ENV,
            config.auth.client_secret_file.as_deref(),
        )?);
        config.auth.password = Some(resolve_secret(
            "password",
            PASSWORD_ENV,
            config.auth.password_file.as_deref(),
        )?);

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("sfdc.toml")
    }
}

/// Env var takes precedence over file; a blank value counts as unset.
fn resolve_secret(
    name: &str,
    env_var: &str,
    file: Option<&Path>,
) -> common::Result<Secret<String>> {
    if let Ok(value) = std::env::var(env_var) {
        let value = Secret::new(value);
        if !value.is_blank() {
            return Ok(value);
        }
    }
    if let Some(file) = file {
        let contents = std::fs::read_to_string(file).map_err(|e| {
            common::Error::Config(format!("failed to read {name} file {}: {e}", file.display()))
        })?;
        let value = Secret::new(contents.trim().to_owned());
        if !value.is_blank() {
            return Ok(value);
        }
    }
    Err(common::Error::Config(format!(
        "{name} not set: provide {env_var} or auth.{name}_file"
    )))
}
