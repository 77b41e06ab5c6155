//! Salesforce OAuth constants
//!
//! Well-known token endpoints for the username-password flow. Custom My Domain
//! endpoints (`https://<domain>.my.salesforce.com/services/oauth2/token`) work
//! the same way and are passed to the authenticator directly.

/// Token endpoint for production and developer orgs
pub const PRODUCTION_TOKEN_ENDPOINT: &str = "https://login.salesforce.com/services/oauth2/token";

/// Token endpoint for sandbox orgs
pub const SANDBOX_TOKEN_ENDPOINT: &str = "https://test.salesforce.com/services/oauth2/token";

/// OAuth grant type used for every exchange
pub const PASSWORD_GRANT_TYPE: &str = "password";
