//! Shared test fixture: one scripted transport serving both the token
//! endpoint and the API instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::Secret;
use sfdc_auth::{Authenticator, PRODUCTION_TOKEN_ENDPOINT, PasswordGrant, ReauthFrequency};
use transport::{HttpRequest, HttpResponse, ScriptedTransport, StatusCode};

pub const INSTANCE: &str = "https://na85.salesforce.com";

pub struct Fixture {
    pub authenticator: Arc<Authenticator>,
    pub transport: Arc<ScriptedTransport>,
}

impl Fixture {
    /// Token exchanges performed so far.
    pub fn auth_count(&self) -> usize {
        self.transport.count_to(PRODUCTION_TOKEN_ENDPOINT)
    }

    /// Requests sent to the instance, oldest first.
    pub fn api_requests(&self) -> Vec<HttpRequest> {
        self.transport
            .requests()
            .into_iter()
            .filter(|r| r.url.starts_with(INSTANCE))
            .collect()
    }
}

fn token_body(token: &str) -> String {
    serde_json::json!({
        "access_token": token,
        "instance_url": INSTANCE,
        "id": "https://login.salesforce.com/id/00D5g000004Fz8xEAC/0055g00000AbCdEAAV",
        "token_type": "Bearer",
        "issued_at": "1551279592382",
        "signature": "dGVzdC1zaWduYXR1cmU="
    })
    .to_string()
}

fn authenticator(transport: Arc<ScriptedTransport>) -> Arc<Authenticator> {
    let grant = PasswordGrant::new(
        "3MVG9client",
        Secret::new("8204173310639812200".into()),
        "admin@example.com",
        Secret::new("hunter2".into()),
    )
    .unwrap();
    Arc::new(
        Authenticator::new(
            grant,
            PRODUCTION_TOKEN_ENDPOINT,
            ReauthFrequency::Never,
            transport,
        )
        .unwrap(),
    )
}

/// Token endpoint issues `at_1`, `at_2`, ...; instance requests are answered
/// from `script` in order.
pub fn fixture(script: Vec<transport::Result<HttpResponse>>) -> Fixture {
    let issued = AtomicUsize::new(0);
    let script = Mutex::new(VecDeque::from(script));
    let transport = Arc::new(ScriptedTransport::from_fn(move |request| {
        if request.url.starts_with(PRODUCTION_TOKEN_ENDPOINT) {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(HttpResponse::new(StatusCode::OK, token_body(&format!("at_{n}"))));
        }
        script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(transport::Error::Http(format!("script exhausted at {}", request.url)))
        })
    }));
    Fixture {
        authenticator: authenticator(transport.clone()),
        transport,
    }
}

/// Token endpoint issues `at_1` once and rejects every later exchange;
/// instance requests are answered from `script` in order.
pub fn single_token_fixture(script: Vec<transport::Result<HttpResponse>>) -> Fixture {
    let issued = AtomicUsize::new(0);
    let script = Mutex::new(VecDeque::from(script));
    let transport = Arc::new(ScriptedTransport::from_fn(move |request| {
        if request.url.starts_with(PRODUCTION_TOKEN_ENDPOINT) {
            if issued.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(HttpResponse::new(StatusCode::OK, token_body("at_1")));
            }
            return Ok(HttpResponse::new(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"authentication failure"}"#,
            ));
        }
        script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(transport::Error::Http(format!("script exhausted at {}", request.url)))
        })
    }));
    Fixture {
        authenticator: authenticator(transport.clone()),
        transport,
    }
}

/// Token endpoint rejects every exchange.
pub fn rejecting_fixture() -> Fixture {
    let transport = Arc::new(ScriptedTransport::from_fn(|_| {
        Ok(HttpResponse::new(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"authentication failure"}"#,
        ))
    }));
    Fixture {
        authenticator: authenticator(transport.clone()),
        transport,
    }
}

pub fn ok(body: &str) -> transport::Result<HttpResponse> {
    Ok(HttpResponse::new(StatusCode::OK, body))
}
