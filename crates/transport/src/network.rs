//! Network transport backed by `reqwest::Client`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::{Error, HttpRequest, HttpResponse, Result, Transport};

/// Sends requests with a shared `reqwest::Client`.
///
/// The client is cheap to clone; one instance should be shared by the
/// authenticator and every API façade so connections are pooled.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self::new(client))
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = self.client.request(method.clone(), url.as_str()).headers(headers);
            if let Some(body) = body {
                builder = builder
                    .header(CONTENT_TYPE, body.content_type)
                    .body(body.content);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| Error::Http(format!("{method} {url}: {e}")))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| Error::Http(format!("reading response body: {e}")))?;

            debug!(%method, status = status.as_u16(), bytes = body.len(), "response received");
            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Body, Method, StatusCode};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn passes_status_and_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v44.0/sobjects/Contact/describe"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"Contact"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let request = HttpRequest::new(
            Method::GET,
            format!("{}/services/data/v44.0/sobjects/Contact/describe", server.uri()),
        )
        .bearer("tok")
        .unwrap();

        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, r#"{"name":"Contact"}"#);
    }

    #[tokio::test]
    async fn sends_body_with_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(body_string(r#"{"LastName":"Smith"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"003"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let request = HttpRequest::new(Method::POST, server.uri())
            .with_body(Body::json(r#"{"LastName":"Smith"}"#.into()));

        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn error_statuses_are_responses_not_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#),
            )
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let response = transport
            .send(HttpRequest::new(Method::GET, server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.body.contains("INVALID_SESSION_ID"));
    }

    #[tokio::test]
    async fn connection_failure_is_http_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();
        let result = transport
            .send(HttpRequest::new(Method::GET, format!("http://{addr}/")))
            .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
