//! In-memory transport that answers from a script.
//!
//! Every request is recorded before the script is consulted, so tests can
//! assert on how many exchanges happened and what they carried.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use crate::{Error, HttpRequest, HttpResponse, Result, Transport};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync;

pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Answer each request with `responder(&request)`.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Answer requests with `responses` in order. Once the script runs out,
    /// every further request fails with `Error::Http`.
    pub fn sequence(responses: Vec<Result<HttpResponse>>) -> Self {
        let script = Mutex::new(VecDeque::from(responses));
        Self::from_fn(move |request| {
            script
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or_else(|| {
                    Err(Error::Http(format!(
                        "script exhausted at {} {}",
                        request.method, request.url
                    )))
                })
        })
    }

    /// Sleep for `latency` before answering, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Snapshot of all requests received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of recorded requests whose URL starts with `prefix`.
    pub fn count_to(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            (self.responder)(&request)
        })
    }
}
