//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::firemon::session::{Context, HttpRequest, HttpResponse, Session, Transport};

pub(crate) const BASE: &str = "https://fm.test";

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Replays queued outcomes in order, then falls back to a responder.
pub(crate) struct FakeTransport {
    queue: Mutex<VecDeque<Result<HttpResponse>>>,
    fallback: Mutex<Option<Responder>>,
    calls: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Hold every call open for `latency` before answering.
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Most calls that were open at the same time.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn push_json(&self, status: u16, json: Value) {
        self.push(Ok(response(status, json.to_string().into_bytes())));
    }

    pub(crate) fn push_bytes(&self, status: u16, body: &[u8]) {
        self.push(Ok(response(status, body.to_vec())));
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.push(Err(Error::transport(message)));
    }

    pub(crate) fn push(&self, outcome: Result<HttpResponse>) {
        self.queue.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn respond_with<F>(&self, f: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        *self.fallback.lock().unwrap() = Some(Box::new(f));
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub(crate) fn response(status: u16, body: Vec<u8>) -> HttpResponse {
    HttpResponse {
        status,
        url: String::new(),
        headers: Vec::new(),
        body,
    }
}

pub(crate) fn json_response(status: u16, json: &Value) -> HttpResponse {
    response(status, json.to_string().into_bytes())
}

/// Query parameter value of a recorded request.
pub(crate) fn query_value<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            let open = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(open, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        let queued = self.queue.lock().unwrap().pop_front();
        if let Some(outcome) = queued {
            return outcome;
        }
        match self.fallback.lock().unwrap().as_ref() {
            Some(responder) => responder(&request),
            None => Err(Error::transport(format!("no scripted response for {}", request.url))),
        }
    }
}

pub(crate) fn session(transport: &Arc<FakeTransport>) -> Session {
    Session::new(transport.clone(), &ClientConfig::new("fm.test"))
        .with_retry(RetryPolicy::immediate(5))
}

pub(crate) fn context(transport: &Arc<FakeTransport>) -> Context {
    let app_url = format!("{BASE}/securitymanager/api");
    Context {
        session: session(transport),
        base_url: BASE.to_string(),
        domain_url: Some(format!("{app_url}/domain/1")),
        app_url,
    }
}
