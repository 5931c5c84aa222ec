//! Single logical HTTP call against the FireMon API.
//!
//! A [`Request`] builds its URL from a base and an optional key, retries
//! transient transport failures with exponential backoff, converts any
//! non-2xx status into [`RequestError`], and flattens the server's
//! `{results, total, pageSize}` envelope into one list, fetching trailing
//! pages concurrently.

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::LogLevel;
use crate::error::{Error, RequestError, Result};
use crate::firemon::session::{Body, FilePart, HttpRequest, HttpResponse, Params, Session};

/// Decoded body of a successful PUT or POST.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(Value),
    /// Non-JSON payload, e.g. a file download.
    Content(Vec<u8>),
    Empty,
}

impl Response {
    fn from_body(body: Vec<u8>) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Response::Empty;
        }
        match serde_json::from_slice(&body) {
            Ok(json) => Response::Json(json),
            Err(_) => Response::Content(body),
        }
    }

    /// The JSON body, or an error for any other payload.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Response::Json(json) => Ok(json),
            Response::Content(_) => Err(Error::unexpected("response body is not JSON")),
            Response::Empty => Err(Error::unexpected("response body is empty")),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            Response::Json(json) => Some(json),
            _ => None,
        }
    }
}

/// Paginated list envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageEnvelope {
    results: Vec<Value>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    page_size: Option<u64>,
}

impl PageEnvelope {
    /// Envelope view of `json` when it is one.
    fn parse(json: &Value) -> Option<Self> {
        match json.get("results") {
            Some(Value::Array(_)) => serde_json::from_value(json.clone()).ok(),
            _ => None,
        }
    }
}

/// Number of pages needed for `total` items.
pub(crate) fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size)
}

/// Builder and executor for one logical call.
#[derive(Debug, Clone)]
pub struct Request {
    session: Session,
    url: String,
    filters: Params,
    headers: Option<Params>,
}

impl Request {
    /// Request against `base`; a trailing slash is stripped.
    pub fn new(session: &Session, base: &str) -> Self {
        Self {
            session: session.clone(),
            url: base.trim_end_matches('/').to_string(),
            filters: Vec::new(),
            headers: None,
        }
    }

    /// Append a path segment; a leading slash is stripped.
    pub fn key(mut self, key: impl AsRef<str>) -> Self {
        let key = key.as_ref().trim_start_matches('/');
        if !key.is_empty() {
            self.url = format!("{}/{key}", self.url);
        }
        self
    }

    /// Keep a trailing slash on the final URL.
    pub fn trailing_slash(mut self) -> Self {
        if !self.url.ends_with('/') {
            self.url.push('/');
        }
        self
    }

    /// Query parameters sent with every call, pages included.
    pub fn filters(mut self, filters: Params) -> Self {
        self.filters = filters;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((key.into(), value.to_string()));
        self
    }

    /// Replace the verb-derived headers with these.
    pub fn headers(mut self, headers: Params) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET with the default page size, unwrapping paginated envelopes.
    pub async fn get(&self) -> Result<Value> {
        let page_size = self.session.page_size().to_string();
        self.get_with(vec![("pageSize".to_string(), page_size)]).await
    }

    /// GET with caller-supplied extra parameters instead of the default
    /// page size.
    ///
    /// When the body is an envelope with more than one page, the remaining
    /// pages are fetched concurrently and appended in completion order, so
    /// only the first page keeps the server's ordering.
    pub async fn get_with(&self, add_params: Params) -> Result<Value> {
        let requested_size = add_params
            .iter()
            .find(|(k, _)| k == "pageSize")
            .and_then(|(_, v)| v.parse::<u64>().ok());

        let resp = self.make_call(Method::GET, &add_params, Body::Empty).await?;
        let json: Value = serde_json::from_slice(&resp.body)?;

        let Some(envelope) = PageEnvelope::parse(&json) else {
            return Ok(json);
        };

        let mut results = envelope.results;
        let total = envelope.total.unwrap_or(0);
        let page_size = envelope
            .page_size
            .or(requested_size)
            .unwrap_or(results.len() as u64);

        let pages = page_count(total, page_size);
        if pages > 1 {
            debug!("{}: fetching {} more page(s)", self.url, pages - 1);
            let pages: Vec<Vec<Value>> = stream::iter(1..pages)
                .map(|page| self.fetch_page(page, page_size))
                .buffer_unordered(self.session.concurrency())
                .try_collect()
                .await?;
            for page in pages {
                results.extend(page);
            }
        }

        Ok(Value::Array(results))
    }

    async fn fetch_page(&self, page: u64, page_size: u64) -> Result<Vec<Value>> {
        let params = vec![
            ("page".to_string(), page.to_string()),
            ("pageSize".to_string(), page_size.to_string()),
        ];
        let resp = self.make_call(Method::GET, &params, Body::Empty).await?;
        let json: Value = serde_json::from_slice(&resp.body)?;
        PageEnvelope::parse(&json)
            .map(|envelope| envelope.results)
            .ok_or_else(|| Error::unexpected(format!("page {page} of {} is not paginated", self.url)))
    }

    /// `total` of the collection without materialising it.
    pub async fn get_count(&self) -> Result<u64> {
        let resp = self.make_call(Method::GET, &[], Body::Empty).await?;
        let json: Value = serde_json::from_slice(&resp.body)?;
        json.get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::unexpected(format!("{} returned no total", self.url)))
    }

    /// Raw bytes; no JSON decoding and no page parameters.
    pub async fn get_content(&self) -> Result<Vec<u8>> {
        let resp = self.make_call(Method::GET, &[], Body::Empty).await?;
        Ok(resp.body)
    }

    pub async fn put(&self, body: Body) -> Result<Response> {
        let resp = self.make_call(Method::PUT, &[], body).await?;
        Ok(Response::from_body(resp.body))
    }

    pub async fn put_json(&self, json: &Value) -> Result<Response> {
        self.put(Body::Json(json.clone())).await
    }

    pub async fn post(&self, body: Body) -> Result<Response> {
        let resp = self.make_call(Method::POST, &[], body).await?;
        Ok(Response::from_body(resp.body))
    }

    pub async fn post_json(&self, json: &Value) -> Result<Response> {
        self.post(Body::Json(json.clone())).await
    }

    pub async fn post_files(&self, files: Vec<FilePart>) -> Result<Response> {
        self.post(Body::Multipart(files)).await
    }

    /// DELETE; true on any 2xx, whatever the body.
    pub async fn delete(&self) -> Result<bool> {
        self.make_call(Method::DELETE, &[], Body::Empty).await?;
        Ok(true)
    }

    /// POST returning the raw response, headers included.
    pub async fn post_raw(&self, body: Body) -> Result<HttpResponse> {
        self.make_call(Method::POST, &[], body).await
    }

    /// Call with an arbitrary verb.
    pub async fn send(&self, method: Method, body: Body) -> Result<Response> {
        if method == Method::GET {
            return self.get().await.map(Response::Json);
        }
        let resp = self.make_call(method, &[], body).await?;
        Ok(Response::from_body(resp.body))
    }

    /// One call with retry. Only a typed [`RequestError`] stops retrying
    /// early.
    async fn make_call(
        &self,
        method: Method,
        add_params: &[(String, String)],
        body: Body,
    ) -> Result<HttpResponse> {
        let policy = self.session.retry();
        let mut attempt = 1;
        loop {
            match self.call_once(method.clone(), add_params, body.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        "{} {} failed ({}), attempt {}/{}, retrying in {:?}",
                        method, self.url, e, attempt, policy.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(
        &self,
        method: Method,
        add_params: &[(String, String)],
        body: Body,
    ) -> Result<HttpResponse> {
        let mut query = self.filters.clone();
        for (key, value) in add_params {
            query.retain(|(k, _)| k != key);
            query.push((key.clone(), value.clone()));
        }

        let mut headers: Params = self.session.headers().to_vec();
        let overrides = match &self.headers {
            Some(custom) => custom.clone(),
            None => default_headers(&method, &body),
        };
        for (name, value) in overrides {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }

        let full_url = if query.is_empty() {
            self.url.clone()
        } else {
            let qs = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            format!("{}?{qs}", self.url)
        };
        info!("{}: {}", method, full_url);

        let described = body.describe();
        if self.session.log_level() == LogLevel::Debug {
            if let Some(payload) = &described {
                debug!("Payload: {payload}");
            }
        }
        debug!(
            "Sent headers: {:?}",
            headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>()
        );

        let resp = self
            .session
            .transport()
            .send(HttpRequest {
                method,
                url: self.url.clone(),
                query,
                headers,
                body,
            })
            .await?;

        debug!("{} returned {}", full_url, resp.status);
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(RequestError::new(resp.status, &full_url, described, &resp.body).into())
        }
    }
}

fn default_headers(method: &Method, body: &Body) -> Params {
    match (method, body) {
        // reqwest writes the multipart boundary itself.
        (_, Body::Multipart(_)) => Vec::new(),
        (_, Body::Form(_)) => vec![("Accept".to_string(), "application/json".to_string())],
        (&Method::POST | &Method::PUT, _) => {
            vec![("Content-Type".to_string(), "application/json".to_string())]
        }
        _ => vec![("Accept".to_string(), "application/json".to_string())],
    }
}
