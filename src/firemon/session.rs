//! Shared HTTP session and the transport seam underneath it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::Value;

use crate::LogLevel;
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Error, Result};

/// Ordered query parameters or form fields.
pub type Params = Vec<(String, String)>;

/// One file of a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
            mime: "application/octet-stream".to_string(),
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Form(Params),
    Multipart(Vec<FilePart>),
}

impl Body {
    /// Payload rendered for logs and error reports. Multipart content is not.
    pub fn describe(&self) -> Option<String> {
        match self {
            Body::Empty => None,
            Body::Json(json) => Some(json.to_string()),
            Body::Form(fields) => Some(
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
            Body::Multipart(files) => Some(format!("<{} file(s)>", files.len())),
        }
    }
}

/// A fully-resolved HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Params,
    pub headers: Params,
    pub body: Body,
}

/// Raw HTTP response as returned by a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub headers: Params,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All values of a header, case-insensitive.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends one HTTP request. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("firemon-api-client/{}", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!config.verify_tls);

        if let Some(proxy) = &config.proxy {
            let url = if proxy.contains("://") {
                proxy.clone()
            } else {
                format!("http://{proxy}")
            };
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut req = self.client.request(request.method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        req = match request.body {
            Body::Empty => req,
            Body::Json(json) => req.json(&json),
            Body::Form(fields) => req.form(&fields),
            Body::Multipart(files) => {
                let mut form = Form::new();
                for file in files {
                    let part = Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.mime)?;
                    form = form.part(file.field, part);
                }
                req.multipart(form)
            }
        };

        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Shared, immutable HTTP state.
///
/// Cloning is cheap; every request spawned from one client shares the
/// transport and default headers.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    headers: Arc<Params>,
    page_size: u32,
    concurrency: usize,
    retry: RetryPolicy,
    log_level: LogLevel,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        let headers = vec![
            ("Accept-Encoding".to_string(), "gzip, deflate".to_string()),
            ("Accept".to_string(), "*/*".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
        ];
        Self {
            transport,
            headers: Arc::new(headers),
            page_size: config.page_size.max(1),
            concurrency: config.concurrency.max(1),
            retry: config.retry.clone(),
            log_level: config.log_level,
        }
    }

    /// Session with a default header added or replaced.
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut headers: Params = self
            .headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        headers.push((name.to_string(), value.into()));
        Self {
            headers: Arc::new(headers),
            ..self.clone()
        }
    }

    /// Session sending HTTP Basic credentials on every call.
    pub fn with_basic_auth(&self, username: &str, password: &str) -> Self {
        self.with_header(
            "Authorization",
            crate::auth::basic_auth_header(username, password),
        )
    }

    pub fn with_retry(&self, retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Session")
            .field("headers", &names)
            .field("page_size", &self.page_size)
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// URL-building context handed to every record and endpoint.
#[derive(Debug, Clone)]
pub struct Context {
    pub session: Session,
    pub base_url: String,
    pub app_url: String,
    pub domain_url: Option<String>,
}

impl Context {
    /// Domain URL, or a usage error for apps without one.
    pub fn require_domain_url(&self) -> Result<&str> {
        self.domain_url
            .as_deref()
            .ok_or_else(|| Error::usage(format!("{} has no domain context", self.app_url)))
    }
}
