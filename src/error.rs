//! Error types for the FireMon client.
//!
//! Every public operation returns `Result<T, Error>`. A non-2xx response is
//! always an [`Error::Request`]; transport failures are the only retried
//! class.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A non-success HTTP response.
///
/// Carries the status, the request URL and body, and the server's error
/// payload decoded as JSON when possible.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RequestError {
    /// HTTP status code.
    pub status: u16,
    /// Full request URL, query string included.
    pub url: String,
    /// Body that was sent, if any.
    pub request_body: Option<String>,
    /// Raw response text.
    pub text: String,
    /// Response body decoded as JSON.
    pub details: Option<Value>,
    message: String,
}

impl RequestError {
    /// Build the error from a failed response.
    pub fn new(status: u16, url: &str, request_body: Option<String>, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body).into_owned();
        let details = serde_json::from_slice::<Value>(body).ok();
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");

        let message = if status == 404 {
            format!("The requested url: {url} could not be found.")
        } else {
            match &details {
                Some(json) => format!("The request failed with code {status} {reason}: {json}"),
                None => format!(
                    "The request failed with code {status} {reason} but more specific \
                     details were not returned in json."
                ),
            }
        };

        Self {
            status,
            url: url.to_string(),
            request_body,
            text,
            details,
            message,
        }
    }

    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// The main error type for the FireMon client
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error(
        "get() returned {count} results. Check that the filter is valid for this \
         endpoint or use filter() or all() instead."
    )]
    AmbiguousQuery { count: usize },

    #[error("{0}")]
    Usage(String),

    #[error("{resource} does not support {operation}")]
    Unsupported {
        resource: String,
        operation: &'static str,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(resource: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            resource: resource.into(),
            operation,
        }
    }

    /// Create an unexpected-response error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    /// Anything except a clean HTTP error response may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Request(_))
    }

    /// The HTTP status carried by a request error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request(e) => Some(e.status),
            _ => None,
        }
    }

    /// True when this is a 404 request error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Request(e) if e.is_not_found())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// Result type alias for the FireMon client
pub type Result<T> = std::result::Result<T, Error>;
