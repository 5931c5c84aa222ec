/// Authentication helpers for Security Manager and the control panel.
pub mod auth;
/// Client configuration and retry policy.
pub mod config;
/// Error types shared by every operation.
pub mod error;
/// FireMon applications, the record/endpoint binding layer and resources.
pub mod firemon;

pub use config::{ClientConfig, RetryPolicy};
pub use error::{Error, RequestError, Result};
pub use firemon::api::FiremonApi;

/// Logging verbosity for SDK operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Emit verbose debug output, including request payloads.
    Debug,
    /// Emit standard informational output.
    Information,
}

impl Default for LogLevel {
    /// Defaults to `Information` logging.
    fn default() -> Self {
        LogLevel::Information
    }
}
