use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::LogLevel;
use crate::error::{Error, Result};

const CONFIG_DIR: &str = "firemon-api";
const CONFIG_FILE: &str = "config.json";

/// Exponential backoff applied to transient transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Base delay doubled on every attempt.
    #[serde(with = "secs")]
    pub multiplier: Duration,
    /// Floor for any single wait.
    #[serde(with = "secs")]
    pub min: Duration,
    /// Ceiling for any single wait.
    #[serde(with = "secs")]
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min: Duration::from_secs(4),
            max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Wait before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.multiplier.saturating_mul(factor);
        delay.min(self.max).max(self.min)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        f64::deserialize(d).map(Duration::from_secs_f64)
    }
}

/// Connection settings for a FireMon host.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Host, `host:port`, or full URL.
    pub host: String,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Reject invalid TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Domain used for domain-scoped URLs.
    #[serde(default = "default_domain")]
    pub domain_id: i64,
    /// `ip:port` of an HTTP(S) proxy.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Default `pageSize` for list requests.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pages fetched concurrently after the first.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_timeout() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_domain() -> i64 {
    1
}

fn default_page_size() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}

impl ClientConfig {
    /// Config for `host` with every other setting at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            domain_id: default_domain(),
            proxy: None,
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid {}: {e}", path.display())))
    }

    /// Read `<config dir>/firemon-api/config.json`.
    pub fn load_default() -> Result<Self> {
        let path = default_path()
            .ok_or_else(|| Error::Config("No config directory on this platform".to_string()))?;
        Self::from_file(&path)
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn domain_id(mut self, id: i64) -> Self {
        self.domain_id = id;
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Scheme and authority of the host, `https` when none is given.
    pub fn base_url(&self) -> String {
        let host = self.host.trim();
        match host.split_once("://") {
            Some((scheme, rest)) => {
                let authority = rest.split('/').next().unwrap_or(rest);
                format!("{scheme}://{authority}")
            }
            None => format!("https://{}", host.trim_end_matches('/')),
        }
    }

    /// Host name without scheme or port.
    pub fn host_name(&self) -> String {
        let base = self.base_url();
        let authority = base.split_once("://").map_or(base.as_str(), |(_, a)| a);
        authority.split(':').next().unwrap_or(authority).to_string()
    }
}

/// Location of the default config file.
pub fn default_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Some(path)
}
