//! The FMOS control panel.
//!
//! The control panel is not domain-scoped and authenticates with the
//! session cookie from [`login_cpl`](crate::auth::login_cpl) instead of
//! Basic auth.

use std::fmt;

use serde_json::Value;

use crate::auth::cpl_url;
use crate::error::Result;
use crate::firemon::apps::App;
use crate::firemon::request::Request;
use crate::firemon::session::Session;

/// Which health checks to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthChecks {
    #[default]
    Default,
    Detailed,
    Full,
}

/// Whether health results may come from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthCache {
    #[default]
    Default,
    Ignore,
    Only,
}

impl fmt::Display for HealthChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthChecks::Default => "default",
            HealthChecks::Detailed => "detailed",
            HealthChecks::Full => "full",
        })
    }
}

impl fmt::Display for HealthCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthCache::Default => "default",
            HealthCache::Ignore => "ignore",
            HealthCache::Only => "only",
        })
    }
}

/// The control panel API.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    app: App,
    root_url: String,
}

impl ControlPanel {
    pub const NAME: &'static str = "controlpanel";

    /// Control panel using `session`, which must already carry the login
    /// cookie.
    pub fn new(session: &Session, base_url: &str, proxied: bool) -> Self {
        let root_url = cpl_url(base_url, proxied);
        let app = App::at(session, base_url, Self::NAME, format!("{root_url}/api"), None);
        Self { app, root_url }
    }

    /// The control panel's API document.
    pub async fn get_api(&self) -> Result<Value> {
        Request::new(&self.app.context().session, &self.root_url)
            .key("api-doc")
            .get()
            .await
    }

    pub async fn health(&self, checks: HealthChecks, cache: HealthCache) -> Result<Value> {
        self.app
            .request(&format!("health/{checks}"))
            .filter("cache", cache)
            .get()
            .await
    }

    pub async fn info(&self) -> Result<Value> {
        self.app.request("info").get().await
    }

    pub async fn state(&self) -> Result<Value> {
        self.app.request("state").get().await
    }

    pub async fn perf(&self) -> Result<Value> {
        self.app.request("perf").get().await
    }

    /// The current control panel session.
    pub async fn session(&self) -> Result<Value> {
        self.app.request("session").get().await
    }
}

impl std::ops::Deref for ControlPanel {
    type Target = App;

    fn deref(&self) -> &App {
        &self.app
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::firemon::testing::{BASE, FakeTransport, query_value, session};

    #[tokio::test]
    async fn health_builds_check_path_and_cache_flag() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"status": "UP"}));
        let cpl = ControlPanel::new(&session(&transport), BASE, false);
        assert_eq!(cpl.domain_url(), None);

        let health = cpl.health(HealthChecks::Full, HealthCache::Ignore).await.unwrap();
        assert_eq!(health["status"], "UP");

        let call = &transport.calls()[0];
        assert_eq!(call.url, "https://fm.test:55555/api/health/full");
        assert_eq!(query_value(call, "cache"), Some("ignore"));
    }

    #[tokio::test]
    async fn proxied_panel_and_api_doc() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"swagger": "2.0"}));
        transport.push_json(200, json!({"user": "admin"}));
        let cpl = ControlPanel::new(&session(&transport), BASE, true);

        cpl.get_api().await.unwrap();
        assert_eq!(cpl.session().await.unwrap()["user"], "admin");

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://fm.test/__fmos-cpl__/api-doc");
        assert_eq!(calls[1].url, "https://fm.test/__fmos-cpl__/api/session");
    }
}
