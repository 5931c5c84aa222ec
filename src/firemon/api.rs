//! Client entry point.

use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use crate::auth::{self, DomainInfo, VersionInfo};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::firemon::apps::{GlobalPolicyController, PolicyOptimizer};
use crate::firemon::controlpanel::ControlPanel;
use crate::firemon::orchestration::Orchestration;
use crate::firemon::policyplanner::PolicyPlanner;
use crate::firemon::request::Response;
use crate::firemon::securitymanager::SecurityManager;
use crate::firemon::session::{ReqwestTransport, Session, Transport};

/// A connection to one FireMon host.
///
/// Build it from a [`ClientConfig`], call [`auth`](Self::auth), then reach
/// resources through the application accessors.
#[derive(Debug, Clone)]
pub struct FiremonApi {
    config: ClientConfig,
    base_url: String,
    session: Session,
    username: Option<String>,
    version: Option<VersionInfo>,
    domain: Option<DomainInfo>,
    cpl: Option<ControlPanel>,
}

impl FiremonApi {
    /// Client over HTTPS with settings from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let session = Session::new(transport, &config);
        Self {
            base_url: config.base_url(),
            config,
            session,
            username: None,
            version: None,
            domain: None,
            cpl: None,
        }
    }

    /// Log in to Security Manager.
    ///
    /// Credentials are kept as Basic auth on the shared session. The
    /// domain is verified afterwards; a user without access to it is
    /// still logged in.
    pub async fn auth(&mut self, username: &str, password: &str) -> Result<()> {
        let session = self.session.with_basic_auth(username, password);
        auth::login(&session, &self.base_url, username, password).await?;
        self.session = session;
        self.username = Some(username.to_string());

        let version = auth::fetch_version(&self.session, &self.base_url).await?;
        info!("Connected to {} ver. {}", self.host(), version.version);
        self.version = Some(version);

        self.verify_domain().await;
        Ok(())
    }

    async fn verify_domain(&mut self) {
        match auth::fetch_domain(&self.session, &self.base_url, self.config.domain_id).await {
            Ok(domain) => self.domain = Some(domain),
            Err(e) => {
                warn!("User does not have access to domain {}: {}", self.config.domain_id, e);
                self.domain = None;
            }
        }
    }

    /// Log in to the control panel, on its own port or through the
    /// proxied path.
    pub async fn auth_cpl(&mut self, username: &str, password: &str, proxied: bool) -> Result<ControlPanel> {
        let cookie = auth::login_cpl(&self.session, &self.base_url, username, password, proxied).await?;
        let session = self.session.with_header("Cookie", cookie);
        let cpl = ControlPanel::new(&session, &self.base_url, proxied);
        self.cpl = Some(cpl.clone());
        Ok(cpl)
    }

    /// Change a Security Manager password. Works without [`auth`](Self::auth).
    pub async fn change_password(&self, username: &str, old_password: &str, new_password: &str) -> Result<Response> {
        auth::change_password(&self.session, &self.base_url, username, old_password, new_password).await
    }

    /// Switch the working domain and verify it.
    pub async fn set_domain_id(&mut self, domain_id: i64) {
        self.config.domain_id = domain_id;
        self.verify_domain().await;
    }

    pub fn domain_id(&self) -> i64 {
        self.config.domain_id
    }

    pub fn domain(&self) -> Option<&DomainInfo> {
        self.domain.as_ref()
    }

    pub fn version(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn host(&self) -> String {
        self.config.host_name()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sm(&self) -> SecurityManager {
        SecurityManager::new(&self.session, &self.base_url, self.config.domain_id)
    }

    pub fn pp(&self) -> PolicyPlanner {
        PolicyPlanner::new(&self.session, &self.base_url, self.config.domain_id)
    }

    pub fn po(&self) -> PolicyOptimizer {
        PolicyOptimizer::new(&self.session, &self.base_url, self.config.domain_id)
    }

    pub fn orch(&self) -> Orchestration {
        Orchestration::new(&self.session, &self.base_url, self.config.domain_id)
    }

    pub fn gpc(&self) -> GlobalPolicyController {
        GlobalPolicyController::new(&self.session, &self.base_url, self.config.domain_id)
    }

    /// The control panel, after [`auth_cpl`](Self::auth_cpl).
    pub fn cpl(&self) -> Option<&ControlPanel> {
        self.cpl.as_ref()
    }
}

impl fmt::Display for FiremonApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "FireMon {} ver. {}", self.host(), v.version),
            None => write!(f, "FireMon {}", self.host()),
        }
    }
}
