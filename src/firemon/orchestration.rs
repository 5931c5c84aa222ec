//! Orchestration: change requests and rule recommendations.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::firemon::apps::App;
use crate::firemon::endpoint::Endpoint;
use crate::firemon::record::{Schema, UrlScope, resource};
use crate::firemon::request::Request;
use crate::firemon::session::{Context, Params, Session};

pub static RULE_RECOMMENDATION: Schema = Schema {
    name: "rule recommendation",
    path: Some("rulerec"),
    scope: UrlScope::Domain,
    writable: false,
    ..Schema::GENERIC
};

pub static CHANGE_REQUEST: Schema = Schema {
    name: "change request",
    path: Some("change/request"),
    scope: UrlScope::Domain,
    ..Schema::GENERIC
};

resource!(
    /// Result of a rule recommendation run. Read-only.
    RuleRecommendation,
    RULE_RECOMMENDATION
);
resource!(ChangeRequest, CHANGE_REQUEST);

/// How a recommendation picks among candidate rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRecStrategy {
    NamePattern,
    Hitcount,
    References,
    None,
}

impl fmt::Display for RuleRecStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleRecStrategy::NamePattern => "NAME_PATTERN",
            RuleRecStrategy::Hitcount => "HITCOUNT",
            RuleRecStrategy::References => "REFERENCES",
            RuleRecStrategy::None => "NONE",
        })
    }
}

/// Change request states accepted by [`Changes::by_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Pending,
    Queued,
    Complete,
    Error,
}

impl ChangeStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "PENDING",
            ChangeStatus::Queued => "QUEUED",
            ChangeStatus::Complete => "COMPLETE",
            ChangeStatus::Error => "ERROR",
        }
    }
}

/// Access a recommendation is requested for.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecRequirement {
    pub accept: bool,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    /// Cisco-style services: `tcp/80`, `udp/5001-5002`.
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_matchers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_matching_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_matching_strategy: Option<String>,
}

/// Query flags for a recommendation run. Unset flags are not sent.
#[derive(Debug, Clone, Default)]
pub struct RuleRecOptions {
    /// e.g. `FIREWALLS`, `ROUTERS`.
    pub license_category: Option<String>,
    pub strategy: Option<RuleRecStrategy>,
    pub force_tiebreak: bool,
    pub pattern: Option<String>,
    /// Devices to consider; only used by [`Orchestration::rule_rec`].
    pub device_ids: Vec<i64>,
    /// Only used by [`Orchestration::rule_rec`].
    pub device_group_id: Option<i64>,
}

impl RuleRecOptions {
    fn params(&self, with_targets: bool) -> Params {
        let mut params = Params::new();
        if let Some(category) = &self.license_category {
            params.push(("licenseCategory".to_string(), category.clone()));
        }
        if let Some(strategy) = self.strategy {
            params.push(("strategy".to_string(), strategy.to_string()));
        }
        if self.force_tiebreak {
            params.push(("forceTiebreak".to_string(), "true".to_string()));
        }
        if let Some(pattern) = &self.pattern {
            params.push(("pattern".to_string(), pattern.clone()));
        }
        if with_targets {
            for id in &self.device_ids {
                params.push(("deviceId".to_string(), id.to_string()));
            }
            if let Some(group) = self.device_group_id {
                params.push(("deviceGroupId".to_string(), group.to_string()));
            }
        }
        params
    }
}

/// The domain's change requests.
#[derive(Debug, Clone)]
pub struct Changes {
    endpoint: Endpoint<ChangeRequest>,
}

impl Changes {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx).filter_key("filter"),
        }
    }

    pub async fn by_status(&self, status: ChangeStatus) -> Result<Vec<ChangeRequest>> {
        self.endpoint.filter(&[("status", status.as_str())]).await
    }
}

impl std::ops::Deref for Changes {
    type Target = Endpoint<ChangeRequest>;

    fn deref(&self) -> &Endpoint<ChangeRequest> {
        &self.endpoint
    }
}

/// The `orchestration` application.
#[derive(Debug, Clone)]
pub struct Orchestration(App);

impl Orchestration {
    pub const NAME: &'static str = "orchestration";

    pub fn new(session: &Session, base_url: &str, domain_id: i64) -> Self {
        Self(App::new(session, base_url, Self::NAME, Some(domain_id)))
    }

    pub fn changes(&self) -> Changes {
        Changes::new(self.context())
    }

    /// Recommend rule changes on one device.
    pub async fn device_rule_rec(
        &self,
        device_id: i64,
        requirement: &impl Serialize,
        options: &RuleRecOptions,
    ) -> Result<RuleRecommendation> {
        let body = serde_json::to_value(requirement)?;
        let json = self
            .domain_request(&format!("change/device/{device_id}/rulerec"))?
            .filters(options.params(false))
            .put_json(&body)
            .await?
            .into_json()?;
        self.recommendation(json)
    }

    /// Recommend rule changes across the devices a requirement touches.
    pub async fn rule_rec(&self, requirement: &impl Serialize, options: &RuleRecOptions) -> Result<RuleRecommendation> {
        let body = serde_json::to_value(requirement)?;
        let json = self
            .domain_request("change/rulerec")?
            .filters(options.params(true))
            .post_json(&body)
            .await?
            .into_json()?;
        self.recommendation(json)
    }

    fn domain_request(&self, key: &str) -> Result<Request> {
        let ctx = self.context();
        Ok(Request::new(&ctx.session, ctx.require_domain_url()?).key(key))
    }

    fn recommendation(&self, json: Value) -> Result<RuleRecommendation> {
        Endpoint::<RuleRecommendation>::new(self.context()).wrap(json)
    }
}

impl std::ops::Deref for Orchestration {
    type Target = App;

    fn deref(&self) -> &App {
        &self.0
    }
}
