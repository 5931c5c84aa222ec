//! Policy Planner and its workflows.

use log::debug;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::firemon::apps::App;
use crate::firemon::endpoint::Endpoint;
use crate::firemon::record::{Schema, UrlScope, resource};
use crate::firemon::request::Response;
use crate::firemon::session::{Context, Session};
use crate::firemon::siql::Siql;

const ACCESS_REQUEST_PLUGIN: &str = "plugin/com.fm.wf.pp/access-request";

pub static WORKFLOW: Schema = Schema {
    name: "workflow",
    path: Some("workflow"),
    scope: UrlScope::Domain,
    read_only: &["createdBy", "createdDate", "lastModifiedBy", "lastModifiedDate"],
    ..Schema::GENERIC
};

resource!(
    /// A Policy Planner workflow.
    Workflow,
    WORKFLOW
);

impl Workflow {
    /// Workflows are saved through their `config` resource.
    pub async fn save(&mut self) -> Result<bool> {
        self.0.save_at("config", Vec::new()).await
    }

    pub async fn update(&mut self, data: Map<String, Value>) -> Result<bool> {
        for (key, value) in data {
            self.set_attribute(&key, value);
        }
        self.save().await
    }

    pub async fn delete(&self) -> Result<bool> {
        Err(Error::unsupported(WORKFLOW.name, "delete"))
    }

    pub async fn enable(&self) -> Result<Response> {
        self.request("enable")?.put(Default::default()).await
    }

    pub async fn disable(&self) -> Result<Response> {
        self.request("disable")?.put(Default::default()).await
    }

    pub async fn start_properties(&self) -> Result<Value> {
        self.request("start-properties")?.get().await
    }

    pub async fn tasks(&self) -> Result<Value> {
        self.request("tasks")?.get().await
    }
}

/// The domain's workflows.
#[derive(Debug, Clone)]
pub struct Workflows {
    endpoint: Endpoint<Workflow>,
}

impl Workflows {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx),
        }
    }

    /// Create an access-request workflow and fetch it back.
    pub async fn create(&self, name: &str, config: Option<Value>) -> Result<Workflow> {
        let config = config.unwrap_or_else(|| json!({"name": name, "createDateSortDir": false}));
        let created = self
            .endpoint
            .request()
            .key(ACCESS_REQUEST_PLUGIN)
            .filter("name", name)
            .post_json(&config)
            .await?
            .into_json()?;
        let id = created
            .get("id")
            .filter(|id| !id.is_null())
            .ok_or_else(|| Error::unexpected("created workflow has no id"))?;
        self.endpoint.get(id).await
    }

    /// The domain's default workflow, if one is set.
    pub async fn default_workflow(&self) -> Result<Option<Workflow>> {
        match self.endpoint.request().key("default").get().await {
            Ok(json) => self.endpoint.wrap(json).map(Some),
            Err(e) if e.status().is_some() => {
                debug!("No default workflow: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::ops::Deref for Workflows {
    type Target = Endpoint<Workflow>;

    fn deref(&self) -> &Endpoint<Workflow> {
        &self.endpoint
    }
}

/// The `policyplanner` application.
#[derive(Debug, Clone)]
pub struct PolicyPlanner(App);

impl PolicyPlanner {
    pub const NAME: &'static str = "policyplanner";

    pub fn new(session: &Session, base_url: &str, domain_id: i64) -> Self {
        Self(App::new(session, base_url, Self::NAME, Some(domain_id)))
    }

    pub fn siql(&self) -> Siql {
        Siql::new(self.context())
    }

    pub fn workflows(&self) -> Workflows {
        Workflows::new(self.context())
    }
}

impl std::ops::Deref for PolicyPlanner {
    type Target = App;

    fn deref(&self) -> &App {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firemon::session::Body;
    use crate::firemon::testing::{BASE, FakeTransport, query_value, session};

    const WORKFLOW_URL: &str = "https://fm.test/policyplanner/api/domain/1/workflow";

    #[tokio::test]
    async fn create_then_fetch() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"id": 21}));
        transport.push_json(200, json!({"id": 21, "name": "Access Request"}));
        let pp = PolicyPlanner::new(&session(&transport), BASE, 1);

        let wf = pp.workflows().create("Access Request", None).await.unwrap();
        assert_eq!(wf.to_string(), "Access Request");

        let calls = transport.calls();
        assert_eq!(calls[0].url, format!("{WORKFLOW_URL}/{ACCESS_REQUEST_PLUGIN}"));
        assert_eq!(query_value(&calls[0], "name"), Some("Access Request"));
        assert_eq!(calls[1].url, format!("{WORKFLOW_URL}/21"));
    }

    #[tokio::test]
    async fn workflow_saves_through_config() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({}));
        let pp = PolicyPlanner::new(&session(&transport), BASE, 1);
        let mut wf = pp
            .workflows()
            .wrap(json!({"id": 21, "name": "AR", "createdBy": "admin"}))
            .unwrap();

        wf.set_attribute("name", "Access Request");
        assert!(wf.save().await.unwrap());
        assert!(matches!(wf.delete().await, Err(Error::Unsupported { .. })));

        let call = &transport.calls()[0];
        assert_eq!(call.url, format!("{WORKFLOW_URL}/21/config"));
        let Body::Json(body) = &call.body else {
            panic!("expected json body");
        };
        assert!(body.get("createdBy").is_none());
    }

    #[tokio::test]
    async fn missing_default_workflow_is_none() {
        let transport = FakeTransport::new();
        transport.push_bytes(404, b"");
        let pp = PolicyPlanner::new(&session(&transport), BASE, 1);
        assert!(pp.workflows().default_workflow().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn siql_is_app_scoped() {
        let transport = FakeTransport::new();
        let pp = PolicyPlanner::new(&session(&transport), BASE, 1);
        assert_eq!(pp.siql().url(), "https://fm.test/policyplanner/api/siql");
    }
}
