//! FireMon applications.
//!
//! Every application lives at `{base}/{name}/api`; most also expose
//! domain-scoped resources below `{app}/domain/{id}`.

use std::collections::BTreeMap;

use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::firemon::request::{Request, Response};
use crate::firemon::session::{Body, Context, Params, Session};

/// One operation of an application's OpenAPI document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: String,
    pub method: Method,
    /// Path template relative to the application URL, e.g.
    /// `domain/{domainId}/device/{id}`.
    pub path: String,
}

impl Operation {
    /// Path with every `{name}` placeholder replaced.
    pub fn render(&self, args: &[(&str, &str)]) -> Result<String> {
        let mut path = self.path.clone();
        for (name, value) in args {
            path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
        }
        if let Some(start) = path.find('{') {
            let name: String = path[start + 1..].chars().take_while(|c| *c != '}').collect();
            return Err(Error::usage(format!(
                "{} needs a value for path parameter '{name}'",
                self.id
            )));
        }
        Ok(path)
    }
}

/// Operations of an application keyed by `operationId`.
#[derive(Debug, Clone, Default)]
pub struct ApiDoc {
    operations: BTreeMap<String, Operation>,
}

impl ApiDoc {
    /// Read the `paths` table of an OpenAPI document.
    pub fn from_openapi(doc: &Value) -> Result<Self> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::unexpected("API document has no paths"))?;

        let mut operations = BTreeMap::new();
        for (path, verbs) in paths {
            let Some(verbs) = verbs.as_object() else {
                continue;
            };
            for (verb, op) in verbs {
                let Some(id) = op.get("operationId").and_then(Value::as_str) else {
                    continue;
                };
                let Ok(method) = Method::from_bytes(verb.to_ascii_uppercase().as_bytes()) else {
                    continue;
                };
                operations.insert(
                    id.to_string(),
                    Operation {
                        id: id.to_string(),
                        method,
                        path: path.trim_start_matches('/').to_string(),
                    },
                );
            }
        }
        Ok(Self { operations })
    }

    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A FireMon application bound to one session.
#[derive(Debug, Clone)]
pub struct App {
    name: &'static str,
    ctx: Context,
}

impl App {
    /// Application at `{base_url}/{name}/api`, domain-scoped when
    /// `domain_id` is given.
    pub fn new(session: &Session, base_url: &str, name: &'static str, domain_id: Option<i64>) -> Self {
        let app_url = format!("{base_url}/{name}/api");
        Self::at(session, base_url, name, app_url, domain_id)
    }

    /// Application at an explicit root URL.
    pub fn at(
        session: &Session,
        base_url: &str,
        name: &'static str,
        app_url: String,
        domain_id: Option<i64>,
    ) -> Self {
        let domain_url = domain_id.map(|id| format!("{app_url}/domain/{id}"));
        Self {
            name,
            ctx: Context {
                session: session.clone(),
                base_url: base_url.to_string(),
                app_url,
                domain_url,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn app_url(&self) -> &str {
        &self.ctx.app_url
    }

    pub fn domain_url(&self) -> Option<&str> {
        self.ctx.domain_url.as_deref()
    }

    /// Request below the application URL.
    pub fn request(&self, key: &str) -> Request {
        Request::new(&self.ctx.session, &self.ctx.app_url).key(key)
    }

    /// The application's OpenAPI document.
    pub async fn get_api(&self) -> Result<Value> {
        self.request("openapi.json").get().await
    }

    /// The OpenAPI document as an operation table.
    pub async fn api_doc(&self) -> Result<ApiDoc> {
        ApiDoc::from_openapi(&self.get_api().await?)
    }

    /// Raw call against a path below the application URL.
    pub async fn call(&self, method: Method, path: &str, params: Params, body: Body) -> Result<Response> {
        debug!("{} raw call {} {}", self.name, method, path);
        self.request(path).filters(params).send(method, body).await
    }

    /// Call a documented operation by its `operationId`.
    pub async fn exec(
        &self,
        doc: &ApiDoc,
        operation_id: &str,
        path_args: &[(&str, &str)],
        params: Params,
        body: Body,
    ) -> Result<Response> {
        let op = doc
            .operation(operation_id)
            .ok_or_else(|| Error::usage(format!("{} has no operation '{operation_id}'", self.name)))?;
        let path = op.render(path_args)?;
        self.call(op.method.clone(), &path, params, body).await
    }
}

impl std::fmt::Display for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! bare_app {
    ($(#[$meta:meta])* $name:ident, $path:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(App);

        impl $name {
            pub const NAME: &'static str = $path;

            pub fn new(session: &Session, base_url: &str, domain_id: i64) -> Self {
                Self(App::new(session, base_url, Self::NAME, Some(domain_id)))
            }
        }

        impl std::ops::Deref for $name {
            type Target = App;

            fn deref(&self) -> &App {
                &self.0
            }
        }
    };
}

bare_app!(
    /// Policy Optimizer; only raw calls.
    PolicyOptimizer,
    "policyoptimizer"
);
bare_app!(
    /// Global Policy Controller; only raw calls.
    GlobalPolicyController,
    "gpc"
);
