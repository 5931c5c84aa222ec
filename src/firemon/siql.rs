//! SIQL, the Security Intelligence Query Language search endpoints.

use crate::error::Result;
use crate::firemon::endpoint::Endpoint;
use crate::firemon::record::{Schema, resource};
use crate::firemon::session::Context;

pub static SIQL_DATA: Schema = Schema {
    name: "siql",
    writable: false,
    ..Schema::GENERIC
};

resource!(
    /// One row of a SIQL result. Read-only.
    SiqlData,
    SIQL_DATA
);

/// Search endpoints at `{app}/siql`.
#[derive(Debug, Clone)]
pub struct Siql {
    rows: Endpoint<SiqlData>,
}

impl Siql {
    pub fn new(ctx: &Context) -> Self {
        Self {
            rows: Endpoint::at(ctx, format!("{}/siql", ctx.app_url)),
        }
    }

    pub fn url(&self) -> &str {
        self.rows.url()
    }

    /// Run `query` against `{kind}/paged-search`, every page included.
    pub async fn query(&self, kind: &str, query: &str) -> Result<Vec<SiqlData>> {
        let json = self
            .rows
            .request()
            .key(format!("{kind}/paged-search"))
            .filter("q", query)
            .get()
            .await?;
        self.rows.wrap_all(json)
    }

    pub async fn secrule(&self, query: &str) -> Result<Vec<SiqlData>> {
        self.query("secrule", query).await
    }

    pub async fn device(&self, query: &str) -> Result<Vec<SiqlData>> {
        self.query("device", query).await
    }

    pub async fn ticket(&self, query: &str) -> Result<Vec<SiqlData>> {
        self.query("ticket", query).await
    }
}
