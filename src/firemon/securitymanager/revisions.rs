//! Configuration revisions.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::firemon::endpoint::Endpoint;
use crate::firemon::record::{Schema, UrlScope, resource};
use crate::firemon::request::Request;
use crate::firemon::session::Context;

pub static REVISION: Schema = Schema {
    name: "revision",
    path: Some("rev"),
    scope: UrlScope::Domain,
    ..Schema::GENERIC
};

resource!(
    /// One retrieved or imported configuration of a device.
    Revision,
    REVISION
);

/// Parse the timestamp formats the server emits.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl Revision {
    /// `createDate` as a timestamp.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.get_str("createDate").and_then(parse_timestamp)
    }

    /// Zip of this revision; with `meta`, normalized data and metadata are
    /// included.
    pub async fn export(&self, meta: bool) -> Result<Vec<u8>> {
        let key = if meta { "export" } else { "export/config" };
        self.request(key)?.get_content().await
    }

    pub async fn changelog(&self) -> Result<serde_json::Value> {
        self.request("changelog")?.get().await
    }

    /// Revisions are deleted through their device.
    pub async fn delete(&self) -> Result<bool> {
        let (Some(device_id), Some(id)) = (self.get_i64("deviceId"), self.id()) else {
            return Err(Error::usage(format!(
                "revision '{self}' needs both an id and a deviceId to be deleted"
            )));
        };
        let domain_url = self.context().require_domain_url()?;
        Request::new(&self.context().session, domain_url)
            .key(format!("device/{device_id}/rev/{id}"))
            .delete()
            .await
    }
}

/// The domain's revisions, newest id last.
pub fn revisions(ctx: &Context) -> Endpoint<Revision> {
    Endpoint::new(ctx)
}
