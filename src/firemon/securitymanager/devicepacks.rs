//! Device packs: the plugins that teach Security Manager a vendor.

use log::debug;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::firemon::endpoint::{Endpoint, Filters};
use crate::firemon::record::{Schema, UrlKey, UrlScope, resource};
use crate::firemon::request::Response;
use crate::firemon::session::{Context, FilePart};

pub static DEVICE_PACK: Schema = Schema {
    name: "device pack",
    path: Some("plugin"),
    scope: UrlScope::App,
    url_key: UrlKey::Fields(&["groupId", "artifactId"]),
    label: "artifactId",
    writable: false,
    ..Schema::GENERIC
};

resource!(
    /// An installed device pack.
    DevicePack,
    DEVICE_PACK
);

impl DevicePack {
    /// The pack's `layout.json`.
    pub async fn layout(&self) -> Result<Response> {
        self.request("layout")?
            .filter("layoutName", "layout.json")
            .post(Default::default())
            .await
    }

    /// Download one artifact file of the pack, `dc.zip` by default.
    pub async fn artifact(&self, name: Option<&str>) -> Result<Vec<u8>> {
        self.request(name.unwrap_or("dc.zip"))?.get_content().await
    }

    /// Creation body for a new device of this pack.
    ///
    /// `extendedSettingsJson` is filled from the layout's default values;
    /// packs without a layout get an empty settings object.
    pub async fn template(&self, domain_id: i64) -> Result<Value> {
        let pack: Map<String, Value> = [
            "artifactId",
            "deviceName",
            "groupId",
            "id",
            "type",
            "deviceType",
            "version",
        ]
        .into_iter()
        .map(|k| (k.to_string(), self.scalar(k).cloned().unwrap_or(Value::Null)))
        .collect();

        let settings = match self.layout().await {
            Ok(Response::Json(layout)) => layout_defaults(&layout),
            Ok(_) => Map::new(),
            Err(e) if e.status().is_some() => {
                debug!("No layout.json for {}: {}", self, e);
                Map::new()
            }
            Err(e) => return Err(e),
        };

        Ok(json!({
            "name": null,
            "description": null,
            "managementIp": null,
            "domainId": domain_id,
            "devicePack": pack,
            "extendedSettingsJson": settings,
        }))
    }
}

/// Default values of every `{key, defaultValue}` entry of a layout.
///
/// Keys are at most one level deep: `a.b` lands in `settings[a][b]`.
fn layout_defaults(layout: &Value) -> Map<String, Value> {
    let mut entries = Vec::new();
    collect_keyed(layout, &mut entries);

    let mut settings = Map::new();
    for entry in entries {
        let (Some(key), Some(default)) = (
            entry.get("key").and_then(Value::as_str),
            entry.get("defaultValue").filter(|v| !v.is_null()),
        ) else {
            continue;
        };
        match key.split_once('.') {
            None => {
                settings.insert(key.to_string(), default.clone());
            }
            Some((outer, inner)) => {
                let slot = settings
                    .entry(outer.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(nested) = slot {
                    nested.insert(inner.to_string(), default.clone());
                }
            }
        }
    }
    settings
}

fn collect_keyed<'a>(value: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
    match value {
        Value::Object(map) => {
            if map.contains_key("key") {
                out.push(map);
            }
            for child in map.values() {
                collect_keyed(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_keyed(item, out);
            }
        }
        _ => {}
    }
}

/// The `plugin` collection.
///
/// The server offers no filter query, so lookups scan the full list.
#[derive(Debug, Clone)]
pub struct DevicePacks {
    endpoint: Endpoint<DevicePack>,
}

impl DevicePacks {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx),
        }
    }

    pub fn url(&self) -> &str {
        self.endpoint.url()
    }

    pub async fn all(&self) -> Result<Vec<DevicePack>> {
        let json = self
            .endpoint
            .request()
            .key("list/DEVICE_PACK")
            .filter("sort", "artifactId")
            .filter("showHidden", true)
            .get()
            .await?;
        self.endpoint.wrap_all(json)
    }

    /// The pack with exactly this `artifactId`.
    pub async fn get(&self, artifact_id: &str) -> Result<DevicePack> {
        let mut found: Vec<DevicePack> = self
            .all()
            .await?
            .into_iter()
            .filter(|dp| dp.get_str("artifactId") == Some(artifact_id))
            .collect();
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(Error::usage(format!(
                "The requested artifactId: {artifact_id} could not be found"
            ))),
            count => Err(Error::AmbiguousQuery { count }),
        }
    }

    /// Packs whose fields equal every constraint.
    pub async fn filter(&self, filters: Filters<'_>) -> Result<Vec<DevicePack>> {
        if filters.is_empty() {
            return Err(Error::usage("filter() must be given at least one constraint"));
        }
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|dp| filters.iter().all(|(k, v)| matches_scalar(dp.scalar(k), v)))
            .collect())
    }

    pub async fn get_by(&self, filters: Filters<'_>) -> Result<Option<DevicePack>> {
        let mut found = self.filter(filters).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(Error::AmbiguousQuery { count }),
        }
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.all().await?.len() as u64)
    }

    /// Upload a device pack JAR, replacing any installed version.
    pub async fn upload(&self, jar: Vec<u8>) -> Result<Response> {
        self.endpoint
            .request()
            .filter("overwrite", true)
            .post_files(vec![
                FilePart::new("devicepack.jar", "devicepack.jar", jar).mime("application/java-archive"),
            ])
            .await
    }
}

fn matches_scalar(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}
