//! Devices managed by Security Manager.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::firemon::endpoint::{Created, Endpoint, FilterStyle};
use crate::firemon::record::{FieldKind, Schema, UrlScope, resource};
use crate::firemon::request::Response;
use crate::firemon::securitymanager::devicepacks::DEVICE_PACK;
use crate::firemon::securitymanager::revisions::Revision;
use crate::firemon::session::{Context, FilePart, Params};

pub static DEVICE: Schema = Schema {
    name: "device",
    path: Some("device"),
    scope: UrlScope::Domain,
    fields: &[
        ("devicePack", FieldKind::Nested(&DEVICE_PACK)),
        ("extendedSettingsJson", FieldKind::Json),
        ("parents", FieldKind::Unordered),
        ("children", FieldKind::Unordered),
    ],
    read_only: &[
        "securityConcernIndex",
        "gpcComputeDate",
        "gpcDirtyDate",
        "gpcImplementDate",
        "gpcStatus",
    ],
    protected: &["parents", "children", "devicePack"],
    ..Schema::GENERIC
};

resource!(
    /// A device and the actions available on it.
    Device,
    DEVICE
);

/// Query flags for [`Device::delete_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    pub delete_children: bool,
    pub run_async: bool,
    pub send_notification: bool,
    pub post_processing: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            delete_children: false,
            run_async: false,
            send_notification: false,
            post_processing: true,
        }
    }
}

impl DeleteOptions {
    fn params(&self) -> Params {
        vec![
            ("deleteChildren".to_string(), self.delete_children.to_string()),
            ("async".to_string(), self.run_async.to_string()),
            ("sendNotification".to_string(), self.send_notification.to_string()),
            ("postProcessing".to_string(), self.post_processing.to_string()),
        ]
    }
}

fn retrieval(retrieve: bool) -> Params {
    vec![("manualRetrieval".to_string(), retrieve.to_string())]
}

impl Device {
    /// Save and optionally kick off a manual retrieval.
    pub async fn save_with_retrieval(&mut self, retrieve: bool) -> Result<bool> {
        self.0.save_with(retrieval(retrieve)).await
    }

    pub async fn update_with_retrieval(&mut self, data: Map<String, Value>, retrieve: bool) -> Result<bool> {
        for (key, value) in data {
            self.set_attribute(&key, value);
        }
        self.save_with_retrieval(retrieve).await
    }

    pub async fn delete_with_options(&self, options: DeleteOptions) -> Result<bool> {
        self.0.delete_with(options.params()).await
    }

    /// Zip of the latest revision; with `meta`, normalized data and
    /// metadata are included.
    pub async fn rev_export(&self, meta: bool) -> Result<Vec<u8>> {
        let key = if meta { "export" } else { "export/config" };
        self.request(key)?.get_content().await
    }

    /// Upload config files as a new revision.
    ///
    /// A correlation id is generated when none is given.
    pub async fn config_import(
        &self,
        files: Vec<FilePart>,
        change_user: Option<&str>,
        correlation_id: Option<Uuid>,
    ) -> Result<Response> {
        let correlation_id = correlation_id.unwrap_or_else(Uuid::new_v4);
        let mut req = self
            .request("rev")?
            .filter("action", "IMPORT")
            .filter("filetype", "CONFIG")
            .filter("correlationId", correlation_id);
        if let Some(user) = change_user {
            req = req.filter("changeUser", user);
        }
        req.post_files(files).await
    }

    /// Start a manual retrieval.
    pub async fn retrieval_exec(&self, debug: bool) -> Result<Response> {
        self.request("manualretrieval")?
            .filter("debug", debug)
            .post(Default::default())
            .await
    }

    pub async fn status(&self) -> Result<Value> {
        self.request("status")?.get().await
    }

    /// The device's health test suites.
    pub async fn health(&self) -> Result<Vec<Value>> {
        let json = self.request("health")?.get().await?;
        Ok(match json.get("testSuites") {
            Some(Value::Array(suites)) => suites.clone(),
            _ => Vec::new(),
        })
    }

    pub async fn capabilities(&self) -> Result<Value> {
        self.request("capabilities")?.get().await
    }

    /// Revisions of this device.
    pub fn revisions(&self) -> Result<Endpoint<Revision>> {
        let url = self.request("rev")?.url().to_string();
        Ok(Endpoint::at(self.context(), url))
    }
}

/// The domain's `device` collection.
#[derive(Debug, Clone)]
pub struct Devices {
    endpoint: Endpoint<Device>,
}

impl Devices {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx)
                .filter_style(FilterStyle::Params)
                .filter_key("filter"),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Device> {
        let json = self
            .endpoint
            .request()
            .key(format!("name/{}", urlencoding::encode(name)))
            .get()
            .await?;
        self.endpoint.wrap(json)
    }

    /// Create a device, optionally retrieving its config right away.
    pub async fn create_with_retrieval(&self, config: Value, retrieve: bool) -> Result<Created<Device>> {
        self.endpoint.create_with(config, retrieval(retrieve)).await
    }
}

impl std::ops::Deref for Devices {
    type Target = Endpoint<Device>;

    fn deref(&self) -> &Endpoint<Device> {
        &self.endpoint
    }
}
