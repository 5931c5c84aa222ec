//! Collection configs: how normalized data is gathered for a device pack.

use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::firemon::endpoint::{Created, Endpoint};
use crate::firemon::record::{Schema, UrlScope, resource};
use crate::firemon::request::Request;
use crate::firemon::session::Context;

pub static COLLECTION_CONFIG: Schema = Schema {
    name: "collection config",
    path: Some("collectionconfig"),
    scope: UrlScope::App,
    read_only: &["index"],
    ..Schema::GENERIC
};

resource!(CollectionConfig, COLLECTION_CONFIG);

impl CollectionConfig {
    fn collection(&self) -> Result<Request> {
        let url = COLLECTION_CONFIG
            .endpoint_url(self.context())
            .ok_or_else(|| Error::usage("collection configs have no endpoint"))?;
        Ok(Request::new(&self.context().session, &url))
    }

    fn require_id(&self) -> Result<String> {
        match self.id() {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(id) => Ok(id.to_string()),
            None => Err(Error::usage(format!("collection config '{self}' has no id"))),
        }
    }

    /// Make this config the device pack's default.
    pub async fn assign_to_device_pack(&self) -> Result<bool> {
        let id = self.require_id()?;
        let dp = self.device_pack_id()?;
        self.collection()?
            .key(format!("devicepack/{dp}/assignment/{id}"))
            .put(Default::default())
            .await?;
        Ok(true)
    }

    /// Put the device pack back on its built-in config.
    pub async fn unassign_from_device_pack(&self) -> Result<bool> {
        let dp = self.device_pack_id()?;
        self.collection()?
            .key(format!("devicepack/{dp}/assignment"))
            .delete()
            .await
    }

    pub async fn assign_to_device(&self, device_id: i64) -> Result<bool> {
        let id = self.require_id()?;
        debug!("Assigning collection config {} to device {}", id, device_id);
        self.collection()?
            .key(format!("device/{device_id}/assignment/{id}"))
            .put(Default::default())
            .await?;
        Ok(true)
    }

    pub async fn unassign_from_device(&self, device_id: i64) -> Result<bool> {
        self.collection()?
            .key(format!("device/{device_id}/assignment"))
            .delete()
            .await
    }

    fn device_pack_id(&self) -> Result<i64> {
        self.get_i64("devicePackId")
            .ok_or_else(|| Error::usage(format!("collection config '{self}' has no devicePackId")))
    }
}

/// The `collectionconfig` collection.
#[derive(Debug, Clone)]
pub struct CollectionConfigs {
    endpoint: Endpoint<CollectionConfig>,
}

impl CollectionConfigs {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx),
        }
    }

    /// Copy an existing config under a new name.
    pub async fn duplicate(&self, id: i64, name: &str) -> Result<CollectionConfig> {
        let mut config = self.endpoint.get(id).await?.dump();
        config.remove("id");
        config.remove("index");
        config.insert("name".to_string(), Value::String(name.to_string()));

        match self.endpoint.create(Value::Object(config)).await? {
            Created::One(created) => Ok(created),
            Created::Many(_) => Err(Error::unexpected("duplicate returned a list")),
        }
    }
}

impl std::ops::Deref for CollectionConfigs {
    type Target = Endpoint<CollectionConfig>;

    fn deref(&self) -> &Endpoint<CollectionConfig> {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::firemon::session::Body;
    use crate::firemon::testing::{self, FakeTransport};

    const URL: &str = "https://fm.test/securitymanager/api/collectionconfig";

    #[tokio::test]
    async fn duplicate_drops_identity() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"id": 12, "index": 0, "name": "default", "devicePackId": 3}));
        transport.push_json(200, json!({"id": 13, "name": "copy", "devicePackId": 3}));
        let ccs = CollectionConfigs::new(&testing::context(&transport));

        let copy = ccs.duplicate(12, "copy").await.unwrap();
        assert_eq!(copy.get_i64("id"), Some(13));

        let calls = transport.calls();
        assert_eq!(calls[0].url, format!("{URL}/12"));
        assert_eq!(calls[1].url, URL);
        let Body::Json(body) = &calls[1].body else {
            panic!("expected json body");
        };
        assert_eq!(body, &json!({"name": "copy", "devicePackId": 3}));
    }

    #[tokio::test]
    async fn assignments() {
        let transport = FakeTransport::new();
        transport.respond_with(|_| Ok(testing::response(204, Vec::new())));
        let ccs = CollectionConfigs::new(&testing::context(&transport));
        let cc = ccs.wrap(json!({"id": 13, "devicePackId": 3})).unwrap();

        assert!(cc.assign_to_device_pack().await.unwrap());
        assert!(cc.assign_to_device(7).await.unwrap());
        assert!(cc.unassign_from_device(7).await.unwrap());

        let urls: Vec<String> = transport.calls().into_iter().map(|c| c.url).collect();
        assert_eq!(
            urls,
            vec![
                format!("{URL}/devicepack/3/assignment/13"),
                format!("{URL}/device/7/assignment/13"),
                format!("{URL}/device/7/assignment"),
            ]
        );
    }
}
