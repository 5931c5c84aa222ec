//! Security Manager users and user groups.

use serde_json::{Value, json};

use crate::error::Result;
use crate::firemon::endpoint::{Endpoint, FilterStyle};
use crate::firemon::record::{Schema, UrlScope, resource};
use crate::firemon::session::Context;

pub static USER: Schema = Schema {
    name: "user",
    path: Some("user"),
    scope: UrlScope::Domain,
    read_only: &["lastLogin", "passwordExpiration"],
    label: "username",
    ..Schema::GENERIC
};

pub static USER_GROUP: Schema = Schema {
    name: "user group",
    path: Some("usergroup"),
    scope: UrlScope::Domain,
    ..Schema::GENERIC
};

resource!(User, USER);
resource!(UserGroup, USER_GROUP);

/// The domain's users.
#[derive(Debug, Clone)]
pub struct Users {
    endpoint: Endpoint<User>,
}

impl Users {
    pub fn new(ctx: &Context) -> Self {
        Self {
            endpoint: Endpoint::new(ctx).filter_style(FilterStyle::Search),
        }
    }

    /// Every user, system and disabled accounts included.
    pub async fn all(&self) -> Result<Vec<User>> {
        let json = self
            .endpoint
            .request()
            .filter("includeSystem", true)
            .filter("includeDisabled", true)
            .get()
            .await?;
        self.endpoint.wrap_all(json)
    }

    /// Creation body for a local user.
    pub fn template() -> Value {
        json!({
            "username": null,
            "firstName": null,
            "lastName": null,
            "email": null,
            "password": null,
            "existingPassword": null,
            "passwordExpired": false,
            "locked": false,
            "expired": false,
            "enabled": true,
            "authType": "LOCAL",
            "authServerId": null,
        })
    }
}

impl std::ops::Deref for Users {
    type Target = Endpoint<User>;

    fn deref(&self) -> &Endpoint<User> {
        &self.endpoint
    }
}

pub fn user_groups(ctx: &Context) -> Endpoint<UserGroup> {
    Endpoint::new(ctx).filter_style(FilterStyle::Search)
}
