//! Security Manager and its resources.

pub mod collectionconfigs;
pub mod devicepacks;
pub mod devices;
pub mod revisions;
pub mod users;

use crate::firemon::apps::App;
use crate::firemon::endpoint::Endpoint;
use crate::firemon::session::Session;
use crate::firemon::siql::Siql;

pub use collectionconfigs::{CollectionConfig, CollectionConfigs};
pub use devicepacks::{DevicePack, DevicePacks};
pub use devices::{DeleteOptions, Device, Devices};
pub use revisions::Revision;
pub use users::{User, UserGroup, Users};

/// The `securitymanager` application.
#[derive(Debug, Clone)]
pub struct SecurityManager(App);

impl SecurityManager {
    pub const NAME: &'static str = "securitymanager";

    pub fn new(session: &Session, base_url: &str, domain_id: i64) -> Self {
        Self(App::new(session, base_url, Self::NAME, Some(domain_id)))
    }

    pub fn devices(&self) -> Devices {
        Devices::new(self.context())
    }

    pub fn device_packs(&self) -> DevicePacks {
        DevicePacks::new(self.context())
    }

    pub fn revisions(&self) -> Endpoint<Revision> {
        revisions::revisions(self.context())
    }

    pub fn collection_configs(&self) -> CollectionConfigs {
        CollectionConfigs::new(self.context())
    }

    pub fn users(&self) -> Users {
        Users::new(self.context())
    }

    pub fn user_groups(&self) -> Endpoint<UserGroup> {
        users::user_groups(self.context())
    }

    pub fn siql(&self) -> Siql {
        Siql::new(self.context())
    }
}

impl std::ops::Deref for SecurityManager {
    type Target = App;

    fn deref(&self) -> &App {
        &self.0
    }
}
