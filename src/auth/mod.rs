//! Security Manager and control panel authentication.

mod cpl;
mod credentials;

pub use cpl::{cpl_url, login_cpl};
pub use credentials::{
    DomainInfo, VersionInfo, basic_auth_header, change_password, fetch_domain, fetch_version,
    login,
};
