/// Generic record model shared by every resource.
pub mod record;

pub mod api;
/// Application wrappers and raw API calls.
pub mod apps;
pub mod controlpanel;
/// Collection binding: listing, lookup, creation and counting.
pub mod endpoint;
pub mod orchestration;
pub mod policyplanner;
/// HTTP request builder, status checks and pagination.
pub mod request;
pub mod securitymanager;
/// Transport seam, retry loop and shared session state.
pub mod session;
pub mod siql;

#[cfg(test)]
pub(crate) mod testing;

pub use api::FiremonApi;
pub use apps::{App, GlobalPolicyController, PolicyOptimizer};
pub use controlpanel::ControlPanel;
pub use endpoint::{Endpoint, FilterStyle};
pub use orchestration::Orchestration;
pub use policyplanner::{PolicyPlanner, Workflow, Workflows};
pub use record::{Record, Resource};
pub use securitymanager::SecurityManager;
pub use session::{ReqwestTransport, Session, Transport};
pub use siql::Siql;
