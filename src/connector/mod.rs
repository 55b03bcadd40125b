//! The TestRail connector core.
//!
//! - **Catalog**: standard and custom fields valid per artifact kind
//! - **Hierarchy**: the project's suites and sections
//! - **Gateway**: create / find / update / delete of single artifacts
//! - **Filter**: link-state partitioning of discovered artifacts
//! - **Discovery**: time-windowed searches for new and updated artifacts
//! - **Classify**: severity of remote-call failures
//!
//! # Example
//!
//! ```ignore
//! use trsync::config::{FeatureFlags, JsonConfig, SessionConfig};
//! use trsync::connector::Session;
//!
//! let source = JsonConfig::load(path)?;
//! let config = SessionConfig::from_source(&source, FeatureFlags::from_env())?;
//! let session = Session::connect(config)?;
//!
//! for case in session.find_new()? {
//!     println!("{}", case.display_id());
//! }
//! ```

mod catalog;
mod classify;
mod discovery;
mod filter;
mod gateway;
mod hierarchy;
mod session;

pub use catalog::{
    custom_system_name, standard_fields, FieldCatalog, FieldNames, RESULT_CASE_FIELD,
    RESULT_TEST_FIELD,
};
pub use classify::{classify, CallKind, RemoteCaller};
pub use discovery::{DiscoveryEngine, ResolvedPlan};
pub use filter::{Partition, ResultChain, ResultEligibility, SyncFilter};
pub use gateway::{parse_id, ArtifactGateway};
pub use hierarchy::{resolve_sections, resolve_suites, HierarchyDirectory, SuiteAllowList};
pub use session::{Session, BACKEND_VERSION, NAME};
