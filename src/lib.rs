//! Core library for the `wsprobe` workspace probe.
//!
//! The crate wraps a cloud database management API behind the
//! [`ManagementApi`] trait and builds the probe workflow on top of it:
//! scoped provisioning of a workspace group and workspace, state polling,
//! retried suspend/resume actions, a SQL connectivity probe, and a
//! suspend/resume stress loop.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod management;
pub mod probe;
pub mod provision;
pub mod run;
pub mod stress;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;

pub use config::{API_KEY_ENV, API_KEY_HELP, ApiKey, ConfigError, ProbeConfig};
pub use lifecycle::{
    DEFAULT_ACTION_ATTEMPTS, DEFAULT_POLL_INTERVAL, PollPolicy, RetryPolicy, WorkspaceAction,
    WorkspaceLifecycle, request_action, wait_for_state,
};
pub use management::{
    DEFAULT_API_BASE_URL, HttpManagementClient, ManagementApi, ManagementError, Region, RegionId,
    Workspace, WorkspaceGroupId, WorkspaceGroupRequest, WorkspaceId, WorkspaceRequest,
    WorkspaceState,
};
pub use probe::{ConnectivityProbe, MySqlProbe, PROBE_QUERY, ProbeError, ProbeTarget, SqlSettings};
pub use provision::{
    CleanupReport, ProvisionError, ProvisionRequest, ProvisionedWorkspace, Provisioner,
};
pub use run::{ProbeOrchestrator, ProbeOutcome, RunError};
pub use stress::{StressError, StressLoop, StressReport, StressStage};
