//! Management API abstraction and its HTTP implementation.
//!
//! Only the calls the probe needs are modelled: region listing, workspace
//! group create/delete, and workspace create/get/delete/suspend/resume.

mod client;
mod error;
mod types;

use std::future::Future;
use std::pin::Pin;

pub use client::{DEFAULT_API_BASE_URL, HttpManagementClient};
pub use error::ManagementError;
pub use types::{
    Region, RegionId, Workspace, WorkspaceGroupId, WorkspaceGroupRequest, WorkspaceId,
    WorkspaceRequest, WorkspaceState,
};

/// Future returned by management API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ManagementError>> + Send + 'a>>;

/// Calls exposed by the cloud database management API.
pub trait ManagementApi {
    /// Lists the regions workspace groups can be deployed into.
    fn list_regions(&self) -> ApiFuture<'_, Vec<Region>>;

    /// Creates a workspace group and returns its identifier.
    fn create_workspace_group<'a>(
        &'a self,
        request: &'a WorkspaceGroupRequest,
    ) -> ApiFuture<'a, WorkspaceGroupId>;

    /// Deletes a workspace group. `force` also removes any workspaces left in it.
    fn delete_workspace_group<'a>(
        &'a self,
        id: &'a WorkspaceGroupId,
        force: bool,
    ) -> ApiFuture<'a, ()>;

    /// Creates a workspace inside an existing group and returns its identifier.
    fn create_workspace<'a>(&'a self, request: &'a WorkspaceRequest) -> ApiFuture<'a, WorkspaceId>;

    /// Fetches the current state of a workspace.
    fn get_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, Workspace>;

    /// Deletes a workspace.
    fn delete_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()>;

    /// Requests suspension of a workspace.
    fn suspend_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()>;

    /// Requests resumption of a suspended workspace.
    fn resume_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()>;
}
