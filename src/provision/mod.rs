//! Scoped provisioning of a workspace group and one workspace.
//!
//! [`Provisioner::scoped`] creates both resources, hands their identifiers
//! to a body, and always deletes them afterwards: workspace first, then the
//! group with `force`. Release runs after a normal return, an error, or a
//! panic in the body. Release failures are logged and never replace the
//! body's outcome.

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};

use futures::FutureExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::management::{
    ManagementApi, ManagementError, WorkspaceGroupId, WorkspaceGroupRequest, WorkspaceId,
    WorkspaceRequest,
};

/// Everything needed to create the group and its workspace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionRequest {
    /// Workspace group payload.
    pub group: WorkspaceGroupRequest,
    /// Display name of the workspace.
    pub workspace_name: String,
    /// Compute size of the workspace.
    pub workspace_size: String,
}

impl ProvisionRequest {
    /// Password of the `admin` SQL user for the group.
    #[must_use]
    pub fn admin_password(&self) -> &str {
        &self.group.admin_password
    }

    pub(crate) fn workspace_request(&self, group_id: WorkspaceGroupId) -> WorkspaceRequest {
        WorkspaceRequest {
            name: self.workspace_name.clone(),
            workspace_group_id: group_id,
            size: self.workspace_size.clone(),
        }
    }
}

/// Identifiers of the resources owned by a provisioning scope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionedWorkspace {
    /// Workspace group identifier.
    pub group_id: WorkspaceGroupId,
    /// Workspace identifier.
    pub workspace_id: WorkspaceId,
}

/// Creation failures. Nothing is left behind when these are returned.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised when the workspace group cannot be created.
    #[error("failed to create workspace group: {0}")]
    CreateGroup(#[source] ManagementError),
    /// Raised when the workspace cannot be created; the group has already
    /// been released.
    #[error("failed to create workspace: {0}")]
    CreateWorkspace(#[source] ManagementError),
}

/// Outcome of releasing a scope's resources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupReport {
    /// Result of deleting the workspace; `None` when none was created.
    pub workspace: Option<Result<(), ManagementError>>,
    /// Result of deleting the workspace group.
    pub group: Result<(), ManagementError>,
}

impl CleanupReport {
    /// Whether every delete call succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.group.is_ok() && self.workspace.as_ref().is_none_or(Result::is_ok)
    }
}

/// Creates and releases provisioning scopes against one API client.
#[derive(Debug)]
pub struct Provisioner<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> Provisioner<'a, A>
where
    A: ManagementApi + ?Sized,
{
    /// Binds the provisioner to `api`.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Provisions the group and workspace, runs `body`, then releases both.
    ///
    /// `body` receives the identifiers of the created resources. A panic in
    /// `body` is resumed after release.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] (converted into `E`) when creation fails,
    /// otherwise whatever `body` returns.
    pub async fn scoped<T, E, F, Fut>(&self, request: &ProvisionRequest, body: F) -> Result<T, E>
    where
        F: FnOnce(ProvisionedWorkspace) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ProvisionError>,
    {
        let resources = self.acquire(request).await?;
        let outcome = AssertUnwindSafe(body(resources.clone()))
            .catch_unwind()
            .await;
        self.release(&resources).await;

        match outcome {
            Ok(result) => result,
            Err(panic) => resume_unwind(panic),
        }
    }

    async fn acquire(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionedWorkspace, ProvisionError> {
        let group_id = self
            .api
            .create_workspace_group(&request.group)
            .await
            .map_err(ProvisionError::CreateGroup)?;
        info!(group_id = %group_id, name = %request.group.name, "workspace group created");

        let workspace_request = request.workspace_request(group_id.clone());
        match self.api.create_workspace(&workspace_request).await {
            Ok(workspace_id) => {
                info!(
                    group_id = %group_id,
                    workspace_id = %workspace_id,
                    "workspace created"
                );
                Ok(ProvisionedWorkspace {
                    group_id,
                    workspace_id,
                })
            }
            Err(err) => {
                let group = self.delete_group(&group_id).await;
                log_cleanup(&CleanupReport {
                    workspace: None,
                    group,
                });
                Err(ProvisionError::CreateWorkspace(err))
            }
        }
    }

    /// Deletes the workspace, then the group, regardless of the first
    /// outcome.
    pub async fn release(&self, resources: &ProvisionedWorkspace) -> CleanupReport {
        let workspace = self.api.delete_workspace(&resources.workspace_id).await;
        let group = self.delete_group(&resources.group_id).await;
        let report = CleanupReport {
            workspace: Some(workspace),
            group,
        };
        log_cleanup(&report);
        report
    }

    async fn delete_group(&self, group_id: &WorkspaceGroupId) -> Result<(), ManagementError> {
        self.api.delete_workspace_group(group_id, true).await
    }
}

fn log_cleanup(report: &CleanupReport) {
    if let Some(Err(err)) = &report.workspace {
        warn!(error = %err, "failed to delete workspace");
    }
    if let Err(err) = &report.group {
        warn!(error = %err, "failed to delete workspace group");
    }
    if report.is_clean() {
        info!("provisioned resources released");
    }
}

#[cfg(test)]
mod tests;
