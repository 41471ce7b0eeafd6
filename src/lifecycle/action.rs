//! Suspend and resume requests with a fixed retry budget.

use std::fmt;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::management::{ManagementApi, ManagementError, WorkspaceId, WorkspaceState};

use super::RetryPolicy;

/// Administrative action applied to a workspace.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkspaceAction {
    /// Stop compute without deleting the workspace.
    Suspend,
    /// Restart compute of a suspended workspace.
    Resume,
}

impl WorkspaceAction {
    /// State the workspace settles in once the action completes.
    #[must_use]
    pub const fn target_state(self) -> WorkspaceState {
        match self {
            Self::Suspend => WorkspaceState::Suspended,
            Self::Resume => WorkspaceState::Active,
        }
    }

    /// Lower-case name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for WorkspaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends `action` for `id`, retrying failed requests after `retry.interval`
/// up to `retry.attempts` requests in total.
///
/// Only the request is retried; waiting for the resulting state is left to
/// the caller.
///
/// # Errors
///
/// Returns [`ManagementError::RetriesExhausted`] carrying the last failure
/// once every attempt has failed.
pub async fn request_action<A>(
    api: &A,
    id: &WorkspaceId,
    action: WorkspaceAction,
    retry: RetryPolicy,
) -> Result<(), ManagementError>
where
    A: ManagementApi + ?Sized,
{
    let mut last_error: Option<ManagementError> = None;

    for attempt in 1..=retry.attempts {
        let outcome = match action {
            WorkspaceAction::Suspend => api.suspend_workspace(id).await,
            WorkspaceAction::Resume => api.resume_workspace(id).await,
        };

        match outcome {
            Ok(()) => {
                info!(workspace_id = %id, %action, attempt, "workspace action accepted");
                return Ok(());
            }
            Err(err) => {
                warn!(
                    workspace_id = %id,
                    %action,
                    attempt,
                    max_attempts = retry.attempts,
                    error = %err,
                    "workspace action failed"
                );
                last_error = Some(err);
            }
        }

        if attempt < retry.attempts {
            sleep(retry.interval).await;
        }
    }

    Err(ManagementError::RetriesExhausted {
        action: action.to_string(),
        workspace_id: id.to_string(),
        attempts: retry.attempts,
        last_error: last_error.map_or_else(
            || String::from("no attempt was made"),
            |err| err.to_string(),
        ),
    })
}
