//! State polling shared by activation, suspend, and resume waits.

use tokio::time::sleep;
use tracing::info;

use crate::management::{ManagementApi, ManagementError, Workspace, WorkspaceId, WorkspaceState};

use super::PollPolicy;

/// Polls `id` until it reports `target`, sleeping `policy.interval` after
/// every non-matching poll.
///
/// A failed fetch ends the wait immediately; it is not retried.
///
/// # Errors
///
/// Returns the fetch error, or [`ManagementError::PollTimeout`] when
/// `policy.max_attempts` polls pass without reaching `target`.
pub async fn wait_for_state<A>(
    api: &A,
    id: &WorkspaceId,
    target: &WorkspaceState,
    policy: PollPolicy,
) -> Result<Workspace, ManagementError>
where
    A: ManagementApi + ?Sized,
{
    let mut polls: u32 = 0;
    loop {
        let workspace = api.get_workspace(id).await?;
        polls = polls.saturating_add(1);

        if workspace.state == *target {
            info!(workspace_id = %id, state = %workspace.state, "workspace reached target state");
            return Ok(workspace);
        }

        info!(
            workspace_id = %id,
            state = %workspace.state,
            target = %target,
            "waiting for workspace state"
        );

        if policy.max_attempts.is_some_and(|cap| polls >= cap) {
            return Err(ManagementError::PollTimeout {
                workspace_id: id.to_string(),
                target: target.to_string(),
                attempts: polls,
                last_state: workspace.state.to_string(),
            });
        }

        sleep(policy.interval).await;
    }
}
