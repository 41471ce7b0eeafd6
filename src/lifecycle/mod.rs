//! Workspace lifecycle helpers: state polling and suspend/resume actions.
//!
//! Both use fixed intervals. Polling waits for a target state; actions retry
//! the request a bounded number of times and then poll for the state the
//! action leads to.

mod action;
mod wait;

use std::time::Duration;

use crate::management::{ManagementApi, ManagementError, Workspace, WorkspaceId, WorkspaceState};

pub use action::{WorkspaceAction, request_action};
pub use wait::wait_for_state;

/// Interval between polls and between action retries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Number of suspend or resume requests sent before giving up.
pub const DEFAULT_ACTION_ATTEMPTS: u32 = 10;

/// How a state wait polls the API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Maximum number of polls; `None` polls until the target is reached.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Polls forever at `interval`.
    #[must_use]
    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Polls at most `max_attempts` times at `interval`.
    #[must_use]
    pub const fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_POLL_INTERVAL)
    }
}

/// How suspend and resume requests are retried.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total number of requests, including the first.
    pub attempts: u32,
    /// Delay after a failed request before the next one.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }
}

/// Lifecycle operations on a workspace bound to one API client and a pair of
/// policies.
#[derive(Debug)]
pub struct WorkspaceLifecycle<'a, A: ?Sized> {
    api: &'a A,
    poll: PollPolicy,
    retry: RetryPolicy,
}

impl<'a, A> WorkspaceLifecycle<'a, A>
where
    A: ManagementApi + ?Sized,
{
    /// Binds lifecycle operations to `api`.
    #[must_use]
    pub const fn new(api: &'a A, poll: PollPolicy, retry: RetryPolicy) -> Self {
        Self { api, poll, retry }
    }

    /// Waits until the workspace is `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ManagementError`] raised by a poll, or
    /// [`ManagementError::PollTimeout`] when a bounded policy runs out.
    pub async fn wait_until_active(&self, id: &WorkspaceId) -> Result<Workspace, ManagementError> {
        wait_for_state(self.api, id, &WorkspaceState::Active, self.poll).await
    }

    /// Suspends the workspace and waits until it is `SUSPENDED`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagementError::RetriesExhausted`] when every suspend
    /// request fails, or the polling error otherwise.
    pub async fn suspend(&self, id: &WorkspaceId) -> Result<Workspace, ManagementError> {
        self.perform(id, WorkspaceAction::Suspend).await
    }

    /// Resumes the workspace and waits until it is `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagementError::RetriesExhausted`] when every resume request
    /// fails, or the polling error otherwise.
    pub async fn resume(&self, id: &WorkspaceId) -> Result<Workspace, ManagementError> {
        self.perform(id, WorkspaceAction::Resume).await
    }

    async fn perform(
        &self,
        id: &WorkspaceId,
        action: WorkspaceAction,
    ) -> Result<Workspace, ManagementError> {
        request_action(self.api, id, action, self.retry).await?;
        wait_for_state(self.api, id, &action.target_state(), self.poll).await
    }
}

#[cfg(test)]
mod tests;
