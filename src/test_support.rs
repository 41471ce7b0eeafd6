//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::management::{
    ApiFuture, ManagementApi, ManagementError, Region, Workspace, WorkspaceGroupId,
    WorkspaceGroupRequest, WorkspaceId, WorkspaceRequest, WorkspaceState,
};
use crate::probe::{ConnectivityProbe, ProbeError, ProbeFuture, ProbeTarget};

/// Group identifier returned when no creation result is scripted.
pub const SCRIPTED_GROUP_ID: &str = "wg-scripted";

/// Workspace identifier returned when no creation result is scripted.
pub const SCRIPTED_WORKSPACE_ID: &str = "ws-scripted";

/// Endpoint reported by [`ScriptedApi::push_state`] for active workspaces.
pub const SCRIPTED_ENDPOINT: &str = "svc-scripted.example.test";

/// A single call recorded by [`ScriptedApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `GET /v1/regions`.
    ListRegions,
    /// `POST /v1/workspaceGroups` with the group name.
    CreateWorkspaceGroup(String),
    /// `DELETE /v1/workspaceGroups/{id}`.
    DeleteWorkspaceGroup {
        /// Group identifier.
        id: String,
        /// Value of the `force` flag.
        force: bool,
    },
    /// `POST /v1/workspaces` with the owning group.
    CreateWorkspace(String),
    /// `GET /v1/workspaces/{id}`.
    GetWorkspace(String),
    /// `DELETE /v1/workspaces/{id}`.
    DeleteWorkspace(String),
    /// `POST /v1/workspaces/{id}/suspend`.
    SuspendWorkspace(String),
    /// `POST /v1/workspaces/{id}/resume`.
    ResumeWorkspace(String),
}

/// Call together with the (Tokio) time it was made, so tests running on a
/// paused clock can assert the spacing between calls.
#[derive(Clone, Debug)]
pub struct TimedCall {
    /// Recorded call.
    pub call: ApiCall,
    /// Time of the call.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct ApiScript {
    calls: Vec<TimedCall>,
    regions: Vec<Region>,
    group_results: VecDeque<Result<WorkspaceGroupId, ManagementError>>,
    workspace_results: VecDeque<Result<WorkspaceId, ManagementError>>,
    states: VecDeque<Result<Workspace, ManagementError>>,
    suspend_results: VecDeque<Result<(), ManagementError>>,
    resume_results: VecDeque<Result<(), ManagementError>>,
    delete_workspace_results: VecDeque<Result<(), ManagementError>>,
    delete_group_results: VecDeque<Result<(), ManagementError>>,
}

/// Scripted management API that returns pre-seeded results in FIFO order
/// and records every call.
///
/// Creation and deletion calls succeed when nothing is scripted.
/// `get_workspace` fails with HTTP 404 once its script runs dry so that a
/// runaway poll surfaces as an error rather than a hang.
#[derive(Clone, Debug, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<ApiScript>>,
}

impl ScriptedApi {
    /// Creates an API double with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, ApiScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ApiCall) -> MutexGuard<'_, ApiScript> {
        let mut script = self.script();
        script.calls.push(TimedCall {
            call,
            at: Instant::now(),
        });
        script
    }

    /// Sets the regions returned by `list_regions`.
    pub fn set_regions(&self, regions: Vec<Region>) {
        self.script().regions = regions;
    }

    /// Queues a workspace group creation result.
    pub fn push_group_result(&self, result: Result<WorkspaceGroupId, ManagementError>) {
        self.script().group_results.push_back(result);
    }

    /// Queues a workspace creation result.
    pub fn push_workspace_result(&self, result: Result<WorkspaceId, ManagementError>) {
        self.script().workspace_results.push_back(result);
    }

    /// Queues a successful `get_workspace` answer in `state`. Active
    /// workspaces report [`SCRIPTED_ENDPOINT`].
    pub fn push_state(&self, state: WorkspaceState) {
        let endpoint = (state == WorkspaceState::Active).then(|| SCRIPTED_ENDPOINT.to_owned());
        self.script().states.push_back(Ok(Workspace {
            id: WorkspaceId::new(SCRIPTED_WORKSPACE_ID),
            state,
            endpoint,
        }));
    }

    /// Queues an arbitrary `get_workspace` result.
    pub fn push_workspace_state(&self, result: Result<Workspace, ManagementError>) {
        self.script().states.push_back(result);
    }

    /// Queues a suspend request result.
    pub fn push_suspend_result(&self, result: Result<(), ManagementError>) {
        self.script().suspend_results.push_back(result);
    }

    /// Queues a resume request result.
    pub fn push_resume_result(&self, result: Result<(), ManagementError>) {
        self.script().resume_results.push_back(result);
    }

    /// Queues a workspace deletion result.
    pub fn push_delete_workspace_result(&self, result: Result<(), ManagementError>) {
        self.script().delete_workspace_results.push_back(result);
    }

    /// Queues a workspace group deletion result.
    pub fn push_delete_group_result(&self, result: Result<(), ManagementError>) {
        self.script().delete_group_results.push_back(result);
    }

    /// Returns the calls recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.script()
            .calls
            .iter()
            .map(|timed| timed.call.clone())
            .collect()
    }

    /// Returns the calls recorded so far with their timestamps.
    #[must_use]
    pub fn timed_calls(&self) -> Vec<TimedCall> {
        self.script().calls.clone()
    }
}

/// Builds a non-success status error for scripting failures.
#[must_use]
pub fn status_error(operation: &str, status: u16, body: &str) -> ManagementError {
    ManagementError::Status {
        operation: operation.to_owned(),
        status,
        body: body.to_owned(),
    }
}

fn ok_or_default<T>(next: Option<Result<T, ManagementError>>, default: T) -> Result<T, ManagementError> {
    next.unwrap_or(Ok(default))
}

impl ManagementApi for ScriptedApi {
    fn list_regions(&self) -> ApiFuture<'_, Vec<Region>> {
        let script = self.record(ApiCall::ListRegions);
        Box::pin(ready(Ok(script.regions.clone())))
    }

    fn create_workspace_group<'a>(
        &'a self,
        request: &'a WorkspaceGroupRequest,
    ) -> ApiFuture<'a, WorkspaceGroupId> {
        let mut script = self.record(ApiCall::CreateWorkspaceGroup(request.name.clone()));
        let result = ok_or_default(
            script.group_results.pop_front(),
            WorkspaceGroupId::new(SCRIPTED_GROUP_ID),
        );
        Box::pin(ready(result))
    }

    fn delete_workspace_group<'a>(
        &'a self,
        id: &'a WorkspaceGroupId,
        force: bool,
    ) -> ApiFuture<'a, ()> {
        let mut script = self.record(ApiCall::DeleteWorkspaceGroup {
            id: id.to_string(),
            force,
        });
        let result = ok_or_default(script.delete_group_results.pop_front(), ());
        Box::pin(ready(result))
    }

    fn create_workspace<'a>(&'a self, request: &'a WorkspaceRequest) -> ApiFuture<'a, WorkspaceId> {
        let mut script = self.record(ApiCall::CreateWorkspace(
            request.workspace_group_id.to_string(),
        ));
        let result = ok_or_default(
            script.workspace_results.pop_front(),
            WorkspaceId::new(SCRIPTED_WORKSPACE_ID),
        );
        Box::pin(ready(result))
    }

    fn get_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, Workspace> {
        let mut script = self.record(ApiCall::GetWorkspace(id.to_string()));
        let result = script
            .states
            .pop_front()
            .unwrap_or_else(|| Err(status_error("get workspace", 404, "no scripted state")));
        Box::pin(ready(result))
    }

    fn delete_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        let mut script = self.record(ApiCall::DeleteWorkspace(id.to_string()));
        let result = ok_or_default(script.delete_workspace_results.pop_front(), ());
        Box::pin(ready(result))
    }

    fn suspend_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        let mut script = self.record(ApiCall::SuspendWorkspace(id.to_string()));
        let result = ok_or_default(script.suspend_results.pop_front(), ());
        Box::pin(ready(result))
    }

    fn resume_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        let mut script = self.record(ApiCall::ResumeWorkspace(id.to_string()));
        let result = ok_or_default(script.resume_results.pop_front(), ());
        Box::pin(ready(result))
    }
}

/// Scripted connectivity probe returning pre-seeded results in FIFO order.
///
/// Probes succeed with `1` when nothing is scripted.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProbe {
    results: Arc<Mutex<VecDeque<Result<i64, ProbeError>>>>,
    targets: Arc<Mutex<Vec<ProbeTarget>>>,
}

impl ScriptedProbe {
    /// Creates a probe double with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a probe result.
    pub fn push_result(&self, result: Result<i64, ProbeError>) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Returns the targets probed so far.
    #[must_use]
    pub fn targets(&self) -> Vec<ProbeTarget> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConnectivityProbe for ScriptedProbe {
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> ProbeFuture<'a> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.clone());
        let result = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(1));
        Box::pin(ready(result))
    }
}
