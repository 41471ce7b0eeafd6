//! Unit tests for state polling and action retries.

use std::time::Duration;

use rstest::rstest;

use super::*;
use crate::test_support::{ApiCall, SCRIPTED_WORKSPACE_ID, ScriptedApi, status_error};

fn workspace_id() -> WorkspaceId {
    WorkspaceId::new(SCRIPTED_WORKSPACE_ID)
}

fn get_calls(api: &ScriptedApi) -> usize {
    api.calls()
        .iter()
        .filter(|call| matches!(call, ApiCall::GetWorkspace(_)))
        .count()
}

fn assert_spacing(api: &ScriptedApi, at_least: Duration) {
    let timed = api.timed_calls();
    for pair in timed.windows(2) {
        let (Some(first), Some(second)) = (pair.first(), pair.get(1)) else {
            continue;
        };
        let gap = second.at.duration_since(first.at);
        assert!(
            gap >= at_least,
            "calls {:?} and {:?} were only {gap:?} apart",
            first.call,
            second.call
        );
    }
}

#[tokio::test(start_paused = true)]
async fn wait_keeps_polling_until_target_state() {
    let api = ScriptedApi::new();
    api.push_state(WorkspaceState::Pending);
    api.push_state(WorkspaceState::Other(String::from("PROVISIONING")));
    api.push_state(WorkspaceState::Active);

    let workspace = wait_for_state(&api, &workspace_id(), &WorkspaceState::Active, PollPolicy::default())
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    assert_eq!(workspace.state, WorkspaceState::Active);
    assert_eq!(get_calls(&api), 3);
    assert_spacing(&api, DEFAULT_POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn wait_returns_immediately_when_already_in_target_state() {
    let api = ScriptedApi::new();
    api.push_state(WorkspaceState::Suspended);

    let started = tokio::time::Instant::now();
    let workspace = wait_for_state(
        &api,
        &workspace_id(),
        &WorkspaceState::Suspended,
        PollPolicy::default(),
    )
    .await
    .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    assert_eq!(workspace.state, WorkspaceState::Suspended);
    assert!(started.elapsed() < DEFAULT_POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn wait_stops_on_first_fetch_error() {
    let api = ScriptedApi::new();
    api.push_state(WorkspaceState::Pending);
    api.push_workspace_state(Err(status_error("get workspace", 500, "boom")));
    api.push_state(WorkspaceState::Active);

    let err = wait_for_state(&api, &workspace_id(), &WorkspaceState::Active, PollPolicy::default())
        .await
        .expect_err("fetch error should end the wait");

    assert_eq!(err, status_error("get workspace", 500, "boom"));
    assert_eq!(get_calls(&api), 2);
}

#[tokio::test(start_paused = true)]
async fn bounded_wait_times_out_with_last_state() {
    let api = ScriptedApi::new();
    for _ in 0..3 {
        api.push_state(WorkspaceState::Pending);
    }

    let policy = PollPolicy::bounded(Duration::from_secs(1), 2);
    let err = wait_for_state(&api, &workspace_id(), &WorkspaceState::Active, policy)
        .await
        .expect_err("bounded wait should time out");

    assert_eq!(
        err,
        ManagementError::PollTimeout {
            workspace_id: String::from(SCRIPTED_WORKSPACE_ID),
            target: String::from("ACTIVE"),
            attempts: 2,
            last_state: String::from("PENDING"),
        }
    );
    assert_eq!(get_calls(&api), 2);
}

#[rstest]
#[case::suspend(WorkspaceAction::Suspend)]
#[case::resume(WorkspaceAction::Resume)]
#[tokio::test(start_paused = true)]
async fn action_gives_up_after_retry_budget(#[case] action: WorkspaceAction) {
    let api = ScriptedApi::new();
    for _ in 0..DEFAULT_ACTION_ATTEMPTS {
        let failure = Err(status_error(action.as_str(), 409, "busy"));
        match action {
            WorkspaceAction::Suspend => api.push_suspend_result(failure),
            WorkspaceAction::Resume => api.push_resume_result(failure),
        }
    }

    let started = tokio::time::Instant::now();
    let err = request_action(&api, &workspace_id(), action, RetryPolicy::default())
        .await
        .expect_err("every attempt fails");

    let ManagementError::RetriesExhausted {
        attempts,
        last_error,
        ..
    } = &err
    else {
        panic!("expected RetriesExhausted, got {err:?}");
    };
    assert_eq!(*attempts, DEFAULT_ACTION_ATTEMPTS);
    assert!(last_error.contains("409"), "last error: {last_error}");
    assert_eq!(api.calls().len(), 10);
    assert_spacing(&api, DEFAULT_POLL_INTERVAL);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= DEFAULT_POLL_INTERVAL * 9 && elapsed < DEFAULT_POLL_INTERVAL * 10,
        "no sleep expected after the last attempt, elapsed {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn action_succeeds_after_transient_failures() {
    let api = ScriptedApi::new();
    api.push_suspend_result(Err(ManagementError::Transport {
        operation: String::from("suspend workspace"),
        message: String::from("connection reset"),
    }));
    api.push_suspend_result(Err(status_error("suspend workspace", 503, "unavailable")));

    request_action(&api, &workspace_id(), WorkspaceAction::Suspend, RetryPolicy::default())
        .await
        .unwrap_or_else(|err| panic!("third attempt should succeed: {err}"));

    assert_eq!(
        api.calls(),
        vec![ApiCall::SuspendWorkspace(String::from(SCRIPTED_WORKSPACE_ID)); 3]
    );
}

#[tokio::test(start_paused = true)]
async fn suspend_then_resume_waits_for_each_state() {
    let api = ScriptedApi::new();
    api.push_suspend_result(Err(status_error("suspend workspace", 409, "busy")));
    api.push_state(WorkspaceState::Suspending);
    api.push_state(WorkspaceState::Suspended);
    api.push_state(WorkspaceState::Resuming);
    api.push_state(WorkspaceState::Active);

    let lifecycle = WorkspaceLifecycle::new(&api, PollPolicy::default(), RetryPolicy::default());
    let suspended = lifecycle
        .suspend(&workspace_id())
        .await
        .unwrap_or_else(|err| panic!("suspend should succeed: {err}"));
    assert_eq!(suspended.state, WorkspaceState::Suspended);

    let resumed = lifecycle
        .resume(&workspace_id())
        .await
        .unwrap_or_else(|err| panic!("resume should succeed: {err}"));
    assert_eq!(resumed.state, WorkspaceState::Active);
    assert!(resumed.endpoint.is_some());

    let id = String::from(SCRIPTED_WORKSPACE_ID);
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::SuspendWorkspace(id.clone()),
            ApiCall::SuspendWorkspace(id.clone()),
            ApiCall::GetWorkspace(id.clone()),
            ApiCall::GetWorkspace(id.clone()),
            ApiCall::ResumeWorkspace(id.clone()),
            ApiCall::GetWorkspace(id.clone()),
            ApiCall::GetWorkspace(id),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_action_skips_state_wait() {
    let api = ScriptedApi::new();
    for _ in 0..2 {
        api.push_resume_result(Err(status_error("resume workspace", 500, "down")));
    }

    let lifecycle = WorkspaceLifecycle::new(
        &api,
        PollPolicy::default(),
        RetryPolicy::new(2, Duration::from_secs(3)),
    );
    let err = lifecycle
        .resume(&workspace_id())
        .await
        .expect_err("resume should fail");

    assert!(matches!(err, ManagementError::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(get_calls(&api), 0);
}
