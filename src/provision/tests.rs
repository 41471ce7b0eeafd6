//! Unit tests for the provisioning scope.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::*;
use crate::management::RegionId;
use crate::test_support::{
    ApiCall, SCRIPTED_GROUP_ID, SCRIPTED_WORKSPACE_ID, ScriptedApi, status_error,
};

fn request() -> ProvisionRequest {
    ProvisionRequest {
        group: WorkspaceGroupRequest {
            name: String::from("wsprobe-test"),
            region_id: RegionId::new("region-1"),
            admin_password: String::from("Secret-1!"),
            firewall_ranges: vec![String::from("0.0.0.0/0")],
            allow_all_traffic: true,
        },
        workspace_name: String::from("wsprobe-ws-test"),
        workspace_size: String::from("S-00"),
    }
}

fn release_calls() -> Vec<ApiCall> {
    vec![
        ApiCall::DeleteWorkspace(String::from(SCRIPTED_WORKSPACE_ID)),
        ApiCall::DeleteWorkspaceGroup {
            id: String::from(SCRIPTED_GROUP_ID),
            force: true,
        },
    ]
}

fn create_calls() -> Vec<ApiCall> {
    vec![
        ApiCall::CreateWorkspaceGroup(String::from("wsprobe-test")),
        ApiCall::CreateWorkspace(String::from(SCRIPTED_GROUP_ID)),
    ]
}

#[test]
fn workspace_request_targets_created_group() {
    let workspace = request().workspace_request(WorkspaceGroupId::new("wg-9"));
    assert_eq!(workspace.name, "wsprobe-ws-test");
    assert_eq!(workspace.workspace_group_id.as_str(), "wg-9");
    assert_eq!(workspace.size, "S-00");
    assert_eq!(request().admin_password(), "Secret-1!");
}

#[tokio::test]
async fn scope_releases_workspace_before_group() {
    let api = ScriptedApi::new();
    let provisioner = Provisioner::new(&api);

    let seen = provisioner
        .scoped(&request(), |resources| async move {
            Ok::<_, ProvisionError>(resources)
        })
        .await
        .unwrap_or_else(|err| panic!("scope should succeed: {err}"));

    assert_eq!(seen.group_id.as_str(), SCRIPTED_GROUP_ID);
    assert_eq!(seen.workspace_id.as_str(), SCRIPTED_WORKSPACE_ID);
    let expected: Vec<ApiCall> = create_calls().into_iter().chain(release_calls()).collect();
    assert_eq!(api.calls(), expected);
}

#[derive(Debug, PartialEq, Eq)]
enum BodyError {
    Provision(ProvisionError),
    Probe(&'static str),
}

impl From<ProvisionError> for BodyError {
    fn from(err: ProvisionError) -> Self {
        Self::Provision(err)
    }
}

#[tokio::test]
async fn scope_releases_after_body_error_and_keeps_it() {
    let api = ScriptedApi::new();
    let provisioner = Provisioner::new(&api);

    let err = provisioner
        .scoped(&request(), |_| async { Err::<(), _>(BodyError::Probe("probe failed")) })
        .await
        .expect_err("body error should surface");

    assert_eq!(err, BodyError::Probe("probe failed"));
    assert_eq!(api.calls().get(2..), Some(release_calls().as_slice()));
}

#[tokio::test]
async fn group_is_deleted_when_workspace_delete_fails() {
    let api = ScriptedApi::new();
    api.push_delete_workspace_result(Err(status_error("delete workspace", 500, "stuck")));
    let provisioner = Provisioner::new(&api);

    let value = provisioner
        .scoped(&request(), |_| async { Ok::<_, ProvisionError>(7) })
        .await
        .unwrap_or_else(|err| panic!("release failures must not replace the result: {err}"));

    assert_eq!(value, 7);
    assert_eq!(api.calls().get(2..), Some(release_calls().as_slice()));
}

#[tokio::test]
async fn release_reports_each_delete() {
    let api = ScriptedApi::new();
    api.push_delete_group_result(Err(status_error("delete workspace group", 409, "in use")));
    let provisioner = Provisioner::new(&api);
    let resources = ProvisionedWorkspace {
        group_id: WorkspaceGroupId::new(SCRIPTED_GROUP_ID),
        workspace_id: WorkspaceId::new(SCRIPTED_WORKSPACE_ID),
    };

    let report = provisioner.release(&resources).await;

    assert!(!report.is_clean());
    assert_eq!(report.workspace, Some(Ok(())));
    assert!(report.group.is_err());
    assert_eq!(api.calls(), release_calls());
}

#[tokio::test]
async fn failed_workspace_creation_releases_group() {
    let api = ScriptedApi::new();
    api.push_workspace_result(Err(status_error("create workspace", 400, "bad size")));
    let provisioner = Provisioner::new(&api);
    let mut body_ran = false;

    let err = provisioner
        .scoped(&request(), |_| {
            body_ran = true;
            async { Ok::<(), ProvisionError>(()) }
        })
        .await
        .expect_err("workspace creation should fail");

    assert!(!body_ran);
    assert_eq!(
        err,
        ProvisionError::CreateWorkspace(status_error("create workspace", 400, "bad size"))
    );
    let mut expected = create_calls();
    expected.push(ApiCall::DeleteWorkspaceGroup {
        id: String::from(SCRIPTED_GROUP_ID),
        force: true,
    });
    assert_eq!(api.calls(), expected);
}

#[tokio::test]
async fn failed_group_creation_creates_nothing_else() {
    let api = ScriptedApi::new();
    api.push_group_result(Err(status_error("create workspace group", 500, "quota")));
    let provisioner = Provisioner::new(&api);

    let err = provisioner
        .scoped(&request(), |_| async { Ok::<(), ProvisionError>(()) })
        .await
        .expect_err("group creation should fail");

    assert!(err.to_string().contains("HTTP 500"), "error: {err}");
    assert_eq!(
        api.calls(),
        vec![ApiCall::CreateWorkspaceGroup(String::from("wsprobe-test"))]
    );
}

#[tokio::test]
async fn panicking_body_still_releases() {
    let api = ScriptedApi::new();
    let provisioner = Provisioner::new(&api);

    let outcome = AssertUnwindSafe(provisioner.scoped(&request(), |_| async {
        if api.calls().len() == 2 {
            panic!("body exploded");
        }
        Ok::<(), ProvisionError>(())
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err(), "panic should propagate out of the scope");
    assert_eq!(api.calls().get(2..), Some(release_calls().as_slice()));
}
