//! `reqwest` implementation of [`ManagementApi`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiKey;

use super::types::{CreatedWorkspace, CreatedWorkspaceGroup};
use super::{
    ApiFuture, ManagementApi, ManagementError, Region, Workspace, WorkspaceGroupId,
    WorkspaceGroupRequest, WorkspaceId, WorkspaceRequest,
};

/// Public endpoint of the management API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.singlestore.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Management API client authenticating with a bearer token.
#[derive(Clone, Debug)]
pub struct HttpManagementClient {
    http: Client,
    base_url: String,
    api_key: ApiKey,
}

impl HttpManagementClient {
    /// Builds a client for `base_url` (for example [`DEFAULT_API_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`ManagementError::Transport`] when the HTTP client cannot be
    /// initialised.
    pub fn new(base_url: &str, api_key: ApiKey) -> Result<Self, ManagementError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ManagementError::transport("build http client", &err))?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.api_key.expose())
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<String, ManagementError> {
        debug!(operation, "sending management API request");
        let response = request
            .send()
            .await
            .map_err(|err| ManagementError::transport(operation, &err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ManagementError::transport(operation, &err))?;

        if status.is_success() {
            return Ok(body);
        }

        Err(ManagementError::Status {
            operation: operation.to_owned(),
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ManagementError> {
        let body = self.send(operation, request).await?;
        serde_json::from_str(&body).map_err(|err| ManagementError::decode(operation, &err))
    }
}

impl ManagementApi for HttpManagementClient {
    fn list_regions(&self) -> ApiFuture<'_, Vec<Region>> {
        Box::pin(async move {
            self.send_json("list regions", self.request(Method::GET, "/v1/regions"))
                .await
        })
    }

    fn create_workspace_group<'a>(
        &'a self,
        request: &'a WorkspaceGroupRequest,
    ) -> ApiFuture<'a, WorkspaceGroupId> {
        Box::pin(async move {
            let created: CreatedWorkspaceGroup = self
                .send_json(
                    "create workspace group",
                    self.request(Method::POST, "/v1/workspaceGroups")
                        .json(request),
                )
                .await?;
            Ok(created.id)
        })
    }

    fn delete_workspace_group<'a>(
        &'a self,
        id: &'a WorkspaceGroupId,
        force: bool,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::DELETE, &format!("/v1/workspaceGroups/{id}"))
                .query(&[("force", force)]);
            self.send("delete workspace group", request).await?;
            Ok(())
        })
    }

    fn create_workspace<'a>(&'a self, request: &'a WorkspaceRequest) -> ApiFuture<'a, WorkspaceId> {
        Box::pin(async move {
            let created: CreatedWorkspace = self
                .send_json(
                    "create workspace",
                    self.request(Method::POST, "/v1/workspaces").json(request),
                )
                .await?;
            Ok(created.id)
        })
    }

    fn get_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, Workspace> {
        Box::pin(async move {
            self.send_json(
                "get workspace",
                self.request(Method::GET, &format!("/v1/workspaces/{id}")),
            )
            .await
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.send(
                "delete workspace",
                self.request(Method::DELETE, &format!("/v1/workspaces/{id}")),
            )
            .await?;
            Ok(())
        })
    }

    fn suspend_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.send(
                "suspend workspace",
                self.request(Method::POST, &format!("/v1/workspaces/{id}/suspend")),
            )
            .await?;
            Ok(())
        })
    }

    fn resume_workspace<'a>(&'a self, id: &'a WorkspaceId) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.send(
                "resume workspace",
                self.request(Method::POST, &format!("/v1/workspaces/{id}/resume")),
            )
            .await?;
            Ok(())
        })
    }
}
