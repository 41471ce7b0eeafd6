//! Orchestrates the provisioning commands end to end.
//!
//! A run resolves the region, provisions a workspace group and workspace,
//! waits for the workspace to become active, and then either probes it once
//! or drives the stress loop. The provisioned resources are released on every
//! exit path.

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ProbeConfig};
use crate::lifecycle::WorkspaceLifecycle;
use crate::management::{ManagementApi, ManagementError, Region, RegionId, WorkspaceId};
use crate::probe::{ConnectivityProbe, ProbeError};
use crate::provision::{ProvisionError, ProvisionRequest, Provisioner};
use crate::stress::{StressLoop, StressReport};

/// Errors surfaced while performing a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Raised when the configuration cannot drive a run.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when a management API call outside provisioning fails.
    #[error("management API error: {0}")]
    Management(#[from] ManagementError),
    /// Raised when the workspace group or workspace cannot be created.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Raised when the connectivity probe fails.
    #[error("connectivity probe failed: {0}")]
    Probe(#[from] ProbeError),
}

/// Result of a successful `provision` run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeOutcome {
    /// Workspace that was probed (already released).
    pub workspace_id: WorkspaceId,
    /// Endpoint host that answered.
    pub endpoint: String,
    /// Value scanned back from `select 1`.
    pub value: i64,
}

/// Executes the provisioning commands against one API client and probe.
#[derive(Debug)]
pub struct ProbeOrchestrator<A, P> {
    api: A,
    probe: P,
    config: ProbeConfig,
}

impl<A, P> ProbeOrchestrator<A, P>
where
    A: ManagementApi,
    P: ConnectivityProbe,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(api: A, probe: P, config: ProbeConfig) -> Self {
        Self { api, probe, config }
    }

    /// Lists the regions offered by the management API.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Management`] when the listing fails.
    pub async fn list_regions(&self) -> Result<Vec<Region>, RunError> {
        Ok(self.api.list_regions().await?)
    }

    /// Returns the configured region or the first listed region of the
    /// configured provider. Providers compare case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Management`] when the listing fails and
    /// [`ConfigError::NoRegion`] when no region matches.
    pub async fn resolve_region(&self) -> Result<RegionId, RunError> {
        if let Some(region_id) = self.config.configured_region() {
            return Ok(region_id);
        }

        let provider = self.config.provider.trim();
        let region = self
            .list_regions()
            .await?
            .into_iter()
            .find(|region| region.provider.trim().eq_ignore_ascii_case(provider))
            .ok_or_else(|| ConfigError::NoRegion {
                provider: provider.to_owned(),
            })?;
        info!(region_id = %region.id, region = %region.region, "using region from listing");
        Ok(region.id)
    }

    /// Provisions a workspace, waits for it to become active, and probes it
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when region resolution, provisioning, the
    /// activation wait, or the probe fails.
    pub async fn provision_and_probe(&self) -> Result<ProbeOutcome, RunError> {
        let request = self.prepare().await?;
        let password = request.admin_password();
        let lifecycle = self.lifecycle();
        let sql = self.config.sql_settings();

        Provisioner::new(&self.api)
            .scoped(&request, |resources| async move {
                let endpoint = activate(&lifecycle, &resources.workspace_id).await?;
                let target = sql.target(&endpoint, password);
                let value = self.probe.probe(&target).await?;
                Ok::<_, RunError>(ProbeOutcome {
                    workspace_id: resources.workspace_id,
                    endpoint,
                    value,
                })
            })
            .await
    }

    /// Provisions a workspace, waits for it to become active, and runs the
    /// stress loop.
    ///
    /// A failing stress iteration is reported in the returned
    /// [`StressReport`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when region resolution, provisioning, or the
    /// activation wait fails.
    pub async fn stress(&self, max_loops: Option<u64>) -> Result<StressReport, RunError> {
        let request = self.prepare().await?;
        let password = request.admin_password();
        let lifecycle = self.lifecycle();
        let sql = self.config.sql_settings();

        Provisioner::new(&self.api)
            .scoped(&request, |resources| async move {
                let endpoint = activate(&lifecycle, &resources.workspace_id).await?;
                let report = StressLoop::new(&lifecycle, &self.probe, &sql, password)
                    .with_max_loops(max_loops)
                    .run(&resources.workspace_id, &endpoint)
                    .await;
                Ok::<_, RunError>(report)
            })
            .await
    }

    async fn prepare(&self) -> Result<ProvisionRequest, RunError> {
        let region_id = self.resolve_region().await?;
        let password = self.config.admin_password_or_generate();
        Ok(self.config.provision_request(region_id, password))
    }

    const fn lifecycle(&self) -> WorkspaceLifecycle<'_, A> {
        WorkspaceLifecycle::new(
            &self.api,
            self.config.poll_policy(),
            self.config.retry_policy(),
        )
    }
}

async fn activate<A>(
    lifecycle: &WorkspaceLifecycle<'_, A>,
    workspace_id: &WorkspaceId,
) -> Result<String, ManagementError>
where
    A: ManagementApi + ?Sized,
{
    let workspace = lifecycle.wait_until_active(workspace_id).await?;
    let endpoint = workspace
        .endpoint
        .filter(|host| !host.trim().is_empty())
        .ok_or_else(|| ManagementError::MissingEndpoint {
            workspace_id: workspace_id.to_string(),
        })?;
    info!(workspace_id = %workspace_id, %endpoint, "workspace is active");
    Ok(endpoint)
}
