//! Suspend/resume stress loop.
//!
//! Each iteration probes the endpoint, suspends the workspace, resumes it,
//! and probes again. The loop stops at the first failing stage and reports
//! how many iterations completed before it.

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::lifecycle::WorkspaceLifecycle;
use crate::management::{ManagementApi, ManagementError, WorkspaceId};
use crate::probe::{ConnectivityProbe, ProbeError, SqlSettings};

/// Stage of a stress iteration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StressStage {
    /// Probe before suspending.
    ProbeBefore,
    /// Suspend request and wait for `SUSPENDED`.
    Suspend,
    /// Resume request and wait for `ACTIVE`.
    Resume,
    /// Probe after resuming.
    ProbeAfter,
}

impl fmt::Display for StressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProbeBefore => "probe before suspend",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::ProbeAfter => "probe after resume",
        })
    }
}

/// Failure that stopped the stress loop.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StressError {
    /// A connectivity probe failed.
    #[error("{stage} failed: {source}")]
    Probe {
        /// Stage that failed.
        stage: StressStage,
        /// Probe failure.
        #[source]
        source: ProbeError,
    },
    /// A lifecycle transition failed.
    #[error("{stage} failed: {source}")]
    Lifecycle {
        /// Stage that failed.
        stage: StressStage,
        /// Management API failure.
        #[source]
        source: ManagementError,
    },
}

impl StressError {
    /// Stage that failed.
    #[must_use]
    pub const fn stage(&self) -> StressStage {
        match self {
            Self::Probe { stage, .. } | Self::Lifecycle { stage, .. } => *stage,
        }
    }
}

/// Outcome of a stress run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StressReport {
    /// Iterations in which every stage succeeded.
    pub completed_loops: u64,
    /// Failure that ended the run; `None` when the iteration bound was hit.
    pub failure: Option<StressError>,
}

/// Stress loop over one active workspace.
pub struct StressLoop<'a, A: ?Sized, P: ?Sized> {
    lifecycle: &'a WorkspaceLifecycle<'a, A>,
    probe: &'a P,
    sql: &'a SqlSettings,
    password: &'a str,
    max_loops: Option<u64>,
}

impl<'a, A, P> StressLoop<'a, A, P>
where
    A: ManagementApi + ?Sized,
    P: ConnectivityProbe + ?Sized,
{
    /// Creates a loop probing with `sql` settings and `password`.
    #[must_use]
    pub const fn new(
        lifecycle: &'a WorkspaceLifecycle<'a, A>,
        probe: &'a P,
        sql: &'a SqlSettings,
        password: &'a str,
    ) -> Self {
        Self {
            lifecycle,
            probe,
            sql,
            password,
            max_loops: None,
        }
    }

    /// Stops successfully after `max_loops` iterations; `None` runs until a
    /// stage fails.
    #[must_use]
    pub const fn with_max_loops(mut self, max_loops: Option<u64>) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Runs iterations against `workspace_id`, first reachable at `endpoint`.
    pub async fn run(&self, workspace_id: &WorkspaceId, endpoint: &str) -> StressReport {
        let mut host = endpoint.to_owned();
        let mut completed_loops: u64 = 0;

        loop {
            if self.max_loops.is_some_and(|max| completed_loops >= max) {
                info!(completed_loops, "stress loop reached its iteration bound");
                return StressReport {
                    completed_loops,
                    failure: None,
                };
            }

            if let Err(failure) = self.iterate(workspace_id, &mut host).await {
                warn!(completed_loops, stage = %failure.stage(), error = %failure, "stress loop stopped");
                return StressReport {
                    completed_loops,
                    failure: Some(failure),
                };
            }

            completed_loops = completed_loops.saturating_add(1);
            info!(workspace_id = %workspace_id, completed_loops, "stress iteration completed");
        }
    }

    async fn iterate(&self, workspace_id: &WorkspaceId, host: &mut String) -> Result<(), StressError> {
        self.probe_at(host, StressStage::ProbeBefore).await?;

        self.lifecycle
            .suspend(workspace_id)
            .await
            .map_err(|source| StressError::Lifecycle {
                stage: StressStage::Suspend,
                source,
            })?;

        let resumed = self
            .lifecycle
            .resume(workspace_id)
            .await
            .map_err(|source| StressError::Lifecycle {
                stage: StressStage::Resume,
                source,
            })?;
        if let Some(endpoint) = resumed.endpoint {
            *host = endpoint;
        }

        self.probe_at(host, StressStage::ProbeAfter).await
    }

    async fn probe_at(&self, host: &str, stage: StressStage) -> Result<(), StressError> {
        let target = self.sql.target(host, self.password);
        self.probe
            .probe(&target)
            .await
            .map(|_| ())
            .map_err(|source| StressError::Probe { stage, source })
    }
}
