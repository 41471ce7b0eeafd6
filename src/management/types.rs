//! Newtypes and wire payloads for the management API.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

newtype!(
    /// Opaque identifier of a workspace group.
    WorkspaceGroupId
);
newtype!(
    /// Opaque identifier of a workspace.
    WorkspaceId
);
newtype!(
    /// Opaque identifier of a region offered by the management API.
    RegionId
);

/// Lifecycle state reported for a workspace.
///
/// States the tool does not know about are kept verbatim so they can still be
/// logged while polling.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(from = "String")]
pub enum WorkspaceState {
    /// Provisioning has been accepted but compute is not ready.
    Pending,
    /// Compute is running and the endpoint accepts connections.
    Active,
    /// A suspend request is being processed.
    Suspending,
    /// Compute is stopped; the workspace can be resumed.
    Suspended,
    /// A resume request is being processed.
    Resuming,
    /// The workspace has been deleted.
    Terminated,
    /// Provisioning or a lifecycle transition failed.
    Failed,
    /// Any state string not listed above.
    Other(String),
}

impl WorkspaceState {
    /// Returns the wire representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Suspending => "SUSPENDING",
            Self::Suspended => "SUSPENDED",
            Self::Resuming => "RESUMING",
            Self::Terminated => "TERMINATED",
            Self::Failed => "FAILED",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for WorkspaceState {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "ACTIVE" => Self::Active,
            "SUSPENDING" => Self::Suspending,
            "SUSPENDED" => Self::Suspended,
            "RESUMING" => Self::Resuming,
            "TERMINATED" => Self::Terminated,
            "FAILED" => Self::Failed,
            _ => Self::Other(value.to_owned()),
        }
    }
}

impl From<String> for WorkspaceState {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a workspace as returned by `GET /v1/workspaces/{id}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Workspace {
    /// Workspace identifier.
    #[serde(rename = "workspaceID")]
    pub id: WorkspaceId,
    /// Current lifecycle state.
    pub state: WorkspaceState,
    /// Hostname of the SQL endpoint; only present once the workspace is active.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Region entry returned by `GET /v1/regions`.
///
/// Fields the tool does not use are preserved so the `regions` command can
/// print the listing unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Region {
    /// Region identifier used when creating workspace groups.
    #[serde(rename = "regionID")]
    pub id: RegionId,
    /// Human readable region name (for example `US East 1 (N. Virginia)`).
    pub region: String,
    /// Cloud provider hosting the region (for example `AWS`).
    pub provider: String,
    /// Remaining fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /v1/workspaceGroups`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceGroupRequest {
    /// Display name of the group.
    pub name: String,
    /// Region the group is deployed into.
    #[serde(rename = "regionID")]
    pub region_id: RegionId,
    /// Password of the `admin` SQL user.
    pub admin_password: String,
    /// CIDR ranges allowed through the firewall.
    pub firewall_ranges: Vec<String>,
    /// Whether to allow inbound traffic from any address.
    pub allow_all_traffic: bool,
}

/// Body of `POST /v1/workspaces`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct WorkspaceRequest {
    /// Display name of the workspace.
    pub name: String,
    /// Group the workspace belongs to.
    #[serde(rename = "workspaceGroupID")]
    pub workspace_group_id: WorkspaceGroupId,
    /// Compute size (for example `S-00`).
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedWorkspaceGroup {
    #[serde(rename = "workspaceGroupID")]
    pub(crate) id: WorkspaceGroupId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedWorkspace {
    #[serde(rename = "workspaceID")]
    pub(crate) id: WorkspaceId,
}
