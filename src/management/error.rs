//! Error types for the management API client and lifecycle helpers.

use thiserror::Error;

/// Errors raised while talking to the management API.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ManagementError {
    /// Raised when a request could not be sent or its body could not be read.
    #[error("{operation} request failed: {message}")]
    Transport {
        /// Operation being performed (for example `create workspace`).
        operation: String,
        /// Message returned by the HTTP client.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        /// Operation being performed.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Operation being performed.
        operation: String,
        /// Decoder error message.
        message: String,
    },
    /// Raised when an active workspace does not expose an endpoint.
    #[error("workspace {workspace_id} is active but has no endpoint")]
    MissingEndpoint {
        /// Workspace identifier.
        workspace_id: String,
    },
    /// Raised when a bounded poll runs out of attempts.
    #[error(
        "workspace {workspace_id} did not reach {target} after {attempts} polls (last state {last_state})"
    )]
    PollTimeout {
        /// Workspace identifier.
        workspace_id: String,
        /// State being waited for.
        target: String,
        /// Number of polls made.
        attempts: u32,
        /// Last state observed.
        last_state: String,
    },
    /// Raised when a suspend or resume request keeps failing.
    #[error("{action} of workspace {workspace_id} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Action being requested (`suspend` or `resume`).
        action: String,
        /// Workspace identifier.
        workspace_id: String,
        /// Number of requests sent.
        attempts: u32,
        /// Rendering of the last failure observed.
        last_error: String,
    },
}

impl ManagementError {
    pub(crate) fn transport(operation: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.to_owned(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(operation: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            operation: operation.to_owned(),
            message: err.to_string(),
        }
    }
}
