//! Configuration loading via `ortho-config`, plus the `API_KEY` secret.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::{DEFAULT_ACTION_ATTEMPTS, DEFAULT_POLL_INTERVAL, PollPolicy, RetryPolicy};
use crate::management::{RegionId, WorkspaceGroupRequest};
use crate::probe::SqlSettings;
use crate::provision::ProvisionRequest;

/// Environment variable holding the management API bearer token.
pub const API_KEY_ENV: &str = "API_KEY";

/// Message shown when [`API_KEY_ENV`] is missing.
pub const API_KEY_HELP: &str = concat!(
    "Environmental variable $API_KEY should be set, visit ",
    "https://docs.singlestore.com/managed-service/en/reference/management-api.html ",
    "for details"
);

/// Bearer token for the management API. The value never appears in `Debug`
/// output.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Reads the key from the `API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when the variable is unset,
    /// not valid Unicode, or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_value(std::env::var(API_KEY_ENV).ok())
    }

    /// Builds a key from an optional raw value, rejecting blank input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when `value` is `None` or blank.
    pub fn from_value(value: Option<String>) -> Result<Self, ConfigError> {
        match value {
            Some(raw) if !raw.trim().is_empty() => Ok(Self(raw.trim().to_owned())),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Probe settings derived from defaults, configuration files, and
/// `WSPROBE_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "WSPROBE",
    discovery(
        app_name = "wsprobe",
        env_var = "WSPROBE_CONFIG_PATH",
        config_file_name = "wsprobe.toml",
        dotfile_name = ".wsprobe.toml",
        project_file_name = "wsprobe.toml"
    )
)]
pub struct ProbeConfig {
    /// Base URL of the management API.
    #[ortho_config(default = crate::management::DEFAULT_API_BASE_URL.to_owned())]
    pub api_base_url: String,
    /// Cloud provider used when resolving a region from the listing.
    #[ortho_config(default = "AWS".to_owned())]
    pub provider: String,
    /// Region identifier for the workspace group. When unset, the first
    /// region offered for `provider` is used.
    pub region_id: Option<String>,
    /// Password for the `admin` SQL user. A random password is generated for
    /// each run when unset.
    pub admin_password: Option<String>,
    /// Compute size of the workspace.
    #[ortho_config(default = "S-00".to_owned())]
    pub workspace_size: String,
    /// CIDR range allowed through the workspace group firewall.
    #[ortho_config(default = "0.0.0.0/0".to_owned())]
    pub firewall_range: String,
    /// SQL user used by the connectivity probe.
    #[ortho_config(default = "admin".to_owned())]
    pub sql_user: String,
    /// SQL port of the workspace endpoint.
    #[ortho_config(default = 3306)]
    pub sql_port: u16,
    /// Database selected by the connectivity probe.
    #[ortho_config(default = "information_schema".to_owned())]
    pub database: String,
    /// Seconds between workspace state polls.
    #[ortho_config(default = 3)]
    pub poll_interval_secs: u64,
    /// Maximum number of suspend or resume requests per action, at most 10.
    /// Requests are always spaced 3 s apart.
    #[ortho_config(default = 10)]
    pub action_attempts: u32,
    /// Seconds allowed for the SQL connection to be established.
    #[ortho_config(default = 10)]
    pub connect_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to wsprobe.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

impl ProbeConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(metadata.missing());
        }
        Ok(())
    }

    fn require_nonzero(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(metadata.missing());
        }
        Ok(())
    }

    fn require_at_most(
        value: u64,
        max: u64,
        metadata: &FieldMetadata,
    ) -> Result<(), ConfigError> {
        if value > max {
            return Err(ConfigError::OutOfRange(format!(
                "{} must be at most {max}, got {value}: adjust {} or {} in wsprobe.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("wsprobe")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required string is blank
    /// or a numeric setting is zero, and [`ConfigError::OutOfRange`] when
    /// more than 10 action attempts are requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strings = [
            (
                &self.api_base_url,
                FieldMetadata::new("API base URL", "WSPROBE_API_BASE_URL", "api_base_url"),
            ),
            (
                &self.provider,
                FieldMetadata::new("cloud provider", "WSPROBE_PROVIDER", "provider"),
            ),
            (
                &self.workspace_size,
                FieldMetadata::new("workspace size", "WSPROBE_WORKSPACE_SIZE", "workspace_size"),
            ),
            (
                &self.firewall_range,
                FieldMetadata::new("firewall range", "WSPROBE_FIREWALL_RANGE", "firewall_range"),
            ),
            (
                &self.sql_user,
                FieldMetadata::new("SQL user", "WSPROBE_SQL_USER", "sql_user"),
            ),
            (
                &self.database,
                FieldMetadata::new("database name", "WSPROBE_DATABASE", "database"),
            ),
        ];
        for (value, metadata) in &strings {
            Self::require_field(value, metadata)?;
        }

        Self::require_nonzero(
            u64::from(self.sql_port),
            &FieldMetadata::new("SQL port", "WSPROBE_SQL_PORT", "sql_port"),
        )?;
        Self::require_nonzero(
            self.poll_interval_secs,
            &FieldMetadata::new(
                "poll interval",
                "WSPROBE_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            ),
        )?;
        let attempts = FieldMetadata::new(
            "action attempt count",
            "WSPROBE_ACTION_ATTEMPTS",
            "action_attempts",
        );
        Self::require_nonzero(u64::from(self.action_attempts), &attempts)?;
        Self::require_at_most(
            u64::from(self.action_attempts),
            u64::from(DEFAULT_ACTION_ATTEMPTS),
            &attempts,
        )?;
        Self::require_nonzero(
            self.connect_timeout_secs,
            &FieldMetadata::new(
                "connect timeout",
                "WSPROBE_CONNECT_TIMEOUT_SECS",
                "connect_timeout_secs",
            ),
        )?;
        Ok(())
    }

    /// Polling policy for workspace state waits. Waits are unbounded.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy::unbounded(Duration::from_secs(self.poll_interval_secs))
    }

    /// Retry policy for suspend and resume requests. The spacing between
    /// requests is fixed at 3 s whatever the poll interval.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.action_attempts, DEFAULT_POLL_INTERVAL)
    }

    /// SQL settings used by the connectivity probe.
    #[must_use]
    pub fn sql_settings(&self) -> SqlSettings {
        SqlSettings {
            user: self.sql_user.clone(),
            port: self.sql_port,
            database: self.database.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Returns the configured admin password or generates a fresh one.
    #[must_use]
    pub fn admin_password_or_generate(&self) -> String {
        self.admin_password
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(
                || format!("Wsprobe-{}!", Uuid::new_v4().simple()),
                str::to_owned,
            )
    }

    /// Configured region, if any.
    #[must_use]
    pub fn configured_region(&self) -> Option<RegionId> {
        self.region_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(RegionId::from)
    }

    /// Builds the provisioning request for one run.
    ///
    /// Group and workspace names carry a random suffix so concurrent or
    /// repeated runs never collide.
    #[must_use]
    pub fn provision_request(&self, region_id: RegionId, admin_password: String) -> ProvisionRequest {
        let suffix = Uuid::new_v4().simple().to_string();
        ProvisionRequest {
            group: WorkspaceGroupRequest {
                name: format!("wsprobe-{suffix}"),
                region_id,
                admin_password,
                firewall_ranges: vec![self.firewall_range.trim().to_owned()],
                allow_all_traffic: true,
            },
            workspace_name: format!("wsprobe-ws-{suffix}"),
            workspace_size: self.workspace_size.trim().to_owned(),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Raised when `API_KEY` is not set.
    #[error("{}", API_KEY_HELP)]
    MissingApiKey,
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a numeric setting exceeds its allowed maximum.
    #[error("configuration value out of range: {0}")]
    OutOfRange(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when the region listing offers nothing for the provider.
    #[error("no region available for provider {provider}; set WSPROBE_REGION_ID")]
    NoRegion {
        /// Provider that was searched for.
        provider: String,
    },
}
