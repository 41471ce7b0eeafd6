//! SQL connectivity probe: connect, run `select 1`, scan the single value.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, FromValueError, OptsBuilder, Row};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

/// Query sent by the probe.
pub const PROBE_QUERY: &str = "select 1";

/// Connection settings shared by every probe of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqlSettings {
    /// SQL user name.
    pub user: String,
    /// TCP port of the endpoint.
    pub port: u16,
    /// Database selected on connect.
    pub database: String,
    /// Upper bound on connection establishment.
    pub connect_timeout: Duration,
}

impl SqlSettings {
    /// Combines these settings with a workspace endpoint and password.
    #[must_use]
    pub fn target(&self, host: &str, password: &str) -> ProbeTarget {
        ProbeTarget {
            host: host.to_owned(),
            port: self.port,
            user: self.user.clone(),
            password: password.to_owned(),
            database: self.database.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Fully resolved SQL endpoint.
#[derive(Clone, Eq, PartialEq)]
pub struct ProbeTarget {
    /// Endpoint hostname.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// SQL user name.
    pub user: String,
    /// SQL password.
    pub password: String,
    /// Database selected on connect.
    pub database: String,
    /// Upper bound on connection establishment.
    pub connect_timeout: Duration,
}

impl ProbeTarget {
    /// `host:port/database` rendering used in logs and errors.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl std::fmt::Debug for ProbeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Failures of the individual probe stages.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProbeError {
    /// Raised when the connection cannot be established.
    #[error("failed to connect to {address}: {message}")]
    Connect {
        /// `host:port/database` of the endpoint.
        address: String,
        /// Driver error message.
        message: String,
    },
    /// Raised when the connection is not established within the timeout.
    #[error("connecting to {address} timed out after {timeout:?}")]
    ConnectTimeout {
        /// `host:port/database` of the endpoint.
        address: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Raised when the query cannot be executed.
    #[error("failed to run `select 1`: {message}")]
    Query {
        /// Driver error message.
        message: String,
    },
    /// Raised when the result does not hold a single integer.
    #[error("failed to scan `select 1` result: {message}")]
    Scan {
        /// Description of the mismatch.
        message: String,
    },
}

/// Future returned by [`ConnectivityProbe::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<i64, ProbeError>> + Send + 'a>>;

/// Confirms that a SQL endpoint answers queries.
pub trait ConnectivityProbe {
    /// Runs the probe and returns the scanned value.
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> ProbeFuture<'a>;
}

/// Probe speaking the MySQL wire protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySqlProbe;

impl MySqlProbe {
    async fn run(target: &ProbeTarget) -> Result<i64, ProbeError> {
        let address = target.address();
        let opts = OptsBuilder::default()
            .ip_or_hostname(target.host.clone())
            .tcp_port(target.port)
            .user(Some(target.user.clone()))
            .pass(Some(target.password.clone()))
            .db_name(Some(target.database.clone()));

        debug!(%address, "connecting to workspace endpoint");
        let mut conn = timeout(target.connect_timeout, Conn::new(opts))
            .await
            .map_err(|_| ProbeError::ConnectTimeout {
                address: address.clone(),
                timeout: target.connect_timeout,
            })?
            .map_err(|err| ProbeError::Connect {
                address: address.clone(),
                message: err.to_string(),
            })?;

        let outcome = query_single_integer(&mut conn).await;
        if let Err(err) = conn.disconnect().await {
            debug!(%address, error = %err, "failed to close probe connection");
        }

        if let Ok(value) = &outcome {
            info!(%address, value, "connectivity probe succeeded");
        }
        outcome
    }
}

impl ConnectivityProbe for MySqlProbe {
    fn probe<'a>(&'a self, target: &'a ProbeTarget) -> ProbeFuture<'a> {
        Box::pin(Self::run(target))
    }
}

async fn query_single_integer(conn: &mut Conn) -> Result<i64, ProbeError> {
    let first_row: Option<Row> =
        conn.query_first(PROBE_QUERY)
            .await
            .map_err(|err| ProbeError::Query {
                message: err.to_string(),
            })?;
    let row = first_row.ok_or_else(|| ProbeError::Scan {
        message: String::from("query returned no rows"),
    })?;
    scan_value(row.get_opt::<i64, usize>(0))
}

/// Interprets the first column of the probe row.
fn scan_value(column: Option<Result<i64, FromValueError>>) -> Result<i64, ProbeError> {
    match column {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(ProbeError::Scan {
            message: err.to_string(),
        }),
        None => Err(ProbeError::Scan {
            message: String::from("row has no columns"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::{Value, from_value_opt};
    use rstest::rstest;

    fn settings() -> SqlSettings {
        SqlSettings {
            user: String::from("admin"),
            port: 3306,
            database: String::from("information_schema"),
            connect_timeout: Duration::from_secs(10),
        }
    }

    #[rstest]
    #[case::text_protocol(Value::Bytes(b"1".to_vec()))]
    #[case::binary_protocol(Value::Int(1))]
    fn scan_value_reads_back_one(#[case] raw: Value) {
        let scanned = scan_value(Some(from_value_opt::<i64>(raw)));
        assert_eq!(scanned, Ok(1));
    }

    #[test]
    fn scan_value_rejects_non_integer() {
        let scanned = scan_value(Some(from_value_opt::<i64>(Value::Bytes(b"one".to_vec()))));
        assert!(
            matches!(scanned, Err(ProbeError::Scan { .. })),
            "unexpected scan outcome: {scanned:?}"
        );
    }

    #[test]
    fn scan_value_rejects_missing_column() {
        let scanned = scan_value(None);
        assert_eq!(
            scanned,
            Err(ProbeError::Scan {
                message: String::from("row has no columns")
            })
        );
    }

    #[test]
    fn target_combines_settings_with_endpoint() {
        let target = settings().target("svc-1.example.test", "pw");
        assert_eq!(target.address(), "svc-1.example.test:3306/information_schema");
        assert_eq!(target.user, "admin");
        assert_eq!(target.password, "pw");
    }

    #[test]
    fn target_debug_hides_password() {
        let target = settings().target("host", "hunter2");
        assert!(!format!("{target:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn probe_reports_connect_failure_for_closed_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind listener: {err}"));
        let port = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("listener addr: {err}"))
            .port();
        drop(listener);

        let target = SqlSettings {
            port,
            connect_timeout: Duration::from_secs(5),
            ..settings()
        }
        .target("127.0.0.1", "pw");

        let err = MySqlProbe
            .probe(&target)
            .await
            .expect_err("closed port should fail");
        assert!(
            matches!(err, ProbeError::Connect { .. } | ProbeError::ConnectTimeout { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn probe_times_out_when_server_never_greets() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind listener: {err}"));
        let port = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("listener addr: {err}"))
            .port();
        let silent = tokio::spawn(async move {
            let accepted = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(accepted);
        });

        let target = SqlSettings {
            port,
            connect_timeout: Duration::from_millis(200),
            ..settings()
        }
        .target("127.0.0.1", "pw");

        let err = MySqlProbe
            .probe(&target)
            .await
            .expect_err("silent server should time out");
        assert_eq!(
            err,
            ProbeError::ConnectTimeout {
                address: target.address(),
                timeout: Duration::from_millis(200),
            }
        );
        assert!(err.to_string().ends_with("timed out after 200ms"), "{err}");
        silent.abort();
    }
}
