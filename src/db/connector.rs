use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::types::Json;
use sqlx::{Connection, Row};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::models::Report;
use crate::error::AppError;
use crate::types::ReportDate;

const APPLICATION_NAME: &str = "jspoc";

/// Opens one database connection per call. Implementations must not pool or share handles.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn ReportConnection>, AppError>>;
}

/// A live, exclusively owned connection.
pub trait ReportConnection: Send + 'static {
    fn find_report<'a>(
        &'a mut self,
        date: &'a ReportDate,
    ) -> BoxFuture<'a, Result<Option<Report>, AppError>>;

    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Standalone,
    /// Reads prefer the primary and fall back to a standby when no primary answers.
    ReplicaSet { name: String },
}

impl Topology {
    pub fn from_config(cfg: &Config) -> Self {
        match (cfg.is_production(), cfg.database.replicaset.as_ref()) {
            (true, Some(name)) => Topology::ReplicaSet { name: name.clone() },
            _ => Topology::Standalone,
        }
    }
}

/// Runs one attempt against `host`, refusing it once `limit` has passed.
async fn bounded<T>(
    host: &str,
    limit: Duration,
    attempt: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(host = %host, timeout = ?limit, "database host did not answer in time");
            Err(AppError::ConnectionRefused)
        }
    }
}

/// PostgreSQL backed connector. Reports are rows of `reports(date TEXT PRIMARY KEY, document JSONB)`.
pub struct PgConnector {
    hosts: Vec<String>,
    port: u16,
    database: String,
    username: String,
    password: String,
    connect_timeout: Duration,
    topology: Topology,
}

impl PgConnector {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            hosts: cfg.database_hosts(),
            port: cfg.database.port,
            database: cfg.database.db.clone(),
            username: cfg.database.user.clone(),
            password: cfg.database.pwd.clone(),
            connect_timeout: Duration::from_secs(cfg.database.connect_timeout_secs),
            topology: Topology::from_config(cfg),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    fn options(&self, host: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .application_name(APPLICATION_NAME)
    }

    async fn open_standalone(&self) -> Result<PgReportConnection, AppError> {
        let host = self
            .hosts
            .first()
            .ok_or_else(|| AppError::Config("database.host is empty".to_string()))?;
        // The startup handshake authenticates, so a successful connect is an authenticated session.
        let conn = bounded(
            host,
            self.connect_timeout,
            PgConnection::connect_with(&self.options(host)),
        )
        .await?;
        Ok(PgReportConnection {
            conn,
            member: host.clone(),
        })
    }

    async fn open_replica_set(&self, name: &str) -> Result<PgReportConnection, AppError> {
        let mut standby: Option<PgReportConnection> = None;

        for host in &self.hosts {
            let opened = bounded(
                host,
                self.connect_timeout,
                PgConnection::connect_with(&self.options(host)),
            )
            .await;
            let mut conn = match opened {
                Ok(c) => c,
                Err(e) => {
                    debug!(host = %host, error = %e, "replica set member unreachable");
                    continue;
                }
            };

            let role = bounded(host, self.connect_timeout, async {
                let row = sqlx::query(
                    "SELECT current_setting('cluster_name') AS cluster, pg_is_in_recovery() AS in_recovery",
                )
                .fetch_one(&mut conn)
                .await?;
                Ok::<_, sqlx::Error>((
                    row.try_get::<String, _>("cluster")?,
                    row.try_get::<bool, _>("in_recovery")?,
                ))
            })
            .await;
            let (cluster, in_recovery) = match role {
                Ok(v) => v,
                Err(e) => {
                    debug!(host = %host, error = %e, "could not read replica set role");
                    let _ = conn.close().await;
                    continue;
                }
            };

            if cluster != name {
                warn!(host = %host, cluster = %cluster, expected = %name, "host is not a member of the replica set");
                let _ = conn.close().await;
                continue;
            }

            if !in_recovery {
                if let Some(spare) = standby.take() {
                    let _ = spare.conn.close().await;
                }
                return Ok(PgReportConnection {
                    conn,
                    member: host.clone(),
                });
            }

            if standby.is_none() {
                standby = Some(PgReportConnection {
                    conn,
                    member: host.clone(),
                });
            } else {
                let _ = conn.close().await;
            }
        }

        standby.ok_or_else(|| AppError::NoReplicaSetMember(name.to_string()))
    }
}

impl Connector for PgConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn ReportConnection>, AppError>> {
        Box::pin(async move {
            let opened = match &self.topology {
                Topology::Standalone => self.open_standalone().await,
                Topology::ReplicaSet { name } => self.open_replica_set(name).await,
            };
            match opened {
                Ok(conn) => {
                    debug!(member = %conn.member, "database connection opened");
                    Ok(Box::new(conn) as Box<dyn ReportConnection>)
                }
                Err(e) => {
                    warn!(error = %e, "database connection refused");
                    Err(AppError::ConnectionRefused)
                }
            }
        })
    }
}

pub struct PgReportConnection {
    conn: PgConnection,
    member: String,
}

impl ReportConnection for PgReportConnection {
    fn find_report<'a>(
        &'a mut self,
        date: &'a ReportDate,
    ) -> BoxFuture<'a, Result<Option<Report>, AppError>> {
        Box::pin(async move {
            let row: Option<(Json<Value>,)> =
                sqlx::query_as("SELECT document FROM reports WHERE date = $1")
                    .bind(date.key())
                    .fetch_optional(&mut self.conn)
                    .await?;
            Ok(row.map(|(Json(document),)| Report::new(date, document)))
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let member = self.member;
            match self.conn.close().await {
                Ok(()) => debug!(member = %member, "database connection closed"),
                Err(e) => info!(member = %member, error = %e, "database connection closed uncleanly"),
            }
        })
    }
}
