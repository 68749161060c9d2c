//! sqlx-backed connections.
//!
//! Each platform is compiled in through its cargo feature (`mysql`,
//! `postgresql`, `sqlite`). Opening a connection for a platform whose
//! feature is disabled is reported as a configuration error.

use super::{Connector, DatabaseConnection};
use crate::config::DatabaseProfile;
use crate::error::DumpError;
use crate::models::PlatformKind;
use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

/// Driver connection behind a [`SqlxConnection`].
#[derive(Debug)]
pub enum RawConnection {
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlConnection),
    #[cfg(feature = "postgresql")]
    Postgres(sqlx::PgConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqliteConnection),
}

/// A single, unpooled sqlx connection.
#[derive(Debug)]
pub struct SqlxConnection {
    raw: RawConnection,
}

impl SqlxConnection {
    /// Wraps a connection the caller opened, e.g. for
    /// [`ConnectionHandler::with_connection`](super::ConnectionHandler::with_connection).
    pub fn from_raw(raw: RawConnection) -> Self {
        Self { raw }
    }
}

#[async_trait]
impl DatabaseConnection for SqlxConnection {
    type Raw = RawConnection;

    fn platform(&self) -> PlatformKind {
        match &self.raw {
            #[cfg(feature = "mysql")]
            RawConnection::MySql(_) => PlatformKind::MySql,
            #[cfg(feature = "postgresql")]
            RawConnection::Postgres(_) => PlatformKind::PostgreSql,
            #[cfg(feature = "sqlite")]
            RawConnection::Sqlite(_) => PlatformKind::Sqlite,
        }
    }

    async fn ping(&mut self) -> bool {
        let result = match &mut self.raw {
            #[cfg(feature = "mysql")]
            RawConnection::MySql(conn) => conn.ping().await,
            #[cfg(feature = "postgresql")]
            RawConnection::Postgres(conn) => conn.ping().await,
            #[cfg(feature = "sqlite")]
            RawConnection::Sqlite(conn) => conn.ping().await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Connection liveness probe failed");
                false
            }
        }
    }

    async fn execute(&mut self, sql: &str) -> crate::Result<u64> {
        let platform = self.platform();
        let rows_affected = match &mut self.raw {
            #[cfg(feature = "mysql")]
            RawConnection::MySql(conn) => conn.execute(sql).await.map(|r| r.rows_affected()),
            #[cfg(feature = "postgresql")]
            RawConnection::Postgres(conn) => conn.execute(sql).await.map(|r| r.rows_affected()),
            #[cfg(feature = "sqlite")]
            RawConnection::Sqlite(conn) => conn.execute(sql).await.map(|r| r.rows_affected()),
        };
        rows_affected.map_err(|e| {
            DumpError::query_failed(format!("Failed to execute statement on {}", platform), e)
        })
    }

    async fn close(self) -> crate::Result<()> {
        let platform = self.platform();
        let result = match self.raw {
            #[cfg(feature = "mysql")]
            RawConnection::MySql(conn) => conn.close().await,
            #[cfg(feature = "postgresql")]
            RawConnection::Postgres(conn) => conn.close().await,
            #[cfg(feature = "sqlite")]
            RawConnection::Sqlite(conn) => conn.close().await,
        };
        result.map_err(|e| {
            DumpError::connection_failed(format!("Failed to close {} connection", platform), e)
        })
    }

    fn raw(&mut self) -> &mut RawConnection {
        &mut self.raw
    }
}

/// Opens single sqlx connections from a [`DatabaseProfile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnector;

#[async_trait]
impl Connector for SqlxConnector {
    type Connection = SqlxConnection;

    async fn open(&self, profile: &DatabaseProfile) -> crate::Result<SqlxConnection> {
        let platform = profile.platform()?;
        let raw = match platform {
            #[cfg(feature = "mysql")]
            PlatformKind::MySql => RawConnection::MySql(open_mysql(profile).await?),
            #[cfg(feature = "postgresql")]
            PlatformKind::PostgreSql => RawConnection::Postgres(open_postgres(profile).await?),
            #[cfg(feature = "sqlite")]
            PlatformKind::Sqlite => RawConnection::Sqlite(open_sqlite(profile).await?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(DumpError::configuration(format!(
                    "{} support not compiled in; enable the matching cargo feature",
                    other
                )));
            }
        };

        debug!(platform = %platform, database = %profile, "Opened database connection");
        Ok(SqlxConnection { raw })
    }
}

fn open_failed(profile: &DatabaseProfile, error: sqlx::Error) -> DumpError {
    DumpError::connection_failed(format!("Failed to connect to {}", profile), error)
}

#[cfg(feature = "mysql")]
async fn open_mysql(profile: &DatabaseProfile) -> crate::Result<sqlx::MySqlConnection> {
    let mut options = sqlx::mysql::MySqlConnectOptions::new();
    if let Some(host) = &profile.host {
        options = options.host(host);
    }
    if let Some(port) = profile.port {
        options = options.port(port);
    }
    if let Some(user) = &profile.user {
        options = options.username(user);
    }
    if let Some(password) = profile.password() {
        options = options.password(password);
    }
    if let Some(dbname) = &profile.dbname {
        options = options.database(dbname);
    }
    if let Some(charset) = &profile.charset {
        options = options.charset(charset);
    }

    options.connect().await.map_err(|e| open_failed(profile, e))
}

#[cfg(feature = "postgresql")]
async fn open_postgres(profile: &DatabaseProfile) -> crate::Result<sqlx::PgConnection> {
    let mut options = sqlx::postgres::PgConnectOptions::new();
    if let Some(host) = &profile.host {
        options = options.host(host);
    }
    if let Some(port) = profile.port {
        options = options.port(port);
    }
    if let Some(user) = &profile.user {
        options = options.username(user);
    }
    if let Some(password) = profile.password() {
        options = options.password(password);
    }
    if let Some(dbname) = &profile.dbname {
        options = options.database(dbname);
    }
    if let Some(charset) = &profile.charset {
        options = options.options([("client_encoding", charset.as_str())]);
    }

    options.connect().await.map_err(|e| open_failed(profile, e))
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(profile: &DatabaseProfile) -> crate::Result<sqlx::SqliteConnection> {
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    let dbname = profile
        .dbname
        .as_deref()
        .ok_or_else(|| DumpError::configuration("database.dbname is required for SQLite"))?;

    let options = if dbname == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| open_failed(profile, e))?
    } else {
        // The dump never writes to the source database
        SqliteConnectOptions::new().filename(dbname).read_only(true)
    };

    options.connect().await.map_err(|e| open_failed(profile, e))
}
