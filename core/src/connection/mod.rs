//! Connection configuration and session ownership.
//!
//! A [`Connection`] owns one `SQLHDBC`, a [`Dialect`] chosen by the caller (or
//! inferred from the connection string via [`detect_backend`]), and a handle
//! to the process-wide logger. Backend-specific [`Dialect`] impls live in the
//! sibling `drivers/*` crates, keeping only the trait vocabulary in `core`
//! and per-vendor rendering rules in per-backend crates.

pub mod retry;

use std::sync::Arc;

use crate::dialect::{Backend, Dialect};
use crate::error::Result;
use crate::handle::{Environment, RawConnection};
use crate::logger::{logger, LogEvent};

/// A direct ODBC connection string, or a {data-source, user, password,
/// timeout} tuple — both forms reduce to a connection string before dialing.
#[derive(Debug, Clone)]
pub enum ConnectionConfig {
    ConnectionString(String),
    Dsn(SqlDsnInfo),
}

/// A DSN-style connection descriptor.
#[derive(Debug, Clone)]
pub struct SqlDsnInfo {
    pub data_source: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u32,
}

impl Default for SqlDsnInfo {
    fn default() -> Self {
        Self { data_source: String::new(), username: String::new(), password: String::new(), timeout_seconds: 15 }
    }
}

impl SqlDsnInfo {
    /// Renders the DSN tuple as a connection string.
    pub fn to_connection_string(&self) -> String {
        format!(
            "DSN={};UID={};PWD={};Connection Timeout={}",
            self.data_source, self.username, self.password, self.timeout_seconds
        )
    }
}

impl ConnectionConfig {
    pub fn to_connection_string(&self) -> String {
        match self {
            ConnectionConfig::ConnectionString(s) => s.clone(),
            ConnectionConfig::Dsn(dsn) => dsn.to_connection_string(),
        }
    }

    /// Same rendering with `PWD=...`/`Password=...` elided, for logging.
    pub fn to_connection_string_redacted(&self) -> String {
        redact_password(&self.to_connection_string())
    }
}

fn redact_password(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|kv| {
            let lower = kv.trim_start().to_ascii_lowercase();
            if lower.starts_with("pwd=") || lower.starts_with("password=") {
                let (key, _) = kv.split_once('=').unwrap_or((kv, ""));
                format!("{key}=***")
            } else {
                kv.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Infers the backend from an ODBC driver name or DSN string by matching
/// well-known driver substrings.
pub fn detect_backend(connection_string: &str) -> Option<Backend> {
    let lower = connection_string.to_ascii_lowercase();
    if lower.contains("sql server") || lower.contains("sqlserver") || lower.contains("sqlncli") || lower.contains("msodbcsql") {
        Some(Backend::SqlServer)
    } else if lower.contains("postgres") || lower.contains("psqlodbc") {
        Some(Backend::PostgreSql)
    } else if lower.contains("sqlite") {
        Some(Backend::Sqlite)
    } else if lower.contains("mysql") || lower.contains("mariadb") {
        Some(Backend::MySql)
    } else {
        None
    }
}

/// An owned ODBC session plus the dialect and logger context every statement
/// built on top of it needs.
pub struct Connection {
    env: Arc<Environment>,
    raw: RawConnection,
    dialect: Arc<dyn Dialect>,
}

impl Connection {
    /// Opens a new connection, dialing `config`'s rendered connection string
    /// through `env` and adopting `dialect` for all SQL rendering.
    pub fn open(env: Arc<Environment>, config: &ConnectionConfig, dialect: Arc<dyn Dialect>) -> Result<Self> {
        let mut raw = RawConnection::allocate(&env)?;
        let connection_string = config.to_connection_string();
        logger().log(LogEvent::Connecting { target: config.to_connection_string_redacted() });
        raw.connect_with_string(&connection_string)?;
        logger().log(LogEvent::Connected { backend: dialect.backend() });
        Ok(Self { env, raw, dialect })
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn dialect_arc(&self) -> Arc<dyn Dialect> {
        self.dialect.clone()
    }

    pub(crate) fn raw(&self) -> &RawConnection {
        &self.raw
    }

    pub(crate) fn raw_mut(&mut self) -> &mut RawConnection {
        &mut self.raw
    }

    pub(crate) fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Runs `body` inside a transaction: turns autocommit off, commits on
    /// `Ok`, rolls back on `Err`, then restores autocommit. Used by the
    /// migration runner's per-step transaction and the migration lock's
    /// `BEGIN`/`COMMIT`/`ROLLBACK` pattern.
    pub fn transaction<T>(&mut self, body: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.raw.set_autocommit(false)?;
        let result = body(&*self);
        match &result {
            Ok(_) => self.raw.commit()?,
            Err(_) => {
                let _ = self.raw.rollback();
            }
        }
        self.raw.set_autocommit(true)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_backend_from_driver_name() {
        assert_eq!(detect_backend("Driver={ODBC Driver 18 for SQL Server};Server=..."), Some(Backend::SqlServer));
        assert_eq!(detect_backend("Driver={PostgreSQL Unicode}"), Some(Backend::PostgreSql));
        assert_eq!(detect_backend("Driver=SQLite3"), Some(Backend::Sqlite));
        assert_eq!(detect_backend("Driver={MySQL ODBC 8.0 Driver}"), Some(Backend::MySql));
        assert_eq!(detect_backend("Driver=Unknown"), None);
    }

    #[test]
    fn redacts_password_but_keeps_other_keys() {
        let redacted = redact_password("Driver=X;UID=admin;PWD=hunter2;Database=db");
        assert!(redacted.contains("PWD=***"));
        assert!(redacted.contains("UID=admin"));
        assert!(!redacted.contains("hunter2"));
    }

    #[test]
    fn dsn_renders_connection_string() {
        let dsn = SqlDsnInfo { data_source: "mydb".into(), username: "u".into(), password: "p".into(), timeout_seconds: 30 };
        let s = dsn.to_connection_string();
        assert!(s.contains("DSN=mydb"));
        assert!(s.contains("Connection Timeout=30"));
    }
}
