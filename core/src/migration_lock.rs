//! Cross-process migration lock.
//!
//! One advisory lock per named resource, acquired and released with
//! backend-specific primitives: SQL Server `sp_getapplock`/`sp_releaseapplock`,
//! PostgreSQL `pg_advisory_lock`/`pg_advisory_unlock` under a session
//! `lock_timeout`, SQLite `PRAGMA busy_timeout` + `BEGIN IMMEDIATE`. The
//! [`Dialect`] trait stays pure SQL-string rendering; the per-backend control
//! flow here (parsing `sp_getapplock`'s return code, distinguishing a timed
//! out `BEGIN IMMEDIATE` from a genuine driver error) does not fit that seam
//! so it matches on [`Backend`] directly instead, the same way the backup
//! engine matches on backend family for concerns that cut across the
//! [`Dialect`] trait boundary.

use std::time::Duration;

use crate::connection::Connection;
use crate::dialect::Backend;
use crate::error::{Error, Result, Status};
use crate::statement::Statement;

/// A held advisory lock on `name`. Dropping releases it; moving transfers
/// ownership the ordinary way Rust moves do (this struct has no
/// special-cased `Drop` dance beyond the `released` guard against
/// double-release on an explicit [`MigrationLock::release`] call).
pub struct MigrationLock<'a> {
    conn: &'a mut Connection,
    name: String,
    released: bool,
}

impl<'a> MigrationLock<'a> {
    /// Acquires the named lock, blocking up to `timeout` (per backend's own
    /// wait semantics) before failing with [`Status::LockTimeout`].
    pub fn acquire(conn: &'a mut Connection, name: &str, timeout: Duration) -> Result<Self> {
        let backend = conn.dialect().backend();
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        match backend {
            Backend::SqlServer => acquire_sql_server(conn, name, timeout_ms)?,
            Backend::PostgreSql => acquire_postgresql(conn, name, timeout_ms)?,
            Backend::Sqlite => acquire_sqlite(conn, timeout_ms)?,
            Backend::MySql => acquire_mysql(conn, name, timeout)?,
        }
        Ok(Self { conn, name: name.to_string(), released: false })
    }

    /// Releases the lock early. Calling this twice, or letting the guard
    /// drop afterwards, is a no-op.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let backend = self.conn.dialect().backend();
        match backend {
            Backend::SqlServer => release_sql_server(self.conn, &self.name),
            Backend::PostgreSql => release_postgresql(self.conn, &self.name),
            Backend::Sqlite => release_sqlite(self.conn),
            Backend::MySql => release_mysql(self.conn, &self.name),
        }
    }
}

impl Drop for MigrationLock<'_> {
    fn drop(&mut self) {
        let _ = self.release_inner();
    }
}

fn acquire_sql_server(conn: &Connection, name: &str, timeout_ms: i32) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let sql = format!(
        "DECLARE @migration_lock_result int; \
         EXEC @migration_lock_result = sp_getapplock @Resource = {quoted}, \
             @LockMode = 'Exclusive', @LockOwner = 'Session', @LockTimeout = {timeout_ms}; \
         SELECT @migration_lock_result;"
    );
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&sql)?;
    stmt.execute()?;
    if !stmt.fetch_row()? {
        return Err(Error::new("sp_getapplock returned no result row", Status::Driver));
    }
    let result: i32 = stmt.get_column(1)?;
    match result {
        r if r >= 0 => Ok(()),
        -1 => Err(Error::new(format!("migration lock {name:?} timed out after {timeout_ms}ms"), Status::LockTimeout)),
        r => Err(Error::new(format!("sp_getapplock failed with code {r}"), Status::Driver)),
    }
}

fn release_sql_server(conn: &Connection, name: &str) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let sql = format!("EXEC sp_releaseapplock @Resource = {quoted}, @LockOwner = 'Session';");
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&sql)?;
    stmt.execute()
}

fn acquire_postgresql(conn: &Connection, name: &str, timeout_ms: i32) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&format!("SET lock_timeout = '{timeout_ms}ms';"))?;
    stmt.execute()?;
    stmt.prepare(&format!("SELECT pg_advisory_lock(hashtext({quoted})::bigint);"))?;
    match stmt.execute() {
        Ok(()) => Ok(()),
        Err(e) if e.status == Status::TransactionConflict || e.message.contains("statement timeout") || e.message.contains("canceling statement") => {
            Err(Error::new(format!("migration lock {name:?} timed out after {timeout_ms}ms"), Status::LockTimeout))
        }
        Err(e) => Err(e),
    }
}

fn release_postgresql(conn: &Connection, name: &str) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&format!("SELECT pg_advisory_unlock(hashtext({quoted})::bigint);"))?;
    stmt.execute()
}

fn acquire_sqlite(conn: &Connection, timeout_ms: i32) -> Result<()> {
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&format!("PRAGMA busy_timeout = {timeout_ms};"))?;
    stmt.execute()?;
    stmt.prepare("BEGIN IMMEDIATE;")?;
    match stmt.execute() {
        Ok(()) => Ok(()),
        Err(e) if e.status == Status::TransactionConflict => {
            Err(Error::new(format!("migration lock timed out after {timeout_ms}ms"), Status::LockTimeout))
        }
        Err(e) => Err(e),
    }
}

fn release_sqlite(conn: &Connection) -> Result<()> {
    let mut stmt = Statement::new(conn)?;
    stmt.prepare("COMMIT;")?;
    if let Err(commit_err) = stmt.execute() {
        let mut rollback = Statement::new(conn)?;
        rollback.prepare("ROLLBACK;")?;
        let _ = rollback.execute();
        return Err(commit_err);
    }
    Ok(())
}

/// MySQL carries the same `GET_LOCK`/`RELEASE_LOCK` advisory primitive as the
/// other three backends, rendered in the same
/// procedural shape as the PostgreSQL path.
fn acquire_mysql(conn: &Connection, name: &str, timeout: Duration) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let timeout_secs = timeout.as_secs_f64();
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&format!("SELECT GET_LOCK({quoted}, {timeout_secs});"))?;
    stmt.execute()?;
    if !stmt.fetch_row()? {
        return Err(Error::new("GET_LOCK returned no result row", Status::Driver));
    }
    let acquired: Option<i32> = stmt.get_nullable_column(1)?;
    match acquired {
        Some(1) => Ok(()),
        Some(0) => Err(Error::new(format!("migration lock {name:?} timed out after {timeout_secs}s"), Status::LockTimeout)),
        _ => Err(Error::new("GET_LOCK failed (error acquiring lock)", Status::Driver)),
    }
}

fn release_mysql(conn: &Connection, name: &str) -> Result<()> {
    let quoted = conn.dialect().quote_string_literal(name);
    let mut stmt = Statement::new(conn)?;
    stmt.prepare(&format!("SELECT RELEASE_LOCK({quoted});"))?;
    stmt.execute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_ms_clamps_to_i32_range() {
        let huge = Duration::from_secs(u64::MAX);
        let clamped = huge.as_millis().min(i32::MAX as u128) as i32;
        assert_eq!(clamped, i32::MAX);
    }
}
