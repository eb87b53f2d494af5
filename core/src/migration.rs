//! Migration manager: a timestamp-ordered registry of
//! migrations, applied against a `schema_migrations(version, checksum,
//! applied_at)` history table maintained idempotently.

use chrono::{NaiveDateTime, Utc};

use crate::binder::dynamic_string::SqlDynamicString;
use crate::connection::Connection;
use crate::dialect::{ColumnType, Dialect};
use crate::error::{Error, MigrationError, Result, Status};
use crate::query::{ColumnDef, MigrationBuilder};
use crate::statement::Statement;

/// One registered migration. Implementors render their `Up`/`Down` plans
/// through [`MigrationBuilder`] the same way any other schema change does.
pub trait Migration: Send + Sync {
    /// Unique, monotonic identifier (conventionally `YYYYMMDDHHMMSS`).
    fn version(&self) -> i64;
    fn title(&self) -> &str;
    fn up(&self, dialect: &dyn Dialect) -> MigrationBuilder;
    fn down(&self, dialect: &dyn Dialect) -> MigrationBuilder;
}

/// A `VerifyChecksums` mismatch: the stored checksum no longer matches what
/// the migration's current source would compute. `stored: None` ("stored
/// empty") is treated as legacy-ok and never appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub version: i64,
    pub stored: String,
    pub computed: String,
}

const HISTORY_TABLE: &str = "schema_migrations";

fn history_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("version", ColumnType::Bigint).primary_key(false),
        ColumnDef::new("checksum", ColumnType::Char(65)),
        ColumnDef::new("applied_at", ColumnType::DateTime),
    ]
}

/// Ordered registry plus the operations a migration runner needs.
#[derive(Default)]
pub struct MigrationManager {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a migration, keeping the list sorted by timestamp
    /// ascending. Migration timestamps within a single registry must be
    /// unique.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<()> {
        if self.migrations.iter().any(|m| m.version() == migration.version()) {
            return Err(Error::new(format!("duplicate migration timestamp {}", migration.version()), Status::InvalidArguments));
        }
        let pos = self.migrations.partition_point(|m| m.version() < migration.version());
        self.migrations.insert(pos, migration);
        Ok(())
    }

    fn ensure_history_table(&self, conn: &Connection) -> Result<()> {
        let mut builder = MigrationBuilder::new();
        builder.create_table(HISTORY_TABLE, history_columns());
        let mut stmt = Statement::new(conn)?;
        for sql in builder.statements(conn.dialect()) {
            if let Err(e) = stmt.prepare(&sql).and_then(|_| stmt.execute()) {
                if e.status != Status::TableExists {
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn applied_versions(&self, conn: &Connection) -> Result<Vec<i64>> {
        let dialect = conn.dialect();
        let sql = format!("SELECT {} FROM {} ORDER BY {} ASC", dialect.quote_identifier("version"), dialect.quote_identifier(HISTORY_TABLE), dialect.quote_identifier("version"));
        let mut stmt = Statement::new(conn)?;
        stmt.prepare(&sql)?;
        stmt.execute()?;
        let mut out = Vec::new();
        while stmt.fetch_row()? {
            out.push(stmt.get_column::<i64>(1)?);
        }
        Ok(out)
    }

    /// Applies every migration not yet present in the history table, in
    /// ascending timestamp order, each inside its own transaction. Returns
    /// the versions actually applied.
    pub fn apply_pending(&self, conn: &mut Connection) -> Result<Vec<i64>> {
        self.ensure_history_table(conn)?;
        let applied = self.applied_versions(conn)?;
        let mut newly_applied = Vec::new();

        for migration in &self.migrations {
            if applied.contains(&migration.version()) {
                continue;
            }
            let dialect = conn.dialect_arc();
            let plan = migration.up(dialect.as_ref());
            let statements = plan.statements(dialect.as_ref());
            let checksum = plan.checksum(dialect.as_ref());
            let version = migration.version();
            let title = migration.title().to_string();

            conn.transaction(|conn| {
                let mut stmt = Statement::new(conn)?;
                for (step, sql) in statements.iter().enumerate() {
                    stmt.prepare(sql).and_then(|_| stmt.execute()).map_err(|source| {
                        Error::from(MigrationError { title: title.clone(), timestamp: version, step, statement: sql.clone(), source })
                    })?;
                }
                let insert = format!(
                    "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                    dialect.quote_identifier(HISTORY_TABLE),
                    dialect.quote_identifier("version"),
                    dialect.quote_identifier("checksum"),
                    dialect.quote_identifier("applied_at"),
                );
                let mut history_stmt = Statement::new(conn)?;
                history_stmt.prepare(&insert)?;
                history_stmt.bind_input_parameter(1, &version, Some("version"))?;
                history_stmt.bind_input_parameter(2, &SqlDynamicString::new(checksum.clone(), 65), Some("checksum"))?;
                let applied_at: NaiveDateTime = Utc::now().naive_utc();
                history_stmt.bind_input_parameter(3, &applied_at, Some("applied_at"))?;
                history_stmt.execute()?;
                Ok(())
            })?;
            newly_applied.push(version);
        }
        Ok(newly_applied)
    }

    /// Reverts one applied migration: runs its `Down` plan in a transaction,
    /// then deletes the history row.
    pub fn revert_single(&self, conn: &mut Connection, version: i64) -> Result<()> {
        let migration = self
            .migrations
            .iter()
            .find(|m| m.version() == version)
            .ok_or_else(|| Error::new(format!("no registered migration with version {version}"), Status::InvalidArguments))?;
        let dialect = conn.dialect_arc();
        let plan = migration.down(dialect.as_ref());
        let statements = plan.statements(dialect.as_ref());
        let title = migration.title().to_string();

        conn.transaction(|conn| {
            let mut stmt = Statement::new(conn)?;
            for (step, sql) in statements.iter().enumerate() {
                stmt.prepare(sql).and_then(|_| stmt.execute()).map_err(|source| {
                    Error::from(MigrationError { title: title.clone(), timestamp: version, step, statement: sql.clone(), source })
                })?;
            }
            let delete = format!(
                "DELETE FROM {} WHERE {} = ?",
                dialect.quote_identifier(HISTORY_TABLE),
                dialect.quote_identifier("version")
            );
            let mut delete_stmt = Statement::new(conn)?;
            delete_stmt.prepare(&delete)?;
            delete_stmt.bind_input_parameter(1, &version, Some("version"))?;
            delete_stmt.execute()?;
            Ok(())
        })
    }

    /// Recomputes every applied migration's checksum from its current
    /// source plan and reports the ones that changed. A stored-empty
    /// checksum is treated as legacy-ok and never reported.
    pub fn verify_checksums(&self, conn: &Connection) -> Result<Vec<ChecksumMismatch>> {
        let dialect = conn.dialect_arc();
        let sql = format!(
            "SELECT {}, {} FROM {}",
            dialect.quote_identifier("version"),
            dialect.quote_identifier("checksum"),
            dialect.quote_identifier(HISTORY_TABLE)
        );
        let mut stmt = Statement::new(conn)?;
        stmt.prepare(&sql)?;
        stmt.execute()?;
        let mut mismatches = Vec::new();
        while stmt.fetch_row()? {
            let version: i64 = stmt.get_column(1)?;
            let stored: Option<SqlDynamicString> = stmt.get_nullable_column(2)?;
            let Some(stored) = stored.map(|s| s.value) else { continue };
            if stored.is_empty() {
                continue;
            }
            if let Some(migration) = self.migrations.iter().find(|m| m.version() == version) {
                let plan = migration.up(dialect.as_ref());
                let computed = plan.checksum(dialect.as_ref());
                if computed != stored {
                    mismatches.push(ChecksumMismatch { version, stored, computed });
                }
            }
        }
        Ok(mismatches)
    }

    /// Renders every pending migration's `Up` statements without executing
    /// them, in application order.
    pub fn preview_pending(&self, conn: &Connection) -> Result<Vec<(i64, Vec<String>)>> {
        let applied = self.applied_versions(conn)?;
        let dialect = conn.dialect();
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.contains(&m.version()))
            .map(|m| (m.version(), m.up(dialect).statements(dialect)))
            .collect())
    }

    /// Renders one migration's `Down` statements without executing them.
    pub fn preview_down(&self, conn: &Connection, version: i64) -> Result<Vec<String>> {
        let migration = self
            .migrations
            .iter()
            .find(|m| m.version() == version)
            .ok_or_else(|| Error::new(format!("no registered migration with version {version}"), Status::InvalidArguments))?;
        let dialect = conn.dialect();
        Ok(migration.down(dialect).statements(dialect))
    }

    pub fn registered_versions(&self) -> Vec<i64> {
        self.migrations.iter().map(|m| m.version()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Backend;

    struct CreateUsers;
    impl Migration for CreateUsers {
        fn version(&self) -> i64 {
            20260101000000
        }
        fn title(&self) -> &str {
            "create_users"
        }
        fn up(&self, _dialect: &dyn Dialect) -> MigrationBuilder {
            let mut b = MigrationBuilder::new();
            b.create_table("users", vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true)]);
            b
        }
        fn down(&self, _dialect: &dyn Dialect) -> MigrationBuilder {
            let mut b = MigrationBuilder::new();
            b.drop_table("users", false);
            b
        }
    }

    struct CreatePosts;
    impl Migration for CreatePosts {
        fn version(&self) -> i64 {
            20260102000000
        }
        fn title(&self) -> &str {
            "create_posts"
        }
        fn up(&self, _dialect: &dyn Dialect) -> MigrationBuilder {
            let mut b = MigrationBuilder::new();
            b.create_table("posts", vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true)]);
            b
        }
        fn down(&self, _dialect: &dyn Dialect) -> MigrationBuilder {
            let mut b = MigrationBuilder::new();
            b.drop_table("posts", false);
            b
        }
    }

    struct TestDialect;
    impl Dialect for TestDialect {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }
        fn boolean_literal(&self, v: bool) -> &'static str {
            if v {
                "1"
            } else {
                "0"
            }
        }
        fn column_type_sql(&self, ty: ColumnType) -> String {
            match ty {
                ColumnType::Bigint => "INTEGER".into(),
                ColumnType::Char(n) => format!("CHAR({n})"),
                ColumnType::DateTime => "DATETIME".into(),
                _ => "TEXT".into(),
            }
        }
        fn apply_pagination(&self, select_core: &str, _p: crate::dialect::Pagination, _o: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, column: &str, _ty: ColumnType) -> String {
            format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote_identifier(column))
        }
        fn drop_table(&self, table: &str, _cascade: bool, _d: &[(String, String)]) -> Vec<String> {
            vec![format!("DROP TABLE {}", self.quote_identifier(table))]
        }
        fn last_insert_id_query(&self, _t: &str, _p: &str) -> String {
            "SELECT last_insert_rowid()".to_string()
        }
    }

    #[test]
    fn register_keeps_timestamp_order_regardless_of_insertion_order() {
        let mut manager = MigrationManager::new();
        manager.register(Box::new(CreatePosts)).unwrap();
        manager.register(Box::new(CreateUsers)).unwrap();
        assert_eq!(manager.registered_versions(), vec![20260101000000, 20260102000000]);
    }

    #[test]
    fn register_rejects_duplicate_timestamp() {
        let mut manager = MigrationManager::new();
        manager.register(Box::new(CreateUsers)).unwrap();
        assert!(manager.register(Box::new(CreateUsers)).is_err());
    }

    #[test]
    fn checksum_is_stable_across_identical_plans() {
        let dialect = TestDialect;
        let a = CreateUsers.up(&dialect).checksum(&dialect);
        let b = CreateUsers.up(&dialect).checksum(&dialect);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
