//! SQLite [`Dialect`]. SQLite has no `INFORMATION_SCHEMA`, so every catalog
//! query is rebuilt on top of its `pragma_*` table-valued functions instead
//! of the ANSI defaults.

use lwodbc_core::dialect::{Backend, ColumnType, Dialect, Pagination};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn column_type_sql(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::Bigint => "INTEGER".to_string(),
            ColumnType::Binary(_) | ColumnType::VarBinary(_) => "BLOB".to_string(),
            ColumnType::Bool => "INTEGER".to_string(),
            ColumnType::Char(n) => format!("CHARACTER({n})"),
            ColumnType::Date => "TEXT".to_string(),
            ColumnType::DateTime => "TEXT".to_string(),
            ColumnType::Decimal(_, _) => "TEXT".to_string(),
            ColumnType::Guid => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::NChar(n) => format!("NCHAR({n})"),
            ColumnType::NVarchar(0) => "TEXT".to_string(),
            ColumnType::NVarchar(n) => format!("NVARCHAR({n})"),
            ColumnType::Real => "REAL".to_string(),
            ColumnType::Smallint => "INTEGER".to_string(),
            ColumnType::Text(_) => "TEXT".to_string(),
            ColumnType::Time => "TEXT".to_string(),
            ColumnType::Timestamp => "TEXT".to_string(),
            ColumnType::Tinyint => "INTEGER".to_string(),
            ColumnType::Varchar(0) => "TEXT".to_string(),
            ColumnType::Varchar(n) => format!("VARCHAR({n})"),
        }
    }

    fn apply_pagination(&self, select_core: &str, pagination: Pagination, _order_by: &str) -> String {
        match pagination {
            Pagination::All => select_core.to_string(),
            Pagination::First(n) => format!("{select_core} LIMIT {n}"),
            Pagination::Range { offset, limit } => format!("{select_core} LIMIT {limit} OFFSET {offset}"),
        }
    }

    /// SQLite has no `IDENTITY`/`SERIAL`; a plain `INTEGER PRIMARY KEY`
    /// column is itself the `rowid` alias and auto-increments implicitly.
    fn primary_key_auto_increment(&self, column: &str, _ty: ColumnType) -> String {
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote_identifier(column))
    }

    /// SQLite's cascading behavior is controlled by the `PRAGMA foreign_keys`
    /// connection setting at DML time, not by DDL syntax, so `cascade` has no
    /// effect on the statement itself: SQLite cascade is a no-op here.
    fn drop_table(&self, table: &str, _cascade: bool, _dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
        vec![format!("DROP TABLE {}", self.quote_identifier(table))]
    }

    /// `last_insert_rowid()` is valid immediately after an INSERT on the same
    /// connection.
    fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
        "SELECT last_insert_rowid()".to_string()
    }

    fn information_schema_tables_query(&self) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'".to_string()
    }

    fn information_schema_columns_query(&self, table: &str) -> String {
        format!(
            "SELECT name, type, CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END \
             FROM pragma_table_info({}) ORDER BY cid",
            self.quote_string_literal(table)
        )
    }

    fn information_schema_primary_keys_query(&self, table: &str) -> String {
        format!(
            "SELECT name FROM pragma_table_info({}) WHERE pk > 0 ORDER BY pk",
            self.quote_string_literal(table)
        )
    }

    fn information_schema_foreign_keys_query(&self, table: &str) -> String {
        format!(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list({}) ORDER BY id, seq",
            self.quote_string_literal(table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_uses_limit_offset() {
        let d = SqliteDialect;
        let sql = d.apply_pagination("SELECT * FROM t", Pagination::Range { offset: 5, limit: 2 }, "");
        assert_eq!(sql, "SELECT * FROM t LIMIT 2 OFFSET 5");
    }

    #[test]
    fn auto_increment_uses_rowid_alias() {
        let d = SqliteDialect;
        assert_eq!(d.primary_key_auto_increment("id", ColumnType::Bigint), "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn cascade_flag_does_not_change_drop_statement() {
        let d = SqliteDialect;
        assert_eq!(d.drop_table("t", true, &[]), d.drop_table("t", false, &[]));
    }

    #[test]
    fn tables_query_reads_sqlite_master() {
        let d = SqliteDialect;
        assert!(d.information_schema_tables_query().contains("sqlite_master"));
    }

    #[test]
    fn columns_query_uses_pragma_table_info() {
        let d = SqliteDialect;
        assert!(d.information_schema_columns_query("users").contains("pragma_table_info('users')"));
    }

    #[test]
    fn numeric_binding_is_unreliable_on_sqlite() {
        assert!(!SqliteDialect.numeric_binding_is_reliable());
    }
}
