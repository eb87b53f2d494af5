//! SQL Server [`Dialect`], following the per-vendor driver crate layout under
//! `drivers/*` — here a dialect adapter takes the place of a full ADBC driver
//! since the ODBC call surface is already shared by `lwodbc-core`.

use lwodbc_core::dialect::{Backend, ColumnType, Dialect, Pagination};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn backend(&self) -> Backend {
        Backend::SqlServer
    }

    /// SQL Server's native quoting is `[brackets]`, not ANSI double quotes
    /// (both work under `QUOTED_IDENTIFIER ON`, but brackets are what its
    /// own tools emit).
    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
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
            ColumnType::Bigint => "BIGINT".to_string(),
            ColumnType::Binary(n) => format!("BINARY({n})"),
            ColumnType::Bool => "BIT".to_string(),
            ColumnType::Char(n) => format!("CHAR({n})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME2".to_string(),
            ColumnType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            ColumnType::Guid => "UNIQUEIDENTIFIER".to_string(),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::NChar(n) => format!("NCHAR({n})"),
            ColumnType::NVarchar(0) => "NVARCHAR(MAX)".to_string(),
            ColumnType::NVarchar(n) => format!("NVARCHAR({n})"),
            ColumnType::Real => "FLOAT".to_string(),
            ColumnType::Smallint => "SMALLINT".to_string(),
            ColumnType::Text(_) => "NVARCHAR(MAX)".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Timestamp => "DATETIME2".to_string(),
            ColumnType::Tinyint => "TINYINT".to_string(),
            ColumnType::VarBinary(0) => "VARBINARY(MAX)".to_string(),
            ColumnType::VarBinary(n) => format!("VARBINARY({n})"),
            ColumnType::Varchar(0) => "NVARCHAR(MAX)".to_string(),
            ColumnType::Varchar(n) => format!("NVARCHAR({n})"),
        }
    }

    /// SQL Server has no `LIMIT`. `First` renders as `TOP`, injected right
    /// after `SELECT` rather than appended; `Range` renders as
    /// `OFFSET ... FETCH NEXT`, which needs an `ORDER BY` to be valid and
    /// falls back to a no-op ordering when none is supplied.
    fn apply_pagination(&self, select_core: &str, pagination: Pagination, order_by: &str) -> String {
        match pagination {
            Pagination::All => select_core.to_string(),
            Pagination::First(n) => inject_top(select_core, n),
            Pagination::Range { offset, limit } => {
                let order = if order_by.is_empty() { "ORDER BY (SELECT NULL)" } else { order_by };
                format!("{select_core} {order} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
        }
    }

    fn primary_key_auto_increment(&self, column: &str, ty: ColumnType) -> String {
        format!("{} {} IDENTITY(1,1) PRIMARY KEY", self.quote_identifier(column), self.column_type_sql(ty))
    }

    /// SQL Server's `DROP TABLE ... CASCADE` does not exist; a cascading drop
    /// must first drop every foreign key referencing the table.
    fn drop_table(&self, table: &str, cascade: bool, dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
        let mut statements = Vec::new();
        if cascade {
            for (owning_table, constraint_name) in dropped_foreign_keys {
                statements.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.quote_identifier(owning_table),
                    self.quote_identifier(constraint_name)
                ));
            }
        }
        statements.push(format!("DROP TABLE {}", self.quote_identifier(table)));
        statements
    }

    fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
        "SELECT SCOPE_IDENTITY()".to_string()
    }

    /// SQL Server's ODBC driver has no `INFORMATION_SCHEMA`-free catalog, so
    /// the ANSI defaults apply as-is.
    fn information_schema_tables_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE'".to_string()
    }
}

fn inject_top(select_core: &str, n: u64) -> String {
    let trimmed = select_core.trim_start();
    if let Some(rest) = trimmed.strip_prefix("SELECT DISTINCT ") {
        format!("SELECT DISTINCT TOP {n} {rest}")
    } else if let Some(rest) = trimmed.strip_prefix("SELECT ") {
        format!("SELECT TOP {n} {rest}")
    } else {
        select_core.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_with_brackets() {
        let d = SqlServerDialect;
        assert_eq!(d.quote_identifier("users"), "[users]");
        assert_eq!(d.quote_identifier("weird]name"), "[weird]]name]");
    }

    #[test]
    fn first_pagination_injects_top_after_select() {
        let d = SqlServerDialect;
        let sql = d.apply_pagination("SELECT [id], [name] FROM [users]", Pagination::First(5), "");
        assert_eq!(sql, "SELECT TOP 5 [id], [name] FROM [users]");
    }

    #[test]
    fn range_pagination_uses_offset_fetch() {
        let d = SqlServerDialect;
        let sql = d.apply_pagination("SELECT [id] FROM [users]", Pagination::Range { offset: 10, limit: 5 }, "ORDER BY [id]");
        assert_eq!(sql, "SELECT [id] FROM [users] ORDER BY [id] OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY");
    }

    #[test]
    fn cascade_drop_expands_to_explicit_fk_drops() {
        let d = SqlServerDialect;
        let fks = vec![("orders".to_string(), "FK_orders_users".to_string())];
        let statements = d.drop_table("users", true, &fks);
        assert_eq!(statements, vec!["ALTER TABLE [orders] DROP CONSTRAINT [FK_orders_users]", "DROP TABLE [users]"]);
    }

    #[test]
    fn non_cascade_drop_is_single_statement() {
        let d = SqlServerDialect;
        assert_eq!(d.drop_table("users", false, &[]), vec!["DROP TABLE [users]"]);
    }

    #[test]
    fn identity_column_renders_auto_increment() {
        let d = SqlServerDialect;
        assert_eq!(d.primary_key_auto_increment("id", ColumnType::Bigint), "[id] BIGINT IDENTITY(1,1) PRIMARY KEY");
    }

    #[test]
    fn last_insert_id_uses_scope_identity() {
        let d = SqlServerDialect;
        assert_eq!(d.last_insert_id_query("users", "id"), "SELECT SCOPE_IDENTITY()");
    }

    #[test]
    fn numeric_binding_is_unreliable_on_sql_server() {
        assert!(!SqlServerDialect.numeric_binding_is_reliable());
    }

    #[test]
    fn requires_describe_param_for_null() {
        assert!(SqlServerDialect.requires_describe_param_for_null());
    }
}
