//! MySQL [`Dialect`]. The per-backend table singles out SQL Server,
//! PostgreSQL, and SQLite, but MySQL is one of the four supported backends
//! overall, so it gets the same dialect treatment — grounded the same way
//! [`lwodbc_core::migration_lock`] added a MySQL advisory-lock path beside
//! the other three.

use lwodbc_core::dialect::{Backend, ColumnType, Dialect, Pagination};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
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
            ColumnType::Bool => "TINYINT(1)".to_string(),
            ColumnType::Char(n) => format!("CHAR({n})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME(6)".to_string(),
            ColumnType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            ColumnType::Guid => "CHAR(36)".to_string(),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::NChar(n) => format!("NCHAR({n})"),
            ColumnType::NVarchar(0) => "TEXT".to_string(),
            ColumnType::NVarchar(n) => format!("NVARCHAR({n})"),
            ColumnType::Real => "DOUBLE".to_string(),
            ColumnType::Smallint => "SMALLINT".to_string(),
            ColumnType::Text(_) => "TEXT".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Tinyint => "TINYINT".to_string(),
            ColumnType::VarBinary(0) => "BLOB".to_string(),
            ColumnType::VarBinary(n) => format!("VARBINARY({n})"),
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

    fn primary_key_auto_increment(&self, column: &str, ty: ColumnType) -> String {
        format!("{} {} AUTO_INCREMENT PRIMARY KEY", self.quote_identifier(column), self.column_type_sql(ty))
    }

    /// MySQL's `DROP TABLE` has no `CASCADE` keyword; a cascading drop must
    /// disable foreign-key checks for the statement instead, then restore
    /// them.
    fn drop_table(&self, table: &str, cascade: bool, _dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
        if cascade {
            vec![
                "SET FOREIGN_KEY_CHECKS = 0".to_string(),
                format!("DROP TABLE {}", self.quote_identifier(table)),
                "SET FOREIGN_KEY_CHECKS = 1".to_string(),
            ]
        } else {
            vec![format!("DROP TABLE {}", self.quote_identifier(table))]
        }
    }

    fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
        "SELECT LAST_INSERT_ID()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_with_backticks() {
        let d = MySqlDialect;
        assert_eq!(d.quote_identifier("users"), "`users`");
        assert_eq!(d.quote_identifier("weird`name"), "`weird``name`");
    }

    #[test]
    fn auto_increment_column_renders_clause() {
        let d = MySqlDialect;
        assert_eq!(d.primary_key_auto_increment("id", ColumnType::Bigint), "`id` BIGINT AUTO_INCREMENT PRIMARY KEY");
    }

    #[test]
    fn cascade_drop_toggles_foreign_key_checks() {
        let d = MySqlDialect;
        assert_eq!(
            d.drop_table("users", true, &[]),
            vec!["SET FOREIGN_KEY_CHECKS = 0", "DROP TABLE `users`", "SET FOREIGN_KEY_CHECKS = 1"]
        );
    }

    #[test]
    fn non_cascade_drop_is_single_statement() {
        let d = MySqlDialect;
        assert_eq!(d.drop_table("users", false, &[]), vec!["DROP TABLE `users`"]);
    }

    #[test]
    fn numeric_binding_is_reliable_on_mysql() {
        assert!(MySqlDialect.numeric_binding_is_reliable());
    }

    #[test]
    fn range_pagination_uses_limit_offset() {
        let d = MySqlDialect;
        let sql = d.apply_pagination("SELECT * FROM t", Pagination::Range { offset: 3, limit: 7 }, "");
        assert_eq!(sql, "SELECT * FROM t LIMIT 7 OFFSET 3");
    }
}
