//! PostgreSQL [`Dialect`]. PostgreSQL needs the least deviation from the
//! ANSI defaults [`Dialect`]'s default methods already express — it only
//! overrides what actually differs: `BIGSERIAL`, `LIMIT/OFFSET`, `CASCADE`,
//! `RETURNING`.

use lwodbc_core::dialect::{Backend, ColumnType, Dialect, Pagination};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSqlDialect;

impl Dialect for PostgreSqlDialect {
    fn backend(&self) -> Backend {
        Backend::PostgreSql
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn column_type_sql(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::Bigint => "BIGINT".to_string(),
            ColumnType::Binary(_) => "BYTEA".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Char(n) => format!("CHAR({n})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "TIMESTAMP".to_string(),
            ColumnType::Decimal(p, s) => format!("NUMERIC({p},{s})"),
            ColumnType::Guid => "UUID".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::NChar(n) => format!("CHAR({n})"),
            ColumnType::NVarchar(0) => "TEXT".to_string(),
            ColumnType::NVarchar(n) => format!("VARCHAR({n})"),
            ColumnType::Real => "DOUBLE PRECISION".to_string(),
            ColumnType::Smallint => "SMALLINT".to_string(),
            ColumnType::Text(_) => "TEXT".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Tinyint => "SMALLINT".to_string(),
            ColumnType::VarBinary(_) => "BYTEA".to_string(),
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
        let native = match ty {
            ColumnType::Integer | ColumnType::Smallint => "SERIAL",
            _ => "BIGSERIAL",
        };
        format!("{} {} PRIMARY KEY", self.quote_identifier(column), native)
    }

    /// PostgreSQL's `CASCADE` is a single clause, unlike SQL Server's
    /// explicit FK drops: PostgreSQL just appends `CASCADE`.
    fn drop_table(&self, table: &str, cascade: bool, _dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
        let suffix = if cascade { " CASCADE" } else { "" };
        vec![format!("DROP TABLE {}{suffix}", self.quote_identifier(table))]
    }

    /// PostgreSQL has no session-scoped "last identity" function; the
    /// portable way is `RETURNING` on the INSERT itself, but the mapper's
    /// query-then-fetch shape expects a follow-up SELECT, so this falls back
    /// to `lastval()`, valid only immediately after an
    /// INSERT on the same connection and sequence.
    fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
        "SELECT lastval()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_with_double_quotes() {
        let d = PostgreSqlDialect;
        assert_eq!(d.quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn first_pagination_appends_limit() {
        let d = PostgreSqlDialect;
        assert_eq!(d.apply_pagination("SELECT * FROM users", Pagination::First(10), ""), "SELECT * FROM users LIMIT 10");
    }

    #[test]
    fn range_pagination_appends_limit_and_offset() {
        let d = PostgreSqlDialect;
        let sql = d.apply_pagination("SELECT * FROM users", Pagination::Range { offset: 20, limit: 10 }, "");
        assert_eq!(sql, "SELECT * FROM users LIMIT 10 OFFSET 20");
    }

    #[test]
    fn bigint_primary_key_uses_bigserial() {
        let d = PostgreSqlDialect;
        assert_eq!(d.primary_key_auto_increment("id", ColumnType::Bigint), "\"id\" BIGSERIAL PRIMARY KEY");
    }

    #[test]
    fn integer_primary_key_uses_serial() {
        let d = PostgreSqlDialect;
        assert_eq!(d.primary_key_auto_increment("id", ColumnType::Integer), "\"id\" SERIAL PRIMARY KEY");
    }

    #[test]
    fn cascade_drop_appends_cascade_clause() {
        let d = PostgreSqlDialect;
        assert_eq!(d.drop_table("users", true, &[]), vec!["DROP TABLE \"users\" CASCADE"]);
    }

    #[test]
    fn numeric_binding_is_reliable_on_postgresql() {
        assert!(PostgreSqlDialect.numeric_binding_is_reliable());
    }
}
