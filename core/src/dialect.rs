//! Dialect-aware formatting: column type declaration and the other
//! per-backend rendering rules a `Dialect` impl customizes.
//!
//! Concrete backends live in the sibling `drivers/*` crates and implement
//! [`Dialect`]; this module only defines the shared vocabulary, the way the
//! teacher's `core` crate defines the `Driver`/`Database`/`Connection`/
//! `Statement` traits that concrete driver crates implement.

use std::fmt::Write as _;

/// The backend a [`Connection`][crate::connection::Connection] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    SqlServer,
    PostgreSql,
    Sqlite,
    MySql,
}

/// Declared SQL column type, a closed tagged sum. `size == 0` means
/// dialect-specific MAX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bigint,
    Binary(usize),
    Bool,
    Char(usize),
    Date,
    DateTime,
    Decimal(u8, u8),
    Guid,
    Integer,
    NChar(usize),
    NVarchar(usize),
    Real,
    Smallint,
    Text(usize),
    Time,
    Timestamp,
    Tinyint,
    VarBinary(usize),
    Varchar(usize),
}

/// How to render a `LIMIT`/pagination clause.
#[derive(Debug, Clone, Copy)]
pub enum Pagination {
    All,
    First(u64),
    Range { offset: u64, limit: u64 },
}

/// Per-backend SQL rendering rules (the "dialect-sensitive
/// operations"). One implementation per backend crate under `drivers/`.
pub trait Dialect: Send + Sync {
    fn backend(&self) -> Backend;

    /// Quotes an identifier (table, column, alias).
    fn quote_identifier(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        out.push('"');
        for ch in name.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
        out
    }

    /// Renders a qualified column reference `"table"."column"`.
    fn qualified_column(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote_identifier(table), self.quote_identifier(column))
    }

    /// Single-quotes a string literal, doubling embedded quotes.
    fn quote_string_literal(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            if ch == '\'' {
                out.push('\'');
            }
            out.push(ch);
        }
        out.push('\'');
        out
    }

    fn boolean_literal(&self, value: bool) -> &'static str;

    /// Renders the given declared column type as this dialect's SQL type name.
    fn column_type_sql(&self, ty: ColumnType) -> String;

    /// Renders `SELECT` pagination (`TOP`, `LIMIT`, `OFFSET ... FETCH`, ...).
    /// `select_core` is the already-rendered `SELECT ... FROM ... WHERE ...`
    /// text (without trailing pagination); some dialects (SQL Server `TOP`)
    /// must inject their clause earlier than the end, so this takes the
    /// whole core rather than returning a suffix.
    fn apply_pagination(&self, select_core: &str, pagination: Pagination, order_by: &str) -> String;

    /// The statement(s) needed to fetch `COUNT(*)` given a `FROM ... WHERE ...` suffix.
    fn count_query(&self, from_and_where: &str) -> String {
        format!("SELECT COUNT(*) {from_and_where}")
    }

    /// Primary-key column declaration with an auto-incrementing identity.
    fn primary_key_auto_increment(&self, column: &str, ty: ColumnType) -> String;

    /// A plain (non-auto-increment) primary key column declaration.
    fn primary_key(&self, column: &str, ty: ColumnType) -> String {
        format!("{} {} PRIMARY KEY", self.quote_identifier(column), self.column_type_sql(ty))
    }

    /// A NOT NULL column declaration.
    fn required_column(&self, column: &str, ty: ColumnType) -> String {
        format!("{} {} NOT NULL", self.quote_identifier(column), self.column_type_sql(ty))
    }

    /// A nullable column declaration.
    fn column(&self, column: &str, ty: ColumnType) -> String {
        format!("{} {}", self.quote_identifier(column), self.column_type_sql(ty))
    }

    /// A foreign key constraint clause appended to a CREATE TABLE body.
    fn foreign_key(&self, column: &str, ref_table: &str, ref_column: &str) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(column),
            self.quote_identifier(ref_table),
            self.quote_identifier(ref_column)
        )
    }

    /// Renders `DROP TABLE`, expanding cascade semantics per backend:
    /// SQL Server expands to explicit FK drops, PostgreSQL appends
    /// `CASCADE`, SQLite cascade is a no-op.
    fn drop_table(&self, table: &str, cascade: bool, dropped_foreign_keys: &[(String, String)]) -> Vec<String>;

    /// The query used to retrieve the id assigned to the last INSERT for a
    /// server-side auto-increment primary key.
    fn last_insert_id_query(&self, table: &str, pk_column: &str) -> String;

    /// Whether this backend's native SQL_NUMERIC binding is trustworthy.
    /// SQLite and SQL Server are not — bind the float shadow instead.
    fn numeric_binding_is_reliable(&self) -> bool {
        matches!(self.backend(), Backend::PostgreSql | Backend::MySql)
    }

    /// SQL bind type to use for a typed NULL when the column type is not
    /// separately known. SQL Server must `DescribeParam` first.
    fn requires_describe_param_for_null(&self) -> bool {
        matches!(self.backend(), Backend::SqlServer)
    }

    /// Catalog query returning one column (table name) per user table,
    /// standing in for a native `SQLTables` call. The ANSI
    /// `INFORMATION_SCHEMA.TABLES` default
    /// covers SQL Server/PostgreSQL/MySQL; SQLite has no
    /// `INFORMATION_SCHEMA` and overrides with `sqlite_master`.
    fn information_schema_tables_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE'".to_string()
    }

    /// Catalog query returning (column_name, data_type, is_nullable) for
    /// `table`, in ordinal position order, standing in for `SQLColumns`.
    fn information_schema_columns_query(&self, table: &str) -> String {
        format!(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = {} ORDER BY ordinal_position",
            self.quote_string_literal(table)
        )
    }

    /// Catalog query returning primary-key column names for `table`, in key
    /// sequence order, standing in for `SQLPrimaryKeys`.
    fn information_schema_primary_keys_query(&self, table: &str) -> String {
        format!(
            "SELECT kcu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu ON kcu.constraint_name = tc.constraint_name \
             WHERE tc.table_name = {} AND tc.constraint_type = 'PRIMARY KEY' ORDER BY kcu.ordinal_position",
            self.quote_string_literal(table)
        )
    }

    /// Catalog query returning (fk_column, referenced_table, referenced_column)
    /// for foreign keys declared on `table`, standing in for `SQLForeignKeys`.
    fn information_schema_foreign_keys_query(&self, table: &str) -> String {
        format!(
            "SELECT kcu.column_name, ccu.table_name, ccu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu ON kcu.constraint_name = tc.constraint_name \
             JOIN information_schema.constraint_column_usage ccu ON ccu.constraint_name = tc.constraint_name \
             WHERE tc.table_name = {} AND tc.constraint_type = 'FOREIGN KEY'",
            self.quote_string_literal(table)
        )
    }
}

/// Renders an `ORDER BY` clause from column names, used both by the query
/// builder and by the backup engine's stable-ordering requirement.
pub fn render_order_by(dialect: &dyn Dialect, table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let mut out = String::from("ORDER BY ");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", dialect.qualified_column(table, col));
    }
    out
}
