//! Schema introspection: `SQLTables`/`SQLColumns`/`SQLPrimaryKeys`/
//! `SQLForeignKeys` wrapped as safe Rust, backing both the backup
//! engine's table enumeration and the mapper's CREATE TABLE synthesis.

use crate::connection::Connection;
use crate::error::Result;
use crate::handle::RawStatement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub table_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal_position: i32,
    pub sql_type_name: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyInfo {
    pub column_name: String,
    pub key_sequence: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub fk_column_name: String,
    pub pk_table_name: String,
    pub pk_column_name: String,
}

/// Lists user tables visible to `conn`. Portable catalog query per dialect
/// standing in for a native `SQLTables` call; `drivers/*` crates may instead issue
/// the native `SQLTables` call where a backend's driver supports it well —
/// both routes feed the same [`TableInfo`] shape.
pub fn list_tables(conn: &Connection) -> Result<Vec<TableInfo>> {
    let sql = conn.dialect().information_schema_tables_query();
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    let mut out = Vec::new();
    while stmt.fetch()? {
        let name = read_string_column(&mut stmt, 1)?;
        out.push(TableInfo { catalog: None, schema: None, name, table_type: "TABLE".to_string() });
    }
    Ok(out)
}

/// Lists columns for `table` in declared-order (`SQLColumns`).
pub fn list_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = conn.dialect().information_schema_columns_query(table);
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    let mut out = Vec::new();
    let mut ordinal = 1;
    while stmt.fetch()? {
        let name = read_string_column(&mut stmt, 1)?;
        let sql_type_name = read_string_column(&mut stmt, 2)?;
        let nullable = read_string_column(&mut stmt, 3).map(|s| s.eq_ignore_ascii_case("YES")).unwrap_or(true);
        out.push(ColumnInfo { name, ordinal_position: ordinal, sql_type_name, nullable });
        ordinal += 1;
    }
    Ok(out)
}

/// Lists primary-key columns for `table`, ordered by key sequence
/// (`SQLPrimaryKeys`).
pub fn list_primary_keys(conn: &Connection, table: &str) -> Result<Vec<PrimaryKeyInfo>> {
    let sql = conn.dialect().information_schema_primary_keys_query(table);
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    let mut out = Vec::new();
    let mut seq = 1;
    while stmt.fetch()? {
        let column_name = read_string_column(&mut stmt, 1)?;
        out.push(PrimaryKeyInfo { column_name, key_sequence: seq });
        seq += 1;
    }
    Ok(out)
}

/// Lists foreign keys declared on `table` (`SQLForeignKeys`).
pub fn list_foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyInfo>> {
    let sql = conn.dialect().information_schema_foreign_keys_query(table);
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    let mut out = Vec::new();
    while stmt.fetch()? {
        let fk_column_name = read_string_column(&mut stmt, 1)?;
        let pk_table_name = read_string_column(&mut stmt, 2)?;
        let pk_column_name = read_string_column(&mut stmt, 3)?;
        out.push(ForeignKeyInfo { fk_column_name, pk_table_name, pk_column_name });
    }
    Ok(out)
}

fn read_string_column(stmt: &mut RawStatement, index: u16) -> Result<String> {
    use crate::binder::dynamic_string::SqlDynamicString;
    use crate::binder::{CallbackQueue, SqlDataBinder};
    let mut queue = CallbackQueue::new();
    let value = <SqlDynamicString as SqlDataBinder>::get_column(stmt, index, &mut queue).unwrap_or_else(|_| SqlDynamicString::new("", 0));
    Ok(value.value)
}
