//! In-memory mock ODBC backend, gated behind `#[cfg(any(test, feature =
//! "mock"))]` so tests that would otherwise need a real driver manager can
//! run without one.
//!
//! `handle::RawStatement` wraps `odbc-sys` concretely rather than through a
//! trait object — this crate works against a closed set of ODBC primitives,
//! not a pluggable driver interface — so this mock cannot stand in for it directly.
//! Instead it reimplements the same lifecycle rules — prepare closes a live
//! cursor, rows are produced in insertion order, fetch is exhausted once —
//! against an in-memory table, so statement-lifecycle and cursor-state logic
//! can be unit tested without a driver installed. [`crate::statement::Statement`]
//! itself is exercised indirectly through these rules, not by substitution.

use std::collections::HashMap;

use crate::binder::variant::SqlVariant;
use crate::error::{Error, Result, Status};

/// One in-memory table: an ordered column list and the rows inserted so far.
#[derive(Debug, Clone, Default)]
pub struct MockTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlVariant>>,
}

impl MockTable {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn insert(&mut self, row: Vec<SqlVariant>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::new(
                format!("row has {} values, table has {} columns", row.len(), self.columns.len()),
                Status::InvalidArguments,
            ));
        }
        self.rows.push(row);
        Ok(())
    }
}

/// A named collection of [`MockTable`]s, standing in for a connected database.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    tables: HashMap<String, MockTable>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: impl Into<String>, table: MockTable) {
        self.tables.insert(name.into(), table);
    }

    pub fn table(&self, name: &str) -> Option<&MockTable> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut MockTable> {
        self.tables.get_mut(name)
    }
}

/// A mock statement's lifecycle, mirroring [`crate::statement::Statement`]'s
/// invariants: `prepare` implicitly closes any live cursor,
/// `fetch_row` advances strictly forward and returns `false` once exhausted.
pub struct MockStatement {
    table_name: Option<String>,
    rows: Vec<Vec<SqlVariant>>,
    cursor: Option<usize>,
    current_row: Option<Vec<SqlVariant>>,
}

impl MockStatement {
    pub fn new() -> Self {
        Self { table_name: None, rows: Vec::new(), cursor: None, current_row: None }
    }

    /// Closes any live cursor and "prepares" a scan of `table` (the mock only
    /// supports `SELECT * FROM <table>`, enough to exercise lifecycle rules).
    pub fn prepare_select_all(&mut self, db: &MockDatabase, table: &str) -> Result<()> {
        self.close_cursor();
        let table = db.table(table).ok_or_else(|| Error::new(format!("no such mock table: {table}"), Status::NotFound))?;
        self.table_name = Some(table.columns.join(","));
        self.rows = table.rows.clone();
        Ok(())
    }

    pub fn execute(&mut self) -> Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn close_cursor(&mut self) {
        self.cursor = None;
        self.current_row = None;
    }

    /// Advances the cursor one row; `false` once exhausted, matching
    /// `RawStatement::fetch`'s `SQL_NO_DATA` contract.
    pub fn fetch_row(&mut self) -> Result<bool> {
        let Some(cursor) = self.cursor else {
            return Err(Error::new("fetch called with no open cursor", Status::SequenceError));
        };
        if cursor >= self.rows.len() {
            self.current_row = None;
            return Ok(false);
        }
        self.current_row = Some(self.rows[cursor].clone());
        self.cursor = Some(cursor + 1);
        Ok(true)
    }

    pub fn get_column(&self, index: u16) -> Result<&SqlVariant> {
        self.current_row
            .as_ref()
            .and_then(|row| row.get(index as usize - 1))
            .ok_or_else(|| Error::new(format!("no value bound at column {index}"), Status::InvalidArguments))
    }

    pub fn row_count(&self) -> i64 {
        self.rows.len() as i64
    }
}

impl Default for MockStatement {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> MockDatabase {
        let mut db = MockDatabase::new();
        let mut table = MockTable::new(["id", "name"]);
        table.insert(vec![SqlVariant::Integer(1), SqlVariant::from("ada")]).unwrap();
        table.insert(vec![SqlVariant::Integer(2), SqlVariant::from("grace")]).unwrap();
        db.create_table("users", table);
        db
    }

    #[test]
    fn fetch_returns_rows_in_insertion_order_then_false() {
        let db = sample_db();
        let mut stmt = MockStatement::new();
        stmt.prepare_select_all(&db, "users").unwrap();
        stmt.execute().unwrap();

        assert!(stmt.fetch_row().unwrap());
        assert_eq!(*stmt.get_column(1).unwrap(), SqlVariant::Integer(1));
        assert!(stmt.fetch_row().unwrap());
        assert_eq!(*stmt.get_column(1).unwrap(), SqlVariant::Integer(2));
        assert!(!stmt.fetch_row().unwrap());
    }

    #[test]
    fn prepare_closes_a_live_cursor() {
        let db = sample_db();
        let mut stmt = MockStatement::new();
        stmt.prepare_select_all(&db, "users").unwrap();
        stmt.execute().unwrap();
        stmt.fetch_row().unwrap();
        assert!(stmt.has_cursor());

        stmt.prepare_select_all(&db, "users").unwrap();
        assert!(!stmt.has_cursor());
    }

    #[test]
    fn fetch_without_execute_is_a_sequence_error() {
        let db = sample_db();
        let mut stmt = MockStatement::new();
        stmt.prepare_select_all(&db, "users").unwrap();
        let err = stmt.fetch_row().unwrap_err();
        assert_eq!(err.status, Status::SequenceError);
    }

    #[test]
    fn insert_rejects_mismatched_column_count() {
        let mut table = MockTable::new(["a", "b"]);
        let err = table.insert(vec![SqlVariant::Integer(1)]).unwrap_err();
        assert_eq!(err.status, Status::InvalidArguments);
    }

    #[test]
    fn row_count_reflects_table_size() {
        let db = sample_db();
        let mut stmt = MockStatement::new();
        stmt.prepare_select_all(&db, "users").unwrap();
        assert_eq!(stmt.row_count(), 2);
    }
}
