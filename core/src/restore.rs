//! Restore engine: reads chunked columnar batches and pushes
//! rows through a batch manager that owns one typed column buffer per target
//! column, flushing a single parameter-array INSERT on reaching capacity.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::backup::{BackupRow, BackupValue};
use crate::binder::numeric::SqlNumeric;
use crate::binder::time::bind_time_preserving_fraction;
use crate::binder::variant::SqlVariant;
use crate::binder::SqlDataBinder;
use crate::connection::Connection;
use crate::dialect::{Backend, ColumnType, Dialect};
use crate::error::{Error, Result, Status};
use crate::statement::Statement;

const MEMORY_BUDGET_BYTES: usize = 32 * 1024 * 1024;
const PARAMETER_LIMIT: usize = 25_000;
const TEXT_BINARY_TRUNCATION_CAP: usize = 64 * 1024;

/// One target column: its name and declared SQL type, used both to pick the
/// binding strategy and to render the INSERT's column list.
#[derive(Debug, Clone)]
pub struct RestoreColumn {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Caller-provided upper bound on rows per INSERT; the effective batch
    /// size is this clamped down by the memory and parameter-count limits.
    pub caller_capacity: usize,
    pub estimated_bytes_per_row: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self { caller_capacity: 1000, estimated_bytes_per_row: 256 }
    }
}

/// capacity = min(caller-provided, memory-budget / bytes-per-row,
/// parameter-limit / column-count), clamped to at least 1.
pub fn derive_capacity(options: &RestoreOptions, column_count: usize) -> usize {
    let by_memory = if options.estimated_bytes_per_row == 0 {
        options.caller_capacity
    } else {
        (MEMORY_BUDGET_BYTES / options.estimated_bytes_per_row).max(1)
    };
    let by_params = if column_count == 0 { options.caller_capacity } else { (PARAMETER_LIMIT / column_count).max(1) };
    options.caller_capacity.min(by_memory).min(by_params).max(1)
}

/// Converts one source value to the bindable form `column_type` expects, per
/// the per-category binding specialization table. Text/binary values longer
/// than [`TEXT_BINARY_TRUNCATION_CAP`] are truncated rather than rejected.
fn coerce(value: &BackupValue, column_type: ColumnType) -> Result<SqlVariant> {
    if matches!(value, BackupValue::Null) {
        return Ok(SqlVariant::Null(column_type));
    }
    Ok(match (value, column_type) {
        (BackupValue::Bool(b), _) => SqlVariant::Bool(*b),
        (BackupValue::Integer(n), ColumnType::Tinyint) => SqlVariant::Tinyint(*n as i8),
        (BackupValue::Integer(n), ColumnType::Smallint) => SqlVariant::Smallint(*n as i16),
        (BackupValue::Integer(n), ColumnType::Integer) => SqlVariant::Integer(*n as i32),
        (BackupValue::Integer(n), _) => SqlVariant::Bigint(*n),
        (BackupValue::Real(f), _) => SqlVariant::Double(*f),
        (BackupValue::Binary(bytes), _) => {
            let mut bytes = bytes.clone();
            bytes.truncate(TEXT_BINARY_TRUNCATION_CAP);
            SqlVariant::Binary(bytes)
        }
        (BackupValue::Text(s), ColumnType::Date) => {
            let mut s = s.clone();
            s.truncate(TEXT_BINARY_TRUNCATION_CAP);
            let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| Error::new(format!("invalid ISO-8601 date {s:?}: {e}"), Status::InvalidArguments))?;
            SqlVariant::Date(date)
        }
        (BackupValue::Text(s), ColumnType::DateTime | ColumnType::Timestamp) => {
            let mut s = s.clone();
            s.truncate(TEXT_BINARY_TRUNCATION_CAP);
            let dt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                .map_err(|e| Error::new(format!("invalid ISO-8601 datetime {s:?}: {e}"), Status::InvalidArguments))?;
            SqlVariant::DateTime(dt)
        }
        (BackupValue::Text(s), ColumnType::Time) => {
            let t = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|e| Error::new(format!("invalid time {s:?}: {e}"), Status::InvalidArguments))?;
            SqlVariant::Time(t)
        }
        (BackupValue::Text(s), ColumnType::Decimal(precision, scale)) => {
            let decimal = Decimal::from_str(s).map_err(|e| Error::new(format!("invalid decimal {s:?}: {e}"), Status::InvalidArguments))?;
            SqlVariant::Decimal(SqlNumeric::new(precision, scale, decimal)?)
        }
        (BackupValue::Text(s), ColumnType::Guid) => SqlVariant::Guid(crate::binder::guid::SqlGuid::parse(s)?),
        (BackupValue::Text(s), _) => {
            let mut s = s.clone();
            s.truncate(TEXT_BINARY_TRUNCATION_CAP);
            SqlVariant::from(s.as_str())
        }
        (BackupValue::Null, _) => unreachable!("handled above"),
    })
}

/// Binds `value` at `index`, routing Time columns through the
/// fraction-preserving path instead of `SqlVariant`'s plain struct bind:
/// for Time on SQL Server via `SS_TIME2`, for Time on
/// PostgreSQL/SQL Server/SQLite it binds as string").
fn bind_value(stmt: &mut Statement, dialect: &dyn Dialect, index: u16, value: &SqlVariant) -> Result<()> {
    if let SqlVariant::Time(t) = value {
        let t = *t;
        return stmt.bind_with(|raw, queue| match dialect.backend() {
            Backend::SqlServer | Backend::PostgreSql => bind_time_preserving_fraction(dialect, raw, index, t, queue),
            Backend::Sqlite => {
                let text = t.format("%H:%M:%S%.f").to_string();
                crate::binder::dynamic_string::bind_ansi_str(raw, index, &text, queue)
            }
            Backend::MySql => <NaiveTime as SqlDataBinder>::bind_input_parameter(raw, index, &t, queue),
        });
    }
    stmt.bind_variant_input_parameter(index, value, None)
}

/// A batch of already-coerced rows awaiting a single parameter-array INSERT.
pub struct RestoreBatchManager<'a> {
    conn: &'a mut Connection,
    table: String,
    columns: Vec<RestoreColumn>,
    capacity: usize,
    pending: Vec<Vec<SqlVariant>>,
    rows_restored: u64,
}

impl<'a> RestoreBatchManager<'a> {
    pub fn new(conn: &'a mut Connection, table: impl Into<String>, columns: Vec<RestoreColumn>, options: RestoreOptions) -> Self {
        let capacity = derive_capacity(&options, columns.len().max(1));
        Self { conn, table: table.into(), columns, capacity, pending: Vec::new(), rows_restored: 0 }
    }

    pub fn rows_restored(&self) -> u64 {
        self.rows_restored
    }

    /// Decodes one backed-up row into this batch's column types and queues
    /// it; flushes automatically on reaching capacity.
    pub fn push(&mut self, row: &BackupRow) -> Result<()> {
        if row.0.len() != self.columns.len() {
            return Err(Error::new(
                format!("row has {} values, table {} has {} target columns", row.0.len(), self.table, self.columns.len()),
                Status::InvalidArguments,
            ));
        }
        let mut coerced = Vec::with_capacity(self.columns.len());
        for (value, column) in row.0.iter().zip(&self.columns) {
            coerced.push(coerce(value, column.column_type)?);
        }
        self.pending.push(coerced);
        if self.pending.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Executes the pending rows as one multi-row `INSERT ... VALUES (?, ?), (?, ?), ...`
    /// and clears the buffer.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let dialect = self.conn.dialect_arc();
        let column_list = self.columns.iter().map(|c| dialect.quote_identifier(&c.name)).collect::<Vec<_>>().join(", ");
        let row_placeholder = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values_clause = vec![row_placeholder; self.pending.len()].join(", ");
        let sql = format!("INSERT INTO {} ({column_list}) VALUES {values_clause}", dialect.quote_identifier(&self.table));

        let mut stmt = Statement::new(&*self.conn)?;
        stmt.prepare(&sql)?;
        let mut index = 1u16;
        for row in &self.pending {
            for value in row {
                bind_value(&mut stmt, dialect.as_ref(), index, value)?;
                index += 1;
            }
        }
        stmt.execute()?;
        self.rows_restored += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }
}

impl<'a> Drop for RestoreBatchManager<'a> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_respects_memory_budget() {
        let options = RestoreOptions { caller_capacity: 1_000_000, estimated_bytes_per_row: 1024 };
        let capacity = derive_capacity(&options, 4);
        assert_eq!(capacity, (MEMORY_BUDGET_BYTES / 1024).min(PARAMETER_LIMIT / 4));
    }

    #[test]
    fn capacity_respects_parameter_limit() {
        let options = RestoreOptions { caller_capacity: 1_000_000, estimated_bytes_per_row: 1 };
        let capacity = derive_capacity(&options, 30_000);
        assert_eq!(capacity, PARAMETER_LIMIT / 30_000);
    }

    #[test]
    fn capacity_never_drops_below_one() {
        let options = RestoreOptions { caller_capacity: 1, estimated_bytes_per_row: 1 };
        assert_eq!(derive_capacity(&options, 1_000_000), 1);
    }

    #[test]
    fn coerces_integer_category_to_declared_width() {
        let v = coerce(&BackupValue::Integer(7), ColumnType::Smallint).unwrap();
        assert_eq!(v, SqlVariant::Smallint(7));
    }

    #[test]
    fn coerces_iso8601_date_text() {
        let v = coerce(&BackupValue::Text("2024-03-05".to_string()), ColumnType::Date).unwrap();
        assert_eq!(v, SqlVariant::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
    }

    #[test]
    fn coerces_decimal_text_preserving_scale() {
        let v = coerce(&BackupValue::Text("1.2345678901".to_string()), ColumnType::Decimal(38, 10)).unwrap();
        match v {
            SqlVariant::Decimal(n) => assert_eq!(n.to_string_exact(), "1.2345678901"),
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn null_value_becomes_typed_null() {
        let v = coerce(&BackupValue::Null, ColumnType::Integer).unwrap();
        assert_eq!(v, SqlVariant::Null(ColumnType::Integer));
    }
}
