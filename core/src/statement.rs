//! Statement lifecycle: prepare, bind, execute, fetch.
//!
//! Wraps [`RawStatement`] with the two callback queues binders register
//! against, an indicator vector sized lazily on first bind, and cursor-state
//! bookkeeping so `Prepare` can implicitly close a live cursor the way the
//! lifecycle invariant requires.

use std::sync::Arc;

use crate::binder::variant::{self, SqlVariant};
use crate::binder::{CallbackQueue, OutputCell, SqlDataBinder};
use crate::connection::Connection;
use crate::dialect::{ColumnType, Dialect};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;
use crate::logger::{logger, LogEvent};

/// A prepared statement plus its live cursor state.
pub struct Statement {
    raw: RawStatement,
    dialect: Arc<dyn Dialect>,
    queue: CallbackQueue,
    /// Indicator storage, length `parameter-count + 1`, allocated
    /// on first bind.
    indicators: Vec<isize>,
    expected_params: Option<i16>,
    bound_params: u16,
    has_cursor: bool,
}

impl Statement {
    pub fn new(conn: &Connection) -> Result<Self> {
        let raw = RawStatement::allocate(conn.raw())?;
        Ok(Self {
            raw,
            dialect: conn.dialect_arc(),
            queue: CallbackQueue::new(),
            indicators: Vec::new(),
            expected_params: None,
            bound_params: 0,
            has_cursor: false,
        })
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Closes any live cursor, clears both callback queues, prepares `text`,
    /// and pre-sizes the indicator vector from the driver's reported
    /// parameter count.
    pub fn prepare(&mut self, text: &str) -> Result<()> {
        if self.has_cursor {
            self.raw.close_cursor()?;
            self.has_cursor = false;
        }
        self.queue.clear();
        self.raw.prepare(text)?;
        let n = self.raw.num_params()?;
        self.expected_params = Some(n);
        self.bound_params = 0;
        self.indicators = vec![0isize; n as usize + 1];
        Ok(())
    }

    /// Binds `value` at 1-based `index`, logging a bind event carrying
    /// `hint` and the binder's inspected rendering.
    pub fn bind_input_parameter<T: SqlDataBinder>(&mut self, index: u16, value: &T, hint: Option<&str>) -> Result<()> {
        T::bind_input_parameter(&mut self.raw, index, value, &mut self.queue)?;
        self.bound_params += 1;
        logger().log(LogEvent::Bind { index: index as usize, hint: hint.map(str::to_string), inspected: T::inspect(value) });
        Ok(())
    }

    /// Binds a runtime-typed [`SqlVariant`] at 1-based `index`, dispatching
    /// `Decimal` through the dialect-aware structured/`f64`-shadow choice —
    /// the mapper's entry point for field-metadata-driven binds, since the
    /// plain generic [`Self::bind_input_parameter`] has no dialect to
    /// consult when `T` is `SqlVariant`.
    pub fn bind_variant_input_parameter(&mut self, index: u16, value: &SqlVariant, hint: Option<&str>) -> Result<()> {
        variant::bind_input_parameter_dialect_aware(&mut self.raw, self.dialect.as_ref(), index, value, &mut self.queue)?;
        self.bound_params += 1;
        logger().log(LogEvent::Bind { index: index as usize, hint: hint.map(str::to_string), inspected: SqlVariant::inspect(value) });
        Ok(())
    }

    /// Escape hatch for binders that need both the raw handle and the
    /// callback queue at once but aren't expressed as a plain [`SqlDataBinder`]
    /// impl — e.g. [`crate::binder::time::bind_time_preserving_fraction`],
    /// whose dialect-dependent choice of wire format lives outside the trait.
    /// Counts as one bound input parameter, same as [`Self::bind_input_parameter`].
    pub(crate) fn bind_with(&mut self, f: impl FnOnce(&mut RawStatement, &mut CallbackQueue) -> Result<()>) -> Result<()> {
        f(&mut self.raw, &mut self.queue)?;
        self.bound_params += 1;
        Ok(())
    }

    /// Pre-binds `cell` as the destination for column `index` across
    /// subsequent fetches.
    pub fn bind_output_column<T: SqlDataBinder + Default>(&mut self, cell: OutputCell<T>, index: u16) -> Result<()> {
        T::bind_output_column(cell, &mut self.raw, index, &mut self.queue)
    }

    /// Pre-binds `cells` in order, column `i` to `cells[i - 1]` (1-based).
    pub fn bind_output_columns<T: SqlDataBinder + Default>(&mut self, cells: &[OutputCell<T>]) -> Result<()> {
        for (i, cell) in cells.iter().enumerate() {
            self.bind_output_column(cell.clone(), (i + 1) as u16)?;
        }
        Ok(())
    }

    /// Executes with no parameters (`args` already bound via
    /// `bind_input_parameter`, or the statement expects none). The number of
    /// parameters actually bound since the last `Prepare`/`Execute` must
    /// equal the driver-reported expected count (zero-expected-with-zero-
    /// bound included); mismatch is a fatal programmer error. Runs the
    /// post-execute callback queue in order on success and clears it.
    pub fn execute(&mut self) -> Result<()> {
        if let Some(expected) = self.expected_params {
            if self.bound_params != expected as u16 {
                return Err(Error::new(
                    format!("statement expects {expected} parameter(s) but {} were bound", self.bound_params),
                    Status::InvalidArguments,
                ));
            }
        }
        self.raw.execute()?;
        self.has_cursor = true;
        self.bound_params = 0;
        self.queue.run_post_execute(&mut self.raw)
    }

    /// Calls `SQLFetch`; on success runs the post-fetch queue (resize-on-
    /// truncation, UTF normalization, trim-right) and clears it. Returns
    /// `false` on no-data.
    pub fn fetch_row(&mut self) -> Result<bool> {
        let fetched = self.raw.fetch()?;
        if !fetched {
            logger().log(LogEvent::Fetch { row: 0 });
            return Ok(false);
        }
        self.queue.run_post_fetch(&mut self.raw)?;
        Ok(true)
    }

    /// One-shot read via the binder, erroring if the column is actually NULL.
    pub fn get_column<T: SqlDataBinder>(&mut self, index: u16) -> Result<T> {
        T::get_column(&mut self.raw, index, &mut self.queue)
    }

    /// One-shot read distinguishing the null indicator.
    pub fn get_nullable_column<T: SqlDataBinder>(&mut self, index: u16) -> Result<Option<T>> {
        match T::get_column(&mut self.raw, index, &mut self.queue) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.status == Status::NullFetched => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One-shot read into a runtime-typed [`SqlVariant`], dispatching on
    /// `expected` — the mapper's entry point for field-metadata-driven reads.
    pub fn get_variant_column(&mut self, index: u16, expected: ColumnType) -> Result<SqlVariant> {
        variant::get_column_as_dialect_aware(&mut self.raw, Some(self.dialect.as_ref()), index, expected, &mut self.queue)
    }

    pub fn row_count(&self) -> Result<i64> {
        self.raw.row_count()
    }

    pub fn num_result_cols(&self) -> Result<i16> {
        self.raw.num_result_cols()
    }

    pub fn close_cursor(&mut self) -> Result<()> {
        self.has_cursor = false;
        self.raw.close_cursor()
    }

    pub(crate) fn raw_mut(&mut self) -> &mut RawStatement {
        &mut self.raw
    }
}

/// Binds a homogeneous column of `T` as a single-column parameter-array
/// `Execute`. When `T`'s binder supports a native columnar bind (POD
/// fixed-width types — see [`SqlDataBinder::bind_input_parameter_array`]),
/// this issues one `Execute` with `SQL_ATTR_PARAMSET_SIZE` set to
/// `rows.len()`; otherwise it falls back to binding and executing each row
/// in turn: if all column element types are trivially contiguous in memory
/// (POD and supported), a native columnar bind is issued in one `Execute`,
/// otherwise a row-by-row fallback binds each row and executes repeatedly.
pub fn execute_batch<T: SqlDataBinder>(stmt: &mut Statement, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Err(Error::new("ExecuteBatch requires at least one row", Status::InvalidArguments));
    }
    let mut indicators = vec![0isize; rows.len()];
    let bound_columnar = T::bind_input_parameter_array(&mut stmt.raw, 1, rows, &mut indicators, &mut stmt.queue)?;
    if bound_columnar {
        stmt.raw.execute()?;
        stmt.has_cursor = true;
        let result = stmt.queue.run_post_execute(&mut stmt.raw);
        // Reset paramset size to 1 so later single-row binds on this
        // statement aren't silently read as arrays: the indicator/data
        // pointers only become arrays once size > 1.
        unsafe {
            stmt.raw.set_paramset_size(1)?;
        }
        return result;
    }
    for row in rows {
        stmt.bind_input_parameter(1, row, None)?;
        stmt.execute()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    // Statement lifecycle correctness (cursor-close-on-reprepare, queue
    // ordering) is exercised against the in-memory mock backend in
    // `crate::mock`, since a real ODBC handle can't be allocated in a unit
    // test without a driver manager. The bound-parameter-count check in
    // `execute()` needs a real driver's `num_params()` to be meaningful, so
    // it's covered by `test_execute_rejects_parameter_count_mismatch` in
    // `core/tests/driver_manager_postgresql.rs` instead.
}
