//! The per-value-type binder family.
//!
//! Each bindable type implements [`SqlDataBinder`], a polymorphic protocol
//! over a closed set of value kinds rather than an inheritance hierarchy — in
//! Rust this is static dispatch through the trait, one `impl` per type,
//! specializing a generic trait instead of walking a class hierarchy.

pub mod binary;
pub mod date;
pub mod datetime;
pub mod dynamic_binary;
pub mod dynamic_string;
pub mod fixed_string;
pub mod guid;
pub mod null_value;
pub mod numeric;
pub mod primitives;
pub mod text;
pub mod time;
pub mod variant;

use std::cell::RefCell;
use std::rc::Rc;

pub use crate::dialect::ColumnType;
use crate::error::Result;
use crate::handle::RawStatement;

/// A deferred step queued on the [`crate::statement::Statement`]: a
/// "keep-alive" callback after `Execute`, or a truncation-resize/trim
/// callback after each `FetchRow`. A closure invoked by the statement
/// itself, which hands back the raw handle it already owns, stands in for
/// capturing a raw pointer directly.
pub type Callback = Box<dyn FnMut(&mut RawStatement) -> Result<()> + Send>;

/// Holds the two ordered callback queues a [`Statement`][crate::statement::Statement]
/// drains after `Execute` and after each `FetchRow`, respectively. Order is
/// insertion order; nothing is deduplicated or reordered.
#[derive(Default)]
pub struct CallbackQueue {
    post_execute: Vec<Callback>,
    post_fetch: Vec<Callback>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_post_execute(&mut self, f: impl FnMut(&mut RawStatement) -> Result<()> + Send + 'static) {
        self.post_execute.push(Box::new(f));
    }

    pub fn push_post_fetch(&mut self, f: impl FnMut(&mut RawStatement) -> Result<()> + Send + 'static) {
        self.post_fetch.push(Box::new(f));
    }

    pub fn run_post_execute(&mut self, stmt: &mut RawStatement) -> Result<()> {
        for cb in self.post_execute.iter_mut() {
            cb(stmt)?;
        }
        self.post_execute.clear();
        Ok(())
    }

    pub fn run_post_fetch(&mut self, stmt: &mut RawStatement) -> Result<()> {
        for cb in self.post_fetch.iter_mut() {
            cb(stmt)?;
        }
        self.post_fetch.clear();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.post_execute.clear();
        self.post_fetch.clear();
    }
}

/// A pre-bound output cell shared between the statement and the caller
/// (record field or local variable). `Rc<RefCell<_>>` stands in for the
/// original's raw pointer capture: the statement's post-fetch callback writes
/// through it, the caller reads through it, and neither needs the other to
/// outlive a single stack frame.
pub type OutputCell<T> = Rc<RefCell<T>>;

/// Four operations per bindable type.
pub trait SqlDataBinder: Sized + 'static {
    /// The declared SQL column type used by schema synthesis.
    fn column_type() -> ColumnType;

    /// Registers `value` as an input parameter at 1-based `index`. Must not
    /// retain a pointer to `value` past this call without pushing a
    /// keep-alive callback for any owned buffer it copies from `value`.
    fn bind_input_parameter(
        stmt: &mut RawStatement,
        index: u16,
        value: &Self,
        queue: &mut CallbackQueue,
    ) -> Result<()>;

    /// Pre-binds `cell` as the destination for column `index` across
    /// subsequent fetches. The default implementation defers to
    /// [`Self::get_column`] from a post-fetch callback — see DESIGN.md for
    /// why this crate favors the pull model uniformly instead of giving
    /// ODBC a raw pointer into `cell` for the lifetime of the binding.
    fn bind_output_column(
        cell: OutputCell<Self>,
        _stmt: &mut RawStatement,
        index: u16,
        queue: &mut CallbackQueue,
    ) -> Result<()>
    where
        Self: Default,
    {
        queue.push_post_fetch(move |stmt| {
            let mut scratch = CallbackQueue::new();
            let value = Self::get_column(stmt, index, &mut scratch)?;
            scratch.run_post_fetch(stmt)?;
            *cell.borrow_mut() = value;
            Ok(())
        });
        Ok(())
    }

    /// One-shot pull after a row has been fetched.
    fn get_column(stmt: &mut RawStatement, index: u16, queue: &mut CallbackQueue) -> Result<Self>;

    /// Short human-readable rendering for the bind-event log (`Inspect`).
    fn inspect(value: &Self) -> String;

    /// Attempts a native columnar array bind of `values` as one parameter at
    /// 1-based `index`, setting `SQL_ATTR_PARAMSET_SIZE` to `values.len()` —
    /// the `ExecuteBatch` path taken when all column element types are
    /// trivially contiguous in memory (POD and supported), issuing a native
    /// columnar bind in one `Execute`. `indicators` is caller-owned scratch
    /// space sized `values.len()` that must outlive the statement's next
    /// `Execute` — the default implementation never touches it and returns
    /// `false`, signaling the caller to fall back to a row-by-row bind+execute
    /// loop (see [`crate::statement::execute_batch`]).
    fn bind_input_parameter_array(
        _stmt: &mut RawStatement,
        _index: u16,
        _values: &[Self],
        _indicators: &mut [isize],
        _queue: &mut CallbackQueue,
    ) -> Result<bool> {
        Ok(false)
    }
}

/// Growth policy shared by the variable-length binders (dynamic string,
/// dynamic binary, text): after a `SQLGetData` call the indicator holds
/// either a positive byte count still outstanding from the current
/// position, [`crate::handle::SQL_NO_TOTAL`], [`crate::handle::SQL_NULL_DATA`],
/// or a value `<=` the buffer slice passed in (complete). Successive
/// `SQLGetData` calls on the same column continue emitting data from where
/// the previous call left off rather than restarting from the beginning
/// (confirmed against `BasicStringBinder.hpp`'s `GetColumn`/`GetArrayData`,
/// which track a `writeIndex` and advance the destination pointer by it on
/// every retry), so this loop tracks `written` and always hands `pull` the
/// slice starting at that offset — never the whole buffer — to avoid
/// overwriting the first chunk with the continuation.
pub(crate) fn fetch_growing<F>(mut initial_capacity: usize, mut pull: F) -> Result<Option<Vec<u8>>>
where
    F: FnMut(&mut [u8]) -> Result<(isize, bool)>,
{
    use crate::handle::{SQL_NO_TOTAL, SQL_NULL_DATA};

    if initial_capacity == 0 {
        initial_capacity = 256;
    }
    let mut buf = vec![0u8; initial_capacity];
    let mut written: usize = 0;
    loop {
        let slice_len = buf.len() - written;
        let (indicator, had_more) = pull(&mut buf[written..])?;
        if indicator == SQL_NULL_DATA {
            return Ok(None);
        }
        if indicator == SQL_NO_TOTAL {
            // This call filled the whole slice it was given; the driver
            // doesn't yet know how much more is left.
            written += slice_len;
            let new_len = buf.len() * 2;
            buf.resize(new_len, 0);
            continue;
        }
        let outstanding = indicator as usize;
        if outstanding > slice_len && had_more {
            // Truncated, but the driver knows the remaining byte count from
            // the current position; this call filled the slice it was given.
            written += slice_len;
            buf.resize(written + outstanding, 0);
            continue;
        }
        // Complete: `outstanding` is exactly how many bytes this call wrote.
        let total = written + outstanding;
        buf.truncate(total.min(buf.len()));
        return Ok(Some(buf));
    }
}
