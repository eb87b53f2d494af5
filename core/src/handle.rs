//! Thin, safe-ish wrappers around the raw ODBC handles (`SQLHENV`/`SQLHDBC`/
//! `SQLHSTMT`) reached through `odbc-sys`, in the style of
//! `pacman82-odbc-api`'s `handles::statement` module: each ODBC call becomes
//! one method, diagnostics are pulled via `SQLGetDiagRec` into our own
//! [`Error`], and anything that dereferences caller-owned buffers is `unsafe`.
//!
//! This is the only module in the crate that touches raw ODBC; everything
//! above it (binders, statement lifecycle) is safe Rust built on top.

use std::ptr::null_mut;

use odbc_sys::{
    HDbc, HEnv, HStmt, Handle, HandleType, SQLAllocHandle, SQLBindCol, SQLBindParameter,
    SQLCloseCursor, SQLDisconnect, SQLDriverConnectW, SQLEndTran, SQLExecDirectW, SQLExecute,
    SQLFetch, SQLFreeHandle, SQLFreeStmt, SQLGetData, SQLGetDiagRec, SQLNumParams,
    SQLNumResultCols, SQLPrepareW, SQLRowCount, SQLSetConnectAttr, SQLSetEnvAttr,
    SQLSetStmtAttrW, SqlReturn, StatementAttribute,
};

use crate::error::{Error, Status};

pub(crate) fn check(ret: SqlReturn, handle_type: HandleType, handle: Handle) -> crate::error::Result<()> {
    match ret {
        SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO => Ok(()),
        SqlReturn::NO_DATA => Ok(()),
        _ => Err(diagnose(handle_type, handle)),
    }
}

/// Extracts diagnostic record 1.
pub(crate) fn diagnose(handle_type: HandleType, handle: Handle) -> Error {
    let mut sqlstate: [u16; 6] = [0; 6];
    let mut native_code: i32 = 0;
    let mut message_buf: [u16; 1024] = [0; 1024];
    let mut message_len: i16 = 0;

    let ret = unsafe {
        SQLGetDiagRec(
            handle_type,
            handle,
            1,
            sqlstate.as_mut_ptr(),
            &mut native_code,
            message_buf.as_mut_ptr(),
            message_buf.len() as i16,
            &mut message_len,
        )
    };

    if ret != SqlReturn::SUCCESS && ret != SqlReturn::SUCCESS_WITH_INFO {
        return Error::from_diag_parts(*b"HY000", 0, "driver returned no diagnostic record".into());
    }

    let state_ascii: [u8; 5] = [
        sqlstate[0] as u8,
        sqlstate[1] as u8,
        sqlstate[2] as u8,
        sqlstate[3] as u8,
        sqlstate[4] as u8,
    ];
    let message = String::from_utf16_lossy(&message_buf[..message_len.max(0) as usize]);
    Error::from_diag_parts(state_ascii, native_code, message)
}

pub struct Environment {
    handle: HEnv,
}

unsafe impl Send for Environment {}

impl Environment {
    pub fn new() -> crate::error::Result<Self> {
        let mut handle: Handle = null_mut();
        unsafe {
            check(
                SQLAllocHandle(HandleType::Env, null_mut(), &mut handle),
                HandleType::Env,
                null_mut(),
            )?;
            let henv = handle as HEnv;
            check(
                SQLSetEnvAttr(
                    henv,
                    odbc_sys::EnvironmentAttribute::OdbcVersion,
                    odbc_sys::AttrOdbcVersion::Odbc3.into(),
                    0,
                ),
                HandleType::Env,
                henv as Handle,
            )?;
            Ok(Self { handle: henv })
        }
    }

    pub(crate) fn raw(&self) -> HEnv {
        self.handle
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        unsafe {
            SQLFreeHandle(HandleType::Env, self.handle as Handle);
        }
    }
}

pub struct RawConnection {
    handle: HDbc,
}

unsafe impl Send for RawConnection {}

impl RawConnection {
    pub fn allocate(env: &Environment) -> crate::error::Result<Self> {
        let mut handle: Handle = null_mut();
        unsafe {
            check(
                SQLAllocHandle(HandleType::Dbc, env.raw() as Handle, &mut handle),
                HandleType::Dbc,
                null_mut(),
            )?;
        }
        Ok(Self { handle: handle as HDbc })
    }

    /// Connects using a full ODBC connection string.
    pub fn connect_with_string(&mut self, connection_string: &str) -> crate::error::Result<()> {
        let mut wide: Vec<u16> = connection_string.encode_utf16().collect();
        let mut out_buf: [u16; 1024] = [0; 1024];
        let mut out_len: i16 = 0;
        unsafe {
            check(
                SQLDriverConnectW(
                    self.handle,
                    null_mut(),
                    wide.as_mut_ptr(),
                    wide.len() as i16,
                    out_buf.as_mut_ptr(),
                    out_buf.len() as i16,
                    &mut out_len,
                    odbc_sys::DriverConnectOption::NoPrompt,
                ),
                HandleType::Dbc,
                self.handle as Handle,
            )
        }
    }

    pub(crate) fn raw(&self) -> HDbc {
        self.handle
    }

    pub fn diag(&self) -> Error {
        diagnose(HandleType::Dbc, self.handle as Handle)
    }

    /// Toggles `SQL_ATTR_AUTOCOMMIT`. Migrations and the migration lock's
    /// `BEGIN IMMEDIATE` equivalent both need an explicit transaction
    /// boundary.
    pub fn set_autocommit(&mut self, enabled: bool) -> crate::error::Result<()> {
        let value: usize = if enabled { 1 } else { 0 };
        let ret = unsafe {
            SQLSetConnectAttr(
                self.handle,
                odbc_sys::ConnectionAttribute::AutoCommit,
                value as odbc_sys::Pointer,
                0,
            )
        };
        check(ret, HandleType::Dbc, self.handle as Handle)
    }

    /// `SQLEndTran` with `Commit`.
    pub fn commit(&mut self) -> crate::error::Result<()> {
        let ret = unsafe { SQLEndTran(HandleType::Dbc, self.handle as Handle, odbc_sys::CompletionType::Commit) };
        check(ret, HandleType::Dbc, self.handle as Handle)
    }

    /// `SQLEndTran` with `Rollback`.
    pub fn rollback(&mut self) -> crate::error::Result<()> {
        let ret = unsafe { SQLEndTran(HandleType::Dbc, self.handle as Handle, odbc_sys::CompletionType::Rollback) };
        check(ret, HandleType::Dbc, self.handle as Handle)
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        unsafe {
            SQLDisconnect(self.handle);
            SQLFreeHandle(HandleType::Dbc, self.handle as Handle);
        }
    }
}

pub struct RawStatement {
    handle: HStmt,
}

unsafe impl Send for RawStatement {}

impl RawStatement {
    pub fn allocate(conn: &RawConnection) -> crate::error::Result<Self> {
        let mut handle: Handle = null_mut();
        unsafe {
            check(
                SQLAllocHandle(HandleType::Stmt, conn.raw() as Handle, &mut handle),
                HandleType::Stmt,
                null_mut(),
            )?;
        }
        Ok(Self { handle: handle as HStmt })
    }

    fn check(&self, ret: SqlReturn) -> crate::error::Result<()> {
        check(ret, HandleType::Stmt, self.handle as Handle)
    }

    pub fn diag(&self) -> Error {
        diagnose(HandleType::Stmt, self.handle as Handle)
    }

    pub fn prepare(&mut self, text: &str) -> crate::error::Result<()> {
        let mut wide: Vec<u16> = text.encode_utf16().collect();
        let ret = unsafe { SQLPrepareW(self.handle, wide.as_mut_ptr(), wide.len() as i32) };
        self.check(ret)
    }

    pub fn exec_direct(&mut self, text: &str) -> crate::error::Result<()> {
        let mut wide: Vec<u16> = text.encode_utf16().collect();
        let ret = unsafe { SQLExecDirectW(self.handle, wide.as_mut_ptr(), wide.len() as i32) };
        self.check(ret)
    }

    pub fn execute(&mut self) -> crate::error::Result<()> {
        let ret = unsafe { SQLExecute(self.handle) };
        self.check(ret)
    }

    pub fn num_params(&self) -> crate::error::Result<i16> {
        let mut n: i16 = 0;
        let ret = unsafe { SQLNumParams(self.handle, &mut n) };
        self.check(ret)?;
        Ok(n)
    }

    pub fn num_result_cols(&self) -> crate::error::Result<i16> {
        let mut n: i16 = 0;
        let ret = unsafe { SQLNumResultCols(self.handle, &mut n) };
        self.check(ret)?;
        Ok(n)
    }

    pub fn row_count(&self) -> crate::error::Result<i64> {
        let mut n: isize = 0;
        let ret = unsafe { SQLRowCount(self.handle, &mut n) };
        self.check(ret)?;
        Ok(n as i64)
    }

    /// Returns `false` on `SQL_NO_DATA`.
    pub fn fetch(&mut self) -> crate::error::Result<bool> {
        let ret = unsafe { SQLFetch(self.handle) };
        if ret == SqlReturn::NO_DATA {
            return Ok(false);
        }
        self.check(ret)?;
        Ok(true)
    }

    pub fn close_cursor(&mut self) -> crate::error::Result<()> {
        let ret = unsafe { SQLCloseCursor(self.handle) };
        // Closing a statement with no open cursor is not an error for our purposes.
        match ret {
            SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO | SqlReturn::ERROR => Ok(()),
            other => self.check_ret(other),
        }
    }

    fn check_ret(&self, ret: SqlReturn) -> crate::error::Result<()> {
        self.check(ret)
    }

    pub fn free_columns(&mut self) -> crate::error::Result<()> {
        let ret = unsafe { SQLFreeStmt(self.handle, odbc_sys::FreeStmtOption::Unbind) };
        self.check(ret)
    }

    /// # Safety
    /// `value_ptr` must stay valid and unmoved until the next `execute`.
    pub unsafe fn bind_input_parameter(
        &mut self,
        index: u16,
        c_type: odbc_sys::CDataType,
        sql_type: odbc_sys::SqlDataType,
        column_size: u32,
        decimal_digits: i16,
        value_ptr: odbc_sys::Pointer,
        buffer_length: isize,
        indicator_ptr: *mut isize,
    ) -> crate::error::Result<()> {
        let ret = SQLBindParameter(
            self.handle,
            index,
            odbc_sys::ParamType::Input,
            c_type,
            sql_type,
            column_size,
            decimal_digits,
            value_ptr,
            buffer_length,
            indicator_ptr,
        );
        self.check(ret)
    }

    /// # Safety
    /// `value_ptr`/`indicator_ptr` must stay valid until unbound or the
    /// statement is freed.
    pub unsafe fn bind_output_column(
        &mut self,
        index: u16,
        c_type: odbc_sys::CDataType,
        value_ptr: odbc_sys::Pointer,
        buffer_length: isize,
        indicator_ptr: *mut isize,
    ) -> crate::error::Result<()> {
        let ret = SQLBindCol(self.handle, index, c_type, value_ptr, buffer_length, indicator_ptr);
        self.check(ret)
    }

    /// Sets `SQL_ATTR_PARAMSET_SIZE`: once `size > 1`, every subsequently
    /// bound parameter's data/indicator pointer is read as an array of
    /// `size` elements instead of a single value — the native columnar bind
    /// path for `ExecuteBatch`. Reset to 1 after the batched `Execute`
    /// completes so later single-row binds on this statement are unaffected.
    ///
    /// # Safety
    /// Every parameter bound afterwards until this is reset must point to a
    /// buffer holding at least `size` contiguous elements.
    pub unsafe fn set_paramset_size(&mut self, size: u32) -> crate::error::Result<()> {
        let ret = SQLSetStmtAttrW(self.handle, StatementAttribute::ParamsetSize, size as odbc_sys::Pointer, 0);
        self.check(ret)
    }

    /// Probes a parameter's native SQL type, size and decimal digits
    /// (`SQLDescribeParam`) so a typed NULL can be bound with the column's
    /// real type instead of a generic one: SQL Server rejects `SQL_VARCHAR`
    /// NULLs bound against non-character columns.
    pub fn describe_param(&mut self, index: u16) -> crate::error::Result<(odbc_sys::SqlDataType, u32, i16)> {
        let mut data_type = odbc_sys::SqlDataType::UNKNOWN_TYPE;
        let mut column_size: u32 = 0;
        let mut decimal_digits: i16 = 0;
        let mut nullable: i16 = 0;
        let ret = unsafe {
            odbc_sys::SQLDescribeParam(self.handle, index, &mut data_type, &mut column_size, &mut decimal_digits, &mut nullable)
        };
        self.check(ret)?;
        Ok((data_type, column_size, decimal_digits))
    }

    /// One-shot column pull (`GetColumn`); loops internally is
    /// the caller's job (see `binder::truncation`) since the resize policy is
    /// per value-category.
    ///
    /// # Safety
    /// `value_ptr` must be valid for `buffer_length` bytes.
    pub unsafe fn get_data(
        &mut self,
        index: u16,
        c_type: odbc_sys::CDataType,
        value_ptr: odbc_sys::Pointer,
        buffer_length: isize,
        indicator: &mut isize,
    ) -> crate::error::Result<SqlReturn> {
        let ret = SQLGetData(self.handle, index, c_type, value_ptr, buffer_length, indicator);
        match ret {
            SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO | SqlReturn::NO_DATA => Ok(ret),
            other => {
                self.check(other)?;
                Ok(other)
            }
        }
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        unsafe {
            SQLFreeHandle(HandleType::Stmt, self.handle as Handle);
        }
    }
}

/// Sentinel indicator value meaning "driver does not know the total length",
/// used by the truncation-growth loop in [`crate::binder`].
pub const SQL_NO_TOTAL: isize = -4;
/// Sentinel indicator value meaning NULL.
pub const SQL_NULL_DATA: isize = -1;
