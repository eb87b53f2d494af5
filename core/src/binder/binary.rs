//! Fixed-capacity binary blob binder.

use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlBinary<const N: usize> {
    pub bytes: Vec<u8>,
}

impl<const N: usize> Default for SqlBinary<N> {
    fn default() -> Self {
        Self { bytes: Vec::new() }
    }
}

impl<const N: usize> SqlBinary<N> {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > N {
            return Err(Error::new(format!("{} bytes exceeds fixed capacity {N}", bytes.len()), Status::InvalidArguments));
        }
        Ok(Self { bytes })
    }
}

impl<const N: usize> SqlDataBinder for SqlBinary<N> {
    fn column_type() -> ColumnType {
        ColumnType::Binary(N)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let mut buf = value.bytes.clone();
        let mut indicator: isize = buf.len() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Binary,
                SqlDataType::BINARY,
                N as u32,
                0,
                buf.as_mut_ptr() as odbc_sys::Pointer,
                N as isize,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut buf = vec![0u8; N];
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(index, CDataType::Binary, buf.as_mut_ptr() as odbc_sys::Pointer, N as isize, &mut indicator)?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable binary column {index}"), Status::NullFetched));
        }
        buf.truncate((indicator as usize).min(N));
        Ok(Self { bytes: buf })
    }

    fn inspect(value: &Self) -> String {
        format!("<{} bytes>", value.bytes.len())
    }
}
