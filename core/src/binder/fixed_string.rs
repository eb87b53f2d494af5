//! Fixed-capacity, stack-allocated string binder. Optionally
//! right-trims trailing spaces after fetch, the way `CHAR(n)` columns pad.

use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

/// A fixed-capacity string of at most `N` bytes, right-trimmed on fetch when
/// `trim_right` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFixedString<const N: usize> {
    pub value: String,
    pub trim_right: bool,
}

impl<const N: usize> Default for SqlFixedString<N> {
    fn default() -> Self {
        Self { value: String::new(), trim_right: true }
    }
}

impl<const N: usize> SqlFixedString<N> {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() > N {
            return Err(Error::new(format!("value of {} bytes exceeds fixed capacity {N}", value.len()), Status::InvalidArguments));
        }
        Ok(Self { value, trim_right: true })
    }
}

impl<const N: usize> SqlDataBinder for SqlFixedString<N> {
    fn column_type() -> ColumnType {
        ColumnType::Char(N)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let mut buf = value.value.clone().into_bytes();
        let mut indicator: isize = buf.len() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Char,
                SqlDataType::CHAR,
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
            stmt.get_data(index, CDataType::Char, buf.as_mut_ptr() as odbc_sys::Pointer, N as isize, &mut indicator)?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable char column {index}"), Status::NullFetched));
        }
        let len = (indicator as usize).min(N);
        buf.truncate(len);
        let mut value = String::from_utf8_lossy(&buf).into_owned();
        trim_right_spaces(&mut value);
        Ok(Self { value, trim_right: true })
    }

    fn inspect(value: &Self) -> String {
        value.value.clone()
    }
}

fn trim_right_spaces(s: &mut String) {
    let trimmed_len = s.trim_end_matches(' ').len();
    s.truncate(trimmed_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversize_value() {
        assert!(SqlFixedString::<4>::new("toolong").is_err());
    }

    #[test]
    fn right_trim_strips_padding() {
        let mut value = "abc   ".to_string();
        trim_right_spaces(&mut value);
        assert_eq!(value, "abc");
    }
}
