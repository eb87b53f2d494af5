//! The distinguished null value as a first-class bind target: binding a
//! typed NULL input parameter when no concrete value is on hand — e.g. an
//! optional foreign key left unset.
//!
//! Most backends accept a generic `SQL_VARCHAR` NULL regardless of the
//! column's real type. SQL Server does not: it rejects a mistyped NULL
//! against a non-character column, so [`bind_null_with_dialect`] first calls
//! `SQLDescribeParam` to recover the parameter's native type when
//! [`crate::dialect::Dialect::requires_describe_param_for_null`] says so.

use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::handle::{RawStatement, SQL_NULL_DATA};

/// A unit binder representing SQL NULL with no associated value or type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqlNullValue;

impl SqlDataBinder for SqlNullValue {
    fn column_type() -> ColumnType {
        ColumnType::Varchar(0)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, _value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let mut indicator: isize = SQL_NULL_DATA;
        unsafe { stmt.bind_input_parameter(index, CDataType::Char, SqlDataType::VARCHAR, 1, 0, std::ptr::null_mut(), 0, &mut indicator) }
    }

    fn get_column(_stmt: &mut RawStatement, _index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        Ok(Self)
    }

    fn inspect(_value: &Self) -> String {
        "NULL".to_string()
    }
}

/// Binds a typed NULL at `index`, probing the parameter's native type first
/// when the dialect requires it.
pub fn bind_null_with_dialect(dialect: &dyn Dialect, stmt: &mut RawStatement, index: u16) -> Result<()> {
    let mut indicator: isize = SQL_NULL_DATA;
    if dialect.requires_describe_param_for_null() {
        let (data_type, column_size, decimal_digits) = stmt.describe_param(index)?;
        return unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Char,
                data_type,
                column_size.max(1),
                decimal_digits,
                std::ptr::null_mut(),
                0,
                &mut indicator,
            )
        };
    }
    unsafe { stmt.bind_input_parameter(index, CDataType::Char, SqlDataType::VARCHAR, 1, 0, std::ptr::null_mut(), 0, &mut indicator) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_renders_null_literal() {
        assert_eq!(SqlNullValue::inspect(&SqlNullValue), "NULL");
    }
}
