//! Fixed-size scalar binders: bool and signed/unsigned integers 8..64 bits,
//! float/double. None of these need the truncation loop — the
//! buffer size is known up front.

use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::Result;
use crate::handle::RawStatement;

macro_rules! fixed_width_binder {
    ($ty:ty, $c_type:expr, $sql_type:expr, $column_size:expr, $column_type:expr) => {
        impl SqlDataBinder for $ty {
            fn column_type() -> ColumnType {
                $column_type
            }

            fn bind_input_parameter(
                stmt: &mut RawStatement,
                index: u16,
                value: &Self,
                _queue: &mut CallbackQueue,
            ) -> Result<()> {
                let mut indicator: isize = std::mem::size_of::<$ty>() as isize;
                unsafe {
                    stmt.bind_input_parameter(
                        index,
                        $c_type,
                        $sql_type,
                        $column_size,
                        0,
                        value as *const $ty as odbc_sys::Pointer,
                        std::mem::size_of::<$ty>() as isize,
                        &mut indicator,
                    )
                }
            }

            fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
                let mut value: $ty = Default::default();
                let mut indicator: isize = 0;
                unsafe {
                    stmt.get_data(
                        index,
                        $c_type,
                        &mut value as *mut $ty as odbc_sys::Pointer,
                        std::mem::size_of::<$ty>() as isize,
                        &mut indicator,
                    )?;
                }
                if indicator == crate::handle::SQL_NULL_DATA {
                    return Err(crate::error::Error::new(
                        format!("NULL fetched into non-nullable column {index}"),
                        crate::error::Status::NullFetched,
                    ));
                }
                Ok(value)
            }

            fn inspect(value: &Self) -> String {
                value.to_string()
            }

            /// POD and fixed-width, so `values` is already laid out exactly
            /// how `SQLBindParameter` wants a column-wise array bind: one
            /// contiguous buffer, stride `size_of::<Self>()`, paramset size
            /// `values.len()` — the native columnar bind path.
            fn bind_input_parameter_array(
                stmt: &mut RawStatement,
                index: u16,
                values: &[Self],
                indicators: &mut [isize],
                _queue: &mut CallbackQueue,
            ) -> Result<bool> {
                if values.is_empty() {
                    return Ok(false);
                }
                debug_assert_eq!(indicators.len(), values.len());
                for ind in indicators.iter_mut() {
                    *ind = std::mem::size_of::<$ty>() as isize;
                }
                unsafe {
                    stmt.set_paramset_size(values.len() as u32)?;
                    stmt.bind_input_parameter(
                        index,
                        $c_type,
                        $sql_type,
                        $column_size,
                        0,
                        values.as_ptr() as odbc_sys::Pointer,
                        std::mem::size_of::<$ty>() as isize,
                        indicators.as_mut_ptr(),
                    )?;
                }
                Ok(true)
            }
        }
    };
}

fixed_width_binder!(bool, CDataType::Bit, SqlDataType::BIT, 1, ColumnType::Bool);
fixed_width_binder!(i8, CDataType::STinyInt, SqlDataType::TINYINT, 3, ColumnType::Tinyint);
fixed_width_binder!(i16, CDataType::SShort, SqlDataType::SMALLINT, 5, ColumnType::Smallint);
fixed_width_binder!(i32, CDataType::SLong, SqlDataType::INTEGER, 10, ColumnType::Integer);
fixed_width_binder!(i64, CDataType::SBigInt, SqlDataType::BIGINT, 19, ColumnType::Bigint);
fixed_width_binder!(u8, CDataType::UTinyInt, SqlDataType::TINYINT, 3, ColumnType::Tinyint);
fixed_width_binder!(u16, CDataType::UShort, SqlDataType::SMALLINT, 5, ColumnType::Smallint);
fixed_width_binder!(u32, CDataType::ULong, SqlDataType::INTEGER, 10, ColumnType::Integer);
fixed_width_binder!(u64, CDataType::UBigInt, SqlDataType::BIGINT, 20, ColumnType::Bigint);
fixed_width_binder!(f32, CDataType::Float, SqlDataType::REAL, 7, ColumnType::Real);
fixed_width_binder!(f64, CDataType::Double, SqlDataType::DOUBLE, 15, ColumnType::Real);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_types_map_to_expected_sql_types() {
        assert_eq!(i32::column_type(), ColumnType::Integer);
        assert_eq!(i64::column_type(), ColumnType::Bigint);
        assert_eq!(bool::column_type(), ColumnType::Bool);
    }

    #[test]
    fn inspect_renders_value() {
        assert_eq!(i32::inspect(&42), "42");
        assert_eq!(bool::inspect(&true), "true");
    }
}
