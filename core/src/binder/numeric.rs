//! Decimal binder.
//!
//! Maintains two representations in parallel: the structured
//! `SQL_NUMERIC_STRUCT` (sign + precision + scale + little-endian 128-bit
//! integer) for drivers that accept it, and a floating-point shadow for the
//! drivers whose ODBC numeric binding is defective (SQLite, SQL Server).
//! `rust_decimal::Decimal` already stores
//! a sign, scale and 96-bit mantissa; we widen to 128 bits when building the
//! wire struct, matching "64-bit where 128 is unavailable" only in spirit —
//! `Decimal`'s mantissa never exceeds 96 bits, so a 128-bit struct always fits.

use odbc_sys::{CDataType, SqlDataType};
use rust_decimal::Decimal;

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::dialect::Dialect;
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

/// A decimal value declared with a fixed `(precision, scale)`, as the schema
/// synthesizer needs both to render `DECIMAL(p, s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqlNumeric {
    pub precision: u8,
    pub scale: u8,
    pub value: Decimal,
}

impl SqlNumeric {
    pub fn new(precision: u8, scale: u8, value: Decimal) -> Result<Self> {
        if value.scale() > scale as u32 {
            return Err(Error::new(
                format!("value scale {} exceeds declared scale {scale}", value.scale()),
                Status::InvalidArguments,
            ));
        }
        Ok(Self { precision, scale, value })
    }

    pub fn to_string_exact(&self) -> String {
        self.value.round_dp(self.scale as u32).to_string()
    }

    /// Builds the little-endian 128-bit mantissa ODBC's `SQL_NUMERIC_STRUCT` wants.
    fn mantissa_le_bytes(&self) -> ([u8; 16], bool) {
        let mantissa = self.value.mantissa().unsigned_abs();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&mantissa.to_le_bytes());
        (bytes, self.value.is_sign_negative())
    }
}

impl std::fmt::Display for SqlNumeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_exact())
    }
}

/// Declares the fallback chosen for SQLite/SQL Server:
/// "A binder must not assume native Numeric works".
pub fn numeric_binding_is_reliable(dialect: &dyn Dialect) -> bool {
    dialect.numeric_binding_is_reliable()
}

impl SqlDataBinder for SqlNumeric {
    fn column_type() -> ColumnType {
        // Precision/scale are per-instance; schema synthesis reads them off
        // the field's declared type rather than this associated function,
        // which only needs to report the shape.
        ColumnType::Decimal(38, 10)
    }

    fn bind_input_parameter(
        stmt: &mut RawStatement,
        index: u16,
        value: &Self,
        _queue: &mut CallbackQueue,
    ) -> Result<()> {
        // Float shadow: portable across all four backends even where the
        // structured numeric would work; callers needing the exact
        // structured bind use `bind_input_parameter_structured` after
        // checking `numeric_binding_is_reliable`.
        let shadow: f64 = value.value.try_into().map_err(|_| {
            Error::new("decimal value does not fit in f64 shadow", Status::InvalidArguments)
        })?;
        let mut indicator: isize = 8;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Double,
                SqlDataType::DOUBLE,
                value.precision as u32,
                value.scale as i16,
                &shadow as *const f64 as odbc_sys::Pointer,
                8,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut shadow: f64 = 0.0;
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(index, CDataType::Double, &mut shadow as *mut f64 as odbc_sys::Pointer, 8, &mut indicator)?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable decimal column {index}"), Status::NullFetched));
        }
        let value = Decimal::try_from(shadow).map_err(|e| Error::new(e.to_string(), Status::InvalidArguments))?;
        Ok(Self { precision: 38, scale: 10, value })
    }

    fn inspect(value: &Self) -> String {
        value.to_string_exact()
    }
}

impl SqlNumeric {
    /// Binds using ODBC's structured `SQL_NUMERIC_STRUCT` (PostgreSQL, MySQL).
    /// The struct layout is
    /// `{ precision: u8, scale: i8, sign: u8 (1=positive), val: [u8; 16] LE }`.
    pub fn bind_input_parameter_structured(
        &self,
        stmt: &mut RawStatement,
        index: u16,
        _queue: &mut CallbackQueue,
    ) -> Result<()> {
        #[repr(C)]
        struct SqlNumericStruct {
            precision: u8,
            scale: i8,
            sign: u8,
            val: [u8; 16],
        }
        let (mantissa, negative) = self.mantissa_le_bytes();
        let wire = SqlNumericStruct {
            precision: self.precision,
            scale: self.scale as i8,
            sign: if negative { 0 } else { 1 },
            val: mantissa,
        };
        let mut indicator: isize = std::mem::size_of::<SqlNumericStruct>() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Numeric,
                SqlDataType::NUMERIC,
                self.precision as u32,
                self.scale as i16,
                &wire as *const SqlNumericStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlNumericStruct>() as isize,
                &mut indicator,
            )
        }
    }

    /// Reads back ODBC's structured `SQL_NUMERIC_STRUCT` (PostgreSQL, MySQL),
    /// the fetch counterpart of [`Self::bind_input_parameter_structured`].
    pub fn get_column_structured(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        #[repr(C)]
        struct SqlNumericStruct {
            precision: u8,
            scale: i8,
            sign: u8,
            val: [u8; 16],
        }
        let mut wire = SqlNumericStruct { precision: 0, scale: 0, sign: 1, val: [0u8; 16] };
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(
                index,
                CDataType::Numeric,
                &mut wire as *mut SqlNumericStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlNumericStruct>() as isize,
                &mut indicator,
            )?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable decimal column {index}"), Status::NullFetched));
        }
        let mantissa: i128 = u128::from_le_bytes(wire.val)
            .try_into()
            .map_err(|_| Error::new(format!("decimal column {index} mantissa exceeds signed 128-bit range"), Status::InvalidArguments))?;
        let mut value = Decimal::from_i128_with_scale(mantissa, wire.scale.max(0) as u32);
        if wire.sign == 0 && !value.is_zero() {
            value.set_sign_negative(true);
        }
        Ok(Self { precision: wire.precision, scale: wire.scale.max(0) as u8, value })
    }

    /// Binds via the structured path when `dialect` trusts native `SQL_NUMERIC`
    /// binding (PostgreSQL, MySQL), falling back to the `f64` shadow otherwise
    /// (SQLite, SQL Server) — the per-backend seam spec.md's binding table
    /// describes for `Decimal`.
    pub fn bind_input_parameter_dialect_aware(&self, stmt: &mut RawStatement, dialect: &dyn Dialect, index: u16, queue: &mut CallbackQueue) -> Result<()> {
        if numeric_binding_is_reliable(dialect) {
            self.bind_input_parameter_structured(stmt, index, queue)
        } else {
            SqlNumeric::bind_input_parameter(stmt, index, self, queue)
        }
    }

    /// Fetch counterpart of [`Self::bind_input_parameter_dialect_aware`].
    pub fn get_column_dialect_aware(stmt: &mut RawStatement, dialect: &dyn Dialect, index: u16, queue: &mut CallbackQueue) -> Result<Self> {
        if numeric_binding_is_reliable(dialect) {
            Self::get_column_structured(stmt, index, queue)
        } else {
            Self::get_column(stmt, index, queue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn preserves_declared_precision() {
        let v = SqlNumeric::new(38, 10, Decimal::from_str("1.2345678901").unwrap()).unwrap();
        assert_eq!(v.to_string_exact(), "1.2345678901");
    }

    #[test]
    fn zero_has_no_sign_beyond_the_flag() {
        let v = SqlNumeric::new(38, 10, Decimal::from_str("0").unwrap()).unwrap();
        let (_mantissa, negative) = v.mantissa_le_bytes();
        assert!(!negative);
        assert_eq!(v.to_string_exact(), "0.0000000000");
    }

    #[test]
    fn rejects_scale_overflow() {
        assert!(SqlNumeric::new(10, 2, Decimal::from_str("1.2345").unwrap()).is_err());
    }

    struct MockDialect(crate::dialect::Backend);

    impl Dialect for MockDialect {
        fn backend(&self) -> crate::dialect::Backend {
            self.0
        }
        fn boolean_literal(&self, value: bool) -> &'static str {
            if value {
                "1"
            } else {
                "0"
            }
        }
        fn column_type_sql(&self, _ty: ColumnType) -> String {
            String::new()
        }
        fn apply_pagination(&self, select_core: &str, _pagination: crate::dialect::Pagination, _order_by: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, _column: &str, _ty: ColumnType) -> String {
            String::new()
        }
        fn drop_table(&self, table: &str, _cascade: bool, _dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
            vec![format!("DROP TABLE {table}")]
        }
        fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn structured_path_picked_for_postgresql_and_mysql() {
        assert!(numeric_binding_is_reliable(&MockDialect(crate::dialect::Backend::PostgreSql)));
        assert!(numeric_binding_is_reliable(&MockDialect(crate::dialect::Backend::MySql)));
    }

    #[test]
    fn float_shadow_picked_for_sqlite_and_sqlserver() {
        assert!(!numeric_binding_is_reliable(&MockDialect(crate::dialect::Backend::Sqlite)));
        assert!(!numeric_binding_is_reliable(&MockDialect(crate::dialect::Backend::SqlServer)));
    }
}
