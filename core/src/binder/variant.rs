//! `SqlVariant`: a tagged union over the bindable scalar kinds plus NULL,
//! for fields whose type is only known at runtime — e.g. a mapper field
//! built from introspected schema metadata rather than a static Rust type.
//! Each arm dispatches to the concrete binder that already knows how
//! to bind/fetch/inspect that kind; this type only adds the tag-matching.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::dynamic_string::SqlDynamicString;
use super::guid::SqlGuid;
use super::null_value::SqlNullValue;
use super::numeric::SqlNumeric;
use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::dialect::Dialect;
use crate::error::{Result, Status};
use crate::handle::RawStatement;

/// A runtime-typed scalar value, the variant counterpart to the statically
/// typed binders above. `Null` carries the [`ColumnType`] it would otherwise
/// have held, so schema synthesis and rebind-on-write logic can still declare
/// the column correctly. This is also the channel the [`crate::mapper`]
/// record descriptors use to move values to/from a [`crate::statement::Statement`]
/// without the mapper itself needing to be generic over the closed binder
/// set when it binds all of a record's fields to/from a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlVariant {
    Null(ColumnType),
    Bool(bool),
    Tinyint(i8),
    Smallint(i16),
    Integer(i32),
    Bigint(i64),
    Real(f32),
    Double(f64),
    Text(SqlDynamicString),
    Guid(SqlGuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Decimal(SqlNumeric),
    Binary(Vec<u8>),
}

impl Default for SqlVariant {
    fn default() -> Self {
        SqlVariant::Null(ColumnType::Varchar(0))
    }
}

impl From<i64> for SqlVariant {
    fn from(v: i64) -> Self {
        SqlVariant::Bigint(v)
    }
}
impl From<i32> for SqlVariant {
    fn from(v: i32) -> Self {
        SqlVariant::Integer(v)
    }
}
impl From<bool> for SqlVariant {
    fn from(v: bool) -> Self {
        SqlVariant::Bool(v)
    }
}
impl From<f64> for SqlVariant {
    fn from(v: f64) -> Self {
        SqlVariant::Double(v)
    }
}
impl From<&str> for SqlVariant {
    fn from(v: &str) -> Self {
        SqlVariant::Text(SqlDynamicString::new(v, 0))
    }
}
impl From<SqlGuid> for SqlVariant {
    fn from(v: SqlGuid) -> Self {
        SqlVariant::Guid(v)
    }
}

impl SqlVariant {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlVariant::Null(_))
    }

    /// The declared column type this value would be stored as.
    pub fn column_type(&self) -> ColumnType {
        match self {
            SqlVariant::Null(ty) => *ty,
            SqlVariant::Bool(_) => ColumnType::Bool,
            SqlVariant::Tinyint(_) => ColumnType::Tinyint,
            SqlVariant::Smallint(_) => ColumnType::Smallint,
            SqlVariant::Integer(_) => ColumnType::Integer,
            SqlVariant::Bigint(_) => ColumnType::Bigint,
            SqlVariant::Real(_) | SqlVariant::Double(_) => ColumnType::Real,
            SqlVariant::Text(_) => ColumnType::Varchar(0),
            SqlVariant::Guid(_) => ColumnType::Guid,
            SqlVariant::Date(_) => ColumnType::Date,
            SqlVariant::Time(_) => ColumnType::Time,
            SqlVariant::DateTime(_) => ColumnType::DateTime,
            SqlVariant::Decimal(v) => ColumnType::Decimal(v.precision, v.scale),
            SqlVariant::Binary(_) => ColumnType::VarBinary(0),
        }
    }
}

impl SqlDataBinder for SqlVariant {
    fn column_type() -> ColumnType {
        ColumnType::Varchar(0)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, queue: &mut CallbackQueue) -> Result<()> {
        match value {
            SqlVariant::Null(_) => SqlNullValue::bind_input_parameter(stmt, index, &SqlNullValue, queue),
            SqlVariant::Bool(v) => bool::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Tinyint(v) => i8::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Smallint(v) => i16::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Integer(v) => i32::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Bigint(v) => i64::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Real(v) => f32::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Double(v) => f64::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Text(v) => SqlDynamicString::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Guid(v) => SqlGuid::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Date(v) => NaiveDate::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Time(v) => NaiveTime::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::DateTime(v) => NaiveDateTime::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Decimal(v) => SqlNumeric::bind_input_parameter(stmt, index, v, queue),
            SqlVariant::Binary(v) => {
                super::dynamic_binary::SqlDynamicBinary::bind_input_parameter(stmt, index, &super::dynamic_binary::SqlDynamicBinary::new(v.clone(), 0), queue)
            }
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, queue: &mut CallbackQueue) -> Result<Self> {
        // Without a declared column type this falls back to text, the widest
        // representable form; callers that know the column's real type call
        // `get_column_as` instead (the mapper always does, from schema
        // metadata).
        get_column_as(stmt, index, ColumnType::Varchar(0), queue)
    }

    fn inspect(value: &Self) -> String {
        match value {
            SqlVariant::Null(_) => "NULL".to_string(),
            SqlVariant::Bool(v) => v.to_string(),
            SqlVariant::Tinyint(v) => v.to_string(),
            SqlVariant::Smallint(v) => v.to_string(),
            SqlVariant::Integer(v) => v.to_string(),
            SqlVariant::Bigint(v) => v.to_string(),
            SqlVariant::Real(v) => v.to_string(),
            SqlVariant::Double(v) => v.to_string(),
            SqlVariant::Text(v) => SqlDynamicString::inspect(v),
            SqlVariant::Guid(v) => SqlGuid::inspect(v),
            SqlVariant::Date(v) => v.to_string(),
            SqlVariant::Time(v) => v.to_string(),
            SqlVariant::DateTime(v) => v.to_string(),
            SqlVariant::Decimal(v) => v.to_string_exact(),
            SqlVariant::Binary(v) => format!("<{} bytes>", v.len()),
        }
    }
}

/// Reads column `index` as a [`SqlVariant`], dispatching on `expected` (the
/// declared column type recovered from schema introspection, for
/// field-metadata-driven mapper reads). A `Status::NullFetched` from the
/// underlying binder (see [`crate::error::Status`]) is caught and converted
/// to `SqlVariant::Null(expected)` rather than propagated.
pub fn get_column_as(stmt: &mut RawStatement, index: u16, expected: ColumnType, queue: &mut CallbackQueue) -> Result<SqlVariant> {
    get_column_as_dialect_aware(stmt, None, index, expected, queue)
}

/// Dialect-aware counterpart of [`get_column_as`]: when `dialect` is known,
/// a `Decimal` column is read back through [`SqlNumeric::get_column_dialect_aware`]
/// instead of always taking the `f64` shadow, so PostgreSQL/MySQL round-trip
/// structured `SQL_NUMERIC_STRUCT` values without losing precision.
/// [`crate::statement::Statement::get_variant_column`] is the real entry
/// point; `get_column_as` exists for callers (the `SqlVariant::get_column`
/// trait impl) that have no dialect in scope.
pub fn get_column_as_dialect_aware(
    stmt: &mut RawStatement,
    dialect: Option<&dyn Dialect>,
    index: u16,
    expected: ColumnType,
    queue: &mut CallbackQueue,
) -> Result<SqlVariant> {
    let result = match expected {
        ColumnType::Bool => bool::get_column(stmt, index, queue).map(SqlVariant::Bool),
        ColumnType::Tinyint => i8::get_column(stmt, index, queue).map(SqlVariant::Tinyint),
        ColumnType::Smallint => i16::get_column(stmt, index, queue).map(SqlVariant::Smallint),
        ColumnType::Integer => i32::get_column(stmt, index, queue).map(SqlVariant::Integer),
        ColumnType::Bigint => i64::get_column(stmt, index, queue).map(SqlVariant::Bigint),
        ColumnType::Real => f64::get_column(stmt, index, queue).map(SqlVariant::Double),
        ColumnType::Guid => SqlGuid::get_column(stmt, index, queue).map(SqlVariant::Guid),
        ColumnType::Date => NaiveDate::get_column(stmt, index, queue).map(SqlVariant::Date),
        ColumnType::Time => NaiveTime::get_column(stmt, index, queue).map(SqlVariant::Time),
        ColumnType::DateTime | ColumnType::Timestamp => NaiveDateTime::get_column(stmt, index, queue).map(SqlVariant::DateTime),
        ColumnType::Decimal(precision, scale) => {
            let numeric = match dialect {
                Some(dialect) => SqlNumeric::get_column_dialect_aware(stmt, dialect, index, queue),
                None => SqlNumeric::get_column(stmt, index, queue),
            };
            numeric.map(|mut v| {
                v.precision = precision;
                v.scale = scale;
                SqlVariant::Decimal(v)
            })
        }
        ColumnType::Binary(_) | ColumnType::VarBinary(_) => {
            super::dynamic_binary::SqlDynamicBinary::get_column(stmt, index, queue).map(|v| SqlVariant::Binary(v.bytes))
        }
        _ => SqlDynamicString::get_column(stmt, index, queue).map(SqlVariant::Text),
    };
    match result {
        Err(e) if e.status == Status::NullFetched => Ok(SqlVariant::Null(expected)),
        other => other,
    }
}

/// Dialect-aware counterpart of [`SqlVariant::bind_input_parameter`]: a
/// `Decimal` routes through [`SqlNumeric::bind_input_parameter_dialect_aware`]
/// instead of always taking the `f64` shadow; every other variant is
/// unaffected by dialect and delegates to the plain trait impl.
pub fn bind_input_parameter_dialect_aware(stmt: &mut RawStatement, dialect: &dyn Dialect, index: u16, value: &SqlVariant, queue: &mut CallbackQueue) -> Result<()> {
    if let SqlVariant::Decimal(v) = value {
        return v.bind_input_parameter_dialect_aware(stmt, dialect, index, queue);
    }
    SqlVariant::bind_input_parameter(stmt, index, value, queue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_variant_is_null() {
        assert!(SqlVariant::default().is_null());
    }

    #[test]
    fn inspect_matches_scalar_rendering() {
        assert_eq!(SqlVariant::inspect(&SqlVariant::Integer(42)), "42");
        assert_eq!(SqlVariant::inspect(&SqlVariant::Null(ColumnType::Integer)), "NULL");
    }

    #[test]
    fn column_type_reflects_variant_tag() {
        assert_eq!(SqlVariant::Bigint(7).column_type(), ColumnType::Bigint);
        assert_eq!(SqlVariant::Null(ColumnType::Guid).column_type(), ColumnType::Guid);
    }
}
