//! The `Record` trait and the field metadata behind it: compile-time field
//! reflection. A type becomes mappable by describing its
//! columns once, through [`Record::descriptors`], and exposing a
//! [`SqlVariant`] view of each field through `get_field`/`set_field`; the
//! generic [`super::Mapper`] never needs to know the concrete field types.
//!
//! This crate ships the trait and the conversion glue
//! ([`VariantConvert`]) rather than a derive macro: see DESIGN.md's Open
//! Question resolution for why the per-record impl stays hand-written.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::binder::guid::SqlGuid;
use crate::binder::numeric::SqlNumeric;
use crate::binder::variant::SqlVariant;
use crate::connection::Connection;
use crate::dialect::ColumnType;
use crate::error::{Error, Result, Status};
use crate::mapper::field::PrimaryKeyKind;

/// A foreign key's target, used both for `ALTER TABLE ... ADD FOREIGN KEY`
/// synthesis and (eventually) relation loader wiring.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyRef {
    pub ref_table: &'static str,
    pub ref_column: &'static str,
}

/// One column's worth of metadata, as if reflected at compile time from a
/// `Field<T>` member.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// The Rust member name — used only for diagnostics.
    pub name: &'static str,
    /// The column name actually rendered into SQL.
    pub column: &'static str,
    pub column_type: ColumnType,
    pub primary_key: PrimaryKeyKind,
    pub nullable: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, column: &'static str, column_type: ColumnType) -> Self {
        Self { name, column, column_type, primary_key: PrimaryKeyKind::None, nullable: true, foreign_key: None }
    }

    pub const fn primary_key(mut self, kind: PrimaryKeyKind) -> Self {
        self.primary_key = kind;
        self.nullable = false;
        self
    }

    pub const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn references(mut self, ref_table: &'static str, ref_column: &'static str) -> Self {
        self.foreign_key = Some(ForeignKeyRef { ref_table, ref_column });
        self
    }
}

/// Implemented once per mapped type; every operation the generic
/// [`super::Mapper`] performs (schema synthesis, CRUD, row construction)
/// goes through this trait alone.
pub trait Record: Sized {
    /// The table this record maps to.
    fn table_name() -> &'static str;

    /// Column metadata, in the same order `get_field`/`set_field` index by.
    fn descriptors() -> &'static [FieldDescriptor];

    /// Reads field `index` as a runtime-typed value.
    fn get_field(&self, index: usize) -> SqlVariant;

    /// Writes field `index` from a runtime-typed value (used when populating
    /// a record from a fetched row).
    fn set_field(&mut self, index: usize, value: SqlVariant) -> Result<()>;

    /// Whether field `index` has been assigned since the last
    /// `clear_modified` — the mapper's basis for minimal `UPDATE` sets.
    fn is_field_modified(&self, index: usize) -> bool;

    /// Clears every field's modified flag, called after a successful
    /// `Create`/`Update`.
    fn clear_modified(&mut self);

    /// Wires relation loaders after a row has been fully populated. The
    /// default does nothing; types with `BelongsTo`/`HasMany`/... fields
    /// override it to install loaders bound to `conn` and this record's
    /// key values (see DESIGN.md — relation wiring is hand-written, not
    /// derived).
    fn wire_relations(&mut self, _conn: &Connection) {}

    /// The index of the single primary-key field, if any. At most one field
    /// may declare a `PrimaryKeyKind` other than `None`.
    fn primary_key_index() -> Option<usize> {
        Self::descriptors().iter().position(|d| d.primary_key != PrimaryKeyKind::None)
    }
}

/// Bridges a field's native Rust type to/from [`SqlVariant`] so a derive-free
/// `Record` impl can still implement `get_field`/`set_field` with one match
/// arm per field instead of hand-writing the binder dispatch.
pub trait VariantConvert: Sized {
    fn to_variant(&self) -> SqlVariant;
    fn from_variant(value: SqlVariant) -> Result<Self>;
}

fn type_mismatch(expected: &str, got: &SqlVariant) -> Error {
    Error::new(format!("expected {expected}, got {got:?}"), Status::InvalidArguments)
}

macro_rules! impl_variant_convert_int {
    ($ty:ty, $variant:ident) => {
        impl VariantConvert for $ty {
            fn to_variant(&self) -> SqlVariant {
                SqlVariant::$variant(*self as _)
            }
            fn from_variant(value: SqlVariant) -> Result<Self> {
                match value {
                    SqlVariant::Tinyint(v) => Ok(v as $ty),
                    SqlVariant::Smallint(v) => Ok(v as $ty),
                    SqlVariant::Integer(v) => Ok(v as $ty),
                    SqlVariant::Bigint(v) => Ok(v as $ty),
                    other => Err(type_mismatch(stringify!($ty), &other)),
                }
            }
        }
    };
}

impl_variant_convert_int!(i8, Tinyint);
impl_variant_convert_int!(i16, Smallint);
impl_variant_convert_int!(i32, Integer);
impl_variant_convert_int!(i64, Bigint);
impl_variant_convert_int!(u8, Tinyint);
impl_variant_convert_int!(u16, Smallint);
impl_variant_convert_int!(u32, Integer);
impl_variant_convert_int!(u64, Bigint);

impl VariantConvert for bool {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Bool(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Bool(v) => Ok(v),
            other => Err(type_mismatch("bool", &other)),
        }
    }
}

impl VariantConvert for f32 {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Real(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Real(v) => Ok(v),
            SqlVariant::Double(v) => Ok(v as f32),
            other => Err(type_mismatch("f32", &other)),
        }
    }
}

impl VariantConvert for f64 {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Double(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Double(v) => Ok(v),
            SqlVariant::Real(v) => Ok(v as f64),
            other => Err(type_mismatch("f64", &other)),
        }
    }
}

impl VariantConvert for String {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::from(self.as_str())
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Text(v) => Ok(v.value),
            other => Err(type_mismatch("String", &other)),
        }
    }
}

impl VariantConvert for SqlGuid {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Guid(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Guid(v) => Ok(v),
            other => Err(type_mismatch("SqlGuid", &other)),
        }
    }
}

impl VariantConvert for NaiveDate {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Date(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Date(v) => Ok(v),
            other => Err(type_mismatch("NaiveDate", &other)),
        }
    }
}

impl VariantConvert for NaiveTime {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Time(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Time(v) => Ok(v),
            other => Err(type_mismatch("NaiveTime", &other)),
        }
    }
}

impl VariantConvert for NaiveDateTime {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::DateTime(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::DateTime(v) => Ok(v),
            other => Err(type_mismatch("NaiveDateTime", &other)),
        }
    }
}

impl VariantConvert for SqlNumeric {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Decimal(*self)
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Decimal(v) => Ok(v),
            other => Err(type_mismatch("SqlNumeric", &other)),
        }
    }
}

impl VariantConvert for Vec<u8> {
    fn to_variant(&self) -> SqlVariant {
        SqlVariant::Binary(self.clone())
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        match value {
            SqlVariant::Binary(v) => Ok(v),
            other => Err(type_mismatch("Vec<u8>", &other)),
        }
    }
}

impl<T: VariantConvert> VariantConvert for Option<T> {
    fn to_variant(&self) -> SqlVariant {
        match self {
            Some(v) => v.to_variant(),
            None => SqlVariant::Null(ColumnType::Varchar(0)),
        }
    }
    fn from_variant(value: SqlVariant) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_variant(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_integers() {
        assert_eq!(i64::from_variant(42i64.to_variant()).unwrap(), 42);
        assert_eq!(u32::from_variant(7u32.to_variant()).unwrap(), 7);
    }

    #[test]
    fn option_none_is_null_variant() {
        let none: Option<i32> = None;
        assert!(none.to_variant().is_null());
        assert_eq!(Option::<i32>::from_variant(SqlVariant::Null(ColumnType::Integer)).unwrap(), None);
    }

    #[test]
    fn option_some_round_trips_through_inner_type() {
        let some = Some(99i32);
        assert_eq!(Option::<i32>::from_variant(some.to_variant()).unwrap(), Some(99));
    }

    #[test]
    fn mismatched_variant_is_rejected() {
        assert!(i32::from_variant(SqlVariant::Text(crate::binder::dynamic_string::SqlDynamicString::new("x", 0))).is_err());
    }
}
