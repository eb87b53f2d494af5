//! GUID binder.
//!
//! Textual form is `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`; the internal byte
//! order mixes little-endian (first three groups) with big-endian (last two),
//! matching `SQLGUID`/`uuid::Uuid`'s Microsoft-compatible `from_fields`.

use std::fmt;
use std::str::FromStr;

use odbc_sys::{CDataType, SqlDataType};
use uuid::Uuid;

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

/// A validated 16-byte GUID bound as `SQL_GUID` where supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqlGuid(Uuid);

impl SqlGuid {
    pub fn parse(text: &str) -> Result<Self> {
        validate_textual_form(text)?;
        Ok(Self(Uuid::parse_str(text)?))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes_le(bytes))
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_bytes_le()
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Generates a fresh random GUID, used by the mapper to auto-assign a
    /// `PrimaryKeyKind::AutoAssign` GUID key left unset.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Checks the four structural invariants a textual GUID must satisfy: length 36,
/// hyphens at fixed positions, version digit in 1..5, variant digit in
/// {8,9,A,B}.
fn validate_textual_form(text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() != 36 {
        return Err(Error::new(format!("GUID must be 36 characters, got {}", bytes.len()), Status::InvalidArguments));
    }
    for &pos in &[8, 13, 18, 23] {
        if bytes[pos] != b'-' {
            return Err(Error::new(format!("GUID missing hyphen at position {pos}"), Status::InvalidArguments));
        }
    }
    let version = bytes[14] as char;
    if !('1'..='5').contains(&version) {
        return Err(Error::new(format!("GUID version digit {version:?} not in 1..=5"), Status::InvalidArguments));
    }
    let variant = bytes[19].to_ascii_uppercase() as char;
    if !matches!(variant, '8' | '9' | 'A' | 'B') {
        return Err(Error::new(format!("GUID variant digit {variant:?} not in {{8,9,A,B}}"), Status::InvalidArguments));
    }
    Ok(())
}

impl fmt::Display for SqlGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated().to_string().to_uppercase())
    }
}

impl FromStr for SqlGuid {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl SqlDataBinder for SqlGuid {
    fn column_type() -> ColumnType {
        ColumnType::Guid
    }

    fn bind_input_parameter(
        stmt: &mut RawStatement,
        index: u16,
        value: &Self,
        _queue: &mut CallbackQueue,
    ) -> Result<()> {
        let bytes = value.to_bytes();
        let mut indicator: isize = 16;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Guid,
                SqlDataType::GUID,
                16,
                0,
                bytes.as_ptr() as odbc_sys::Pointer,
                16,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut bytes = [0u8; 16];
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(index, CDataType::Guid, bytes.as_mut_ptr() as odbc_sys::Pointer, 16, &mut indicator)?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable GUID column {index}"), Status::NullFetched));
        }
        Ok(Self::from_bytes(bytes))
    }

    fn inspect(value: &Self) -> String {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_textual_form() {
        let guid = SqlGuid::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        assert_eq!(guid.to_string(), "550E8400-E29B-41D4-A716-446655440000");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(SqlGuid::parse("550E8400-E29B-41D4-A716-44665544000").is_err());
    }

    #[test]
    fn rejects_hyphen_in_wrong_position() {
        assert!(SqlGuid::parse("550E8400E29B-41D4-A716-446655440000X").is_err());
    }

    #[test]
    fn rejects_bad_version_digit() {
        assert!(SqlGuid::parse("550E8400-E29B-61D4-A716-446655440000").is_err());
    }

    #[test]
    fn rejects_bad_variant_digit() {
        assert!(SqlGuid::parse("550E8400-E29B-41D4-0716-446655440000").is_err());
    }
}
