//! Time binder. Fractional-second support exists only via SQL Server's
//! driver-native `SS_TIME2` extension or via a string bind on
//! PostgreSQL/SQL Server; SQLite and MySQL bind the plain `SQL_TIME_STRUCT`
//! (no fractional seconds). `SqlTime` always carries nanoseconds; callers on
//! backends without fractional support should expect it truncated to whole
//! seconds on round-trip.

use chrono::{NaiveTime, Timelike};
use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::dialect::Dialect;
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

/// SQL Server's ODBC driver extension type code for `SQL_SS_TIME2`, defined
/// outside the ODBC 3.x standard (`sqlncli.h`/`msodbcsql.h`).
const SQL_SS_TIME2: i16 = -154;

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct SqlTimeStruct {
    hour: u16,
    minute: u16,
    second: u16,
}

/// SQL Server's `SS_TIME2` driver extension: adds a 100ns fraction field.
#[repr(C)]
#[derive(Default, Clone, Copy)]
struct SqlSsTime2Struct {
    hour: u16,
    minute: u16,
    second: u16,
    fraction: u32,
}

fn to_plain_wire(time: NaiveTime) -> SqlTimeStruct {
    SqlTimeStruct { hour: time.hour() as u16, minute: time.minute() as u16, second: time.second() as u16 }
}

fn from_plain_wire(wire: &SqlTimeStruct) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(wire.hour as u32, wire.minute as u32, wire.second as u32)
        .ok_or_else(|| Error::new("invalid SQL_TIME_STRUCT", Status::InvalidArguments))
}

fn to_ss_time2_wire(time: NaiveTime) -> SqlSsTime2Struct {
    SqlSsTime2Struct {
        hour: time.hour() as u16,
        minute: time.minute() as u16,
        second: time.second() as u16,
        fraction: time.nanosecond(),
    }
}

fn from_ss_time2_wire(wire: &SqlSsTime2Struct) -> Result<NaiveTime> {
    NaiveTime::from_hms_nano_opt(wire.hour as u32, wire.minute as u32, wire.second as u32, wire.fraction)
        .ok_or_else(|| Error::new("invalid SQL_SS_TIME2_STRUCT", Status::InvalidArguments))
}

impl SqlDataBinder for NaiveTime {
    fn column_type() -> ColumnType {
        ColumnType::Time
    }

    /// Binds the plain (non-fractional) `SQL_TIME_STRUCT`. Callers on
    /// backends that preserve fractional seconds should instead go through
    /// [`bind_time_preserving_fraction`], which the `connection`/`statement`
    /// layer selects based on the active dialect.
    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let wire = to_plain_wire(*value);
        let mut indicator: isize = std::mem::size_of::<SqlTimeStruct>() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Time,
                SqlDataType::TIME,
                8,
                0,
                &wire as *const SqlTimeStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlTimeStruct>() as isize,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut wire = SqlTimeStruct::default();
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(
                index,
                CDataType::Time,
                &mut wire as *mut SqlTimeStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlTimeStruct>() as isize,
                &mut indicator,
            )?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable time column {index}"), Status::NullFetched));
        }
        from_plain_wire(&wire)
    }

    fn inspect(value: &Self) -> String {
        value.format("%H:%M:%S%.f").to_string()
    }
}

/// Binds a time value preserving fractional seconds on backends that support
/// it: SQL Server via `SS_TIME2`, PostgreSQL via a string bind.
/// SQLite/MySQL fall back to the plain struct.
pub fn bind_time_preserving_fraction(
    dialect: &dyn Dialect,
    stmt: &mut RawStatement,
    index: u16,
    value: NaiveTime,
    queue: &mut CallbackQueue,
) -> Result<()> {
    use crate::dialect::Backend;
    match dialect.backend() {
        Backend::SqlServer => {
            let wire = to_ss_time2_wire(value);
            let mut indicator: isize = std::mem::size_of::<SqlSsTime2Struct>() as isize;
            unsafe {
                stmt.bind_input_parameter(
                    index,
                    CDataType::Time,
                    SqlDataType(SQL_SS_TIME2),
                    16,
                    7,
                    &wire as *const SqlSsTime2Struct as odbc_sys::Pointer,
                    std::mem::size_of::<SqlSsTime2Struct>() as isize,
                    &mut indicator,
                )
            }
        }
        Backend::PostgreSql => {
            let text = value.format("%H:%M:%S%.f").to_string();
            crate::binder::dynamic_string::bind_ansi_str(stmt, index, &text, queue)
        }
        Backend::Sqlite | Backend::MySql => NaiveTime::bind_input_parameter(stmt, index, &value, queue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_wire_round_trip() {
        let t = NaiveTime::from_hms_opt(13, 45, 7).unwrap();
        assert_eq!(from_plain_wire(&to_plain_wire(t)).unwrap(), t);
    }

    #[test]
    fn ss_time2_preserves_fraction() {
        let t = NaiveTime::from_hms_nano_opt(1, 2, 3, 123_000_000).unwrap();
        assert_eq!(from_ss_time2_wire(&to_ss_time2_wire(t)).unwrap(), t);
    }
}
