//! DateTime/Timestamp binder. All four backends bind
//! `SQL_TIMESTAMP` with column size 27, scale 7 — the legacy SQL Server
//! driver instead needs a `DescribeParam` probe first, handled by the
//! `statement` layer since it requires a round-trip to the driver that this
//! per-value binder has no handle to negotiate).

use chrono::{Datelike, NaiveDateTime, Timelike};
use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct SqlTimestampStruct {
    year: i16,
    month: u16,
    day: u16,
    hour: u16,
    minute: u16,
    second: u16,
    fraction: u32,
}

fn to_wire(dt: NaiveDateTime) -> SqlTimestampStruct {
    SqlTimestampStruct {
        year: dt.year() as i16,
        month: dt.month() as u16,
        day: dt.day() as u16,
        hour: dt.hour() as u16,
        minute: dt.minute() as u16,
        second: dt.second() as u16,
        fraction: dt.and_utc().timestamp_subsec_nanos(),
    }
}

fn from_wire(wire: &SqlTimestampStruct) -> Result<NaiveDateTime> {
    let date = chrono::NaiveDate::from_ymd_opt(wire.year as i32, wire.month as u32, wire.day as u32)
        .ok_or_else(|| Error::new("invalid SQL_TIMESTAMP_STRUCT date", Status::InvalidArguments))?;
    let time = chrono::NaiveTime::from_hms_nano_opt(wire.hour as u32, wire.minute as u32, wire.second as u32, wire.fraction)
        .ok_or_else(|| Error::new("invalid SQL_TIMESTAMP_STRUCT time", Status::InvalidArguments))?;
    Ok(NaiveDateTime::new(date, time))
}

const COLUMN_SIZE: u32 = 27;
const DECIMAL_DIGITS: i16 = 7;

impl SqlDataBinder for NaiveDateTime {
    fn column_type() -> ColumnType {
        ColumnType::Timestamp
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let wire = to_wire(*value);
        let mut indicator: isize = std::mem::size_of::<SqlTimestampStruct>() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Timestamp,
                SqlDataType::TIMESTAMP,
                COLUMN_SIZE,
                DECIMAL_DIGITS,
                &wire as *const SqlTimestampStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlTimestampStruct>() as isize,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut wire = SqlTimestampStruct::default();
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(
                index,
                CDataType::Timestamp,
                &mut wire as *mut SqlTimestampStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlTimestampStruct>() as isize,
                &mut indicator,
            )?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable timestamp column {index}"), Status::NullFetched));
        }
        from_wire(&wire)
    }

    fn inspect(value: &Self) -> String {
        value.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}

/// Formats a timestamp the way the backup engine's wire format wants:
/// `YYYY-MM-DDTHH:MM:SS.mmm`.
pub fn to_iso8601_millis(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_milli_opt(13, 0, 0, 250)
            .unwrap();
        assert_eq!(from_wire(&to_wire(dt)).unwrap(), dt);
    }

    #[test]
    fn iso8601_millis_format() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 6)
            .unwrap();
        assert_eq!(to_iso8601_millis(dt), "2024-01-02T03:04:05.006");
    }
}
