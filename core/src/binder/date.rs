//! Date binder: exact, no dialect variation. Only DateTime/Time/Decimal vary
//! per backend; `SQL_DATE` round-trips cleanly everywhere.

use chrono::NaiveDate;
use odbc_sys::{CDataType, SqlDataType};

use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct SqlDateStruct {
    year: i16,
    month: u16,
    day: u16,
}

fn to_wire(date: NaiveDate) -> SqlDateStruct {
    use chrono::Datelike;
    SqlDateStruct { year: date.year() as i16, month: date.month() as u16, day: date.day() as u16 }
}

fn from_wire(wire: &SqlDateStruct) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(wire.year as i32, wire.month as u32, wire.day as u32)
        .ok_or_else(|| Error::new("invalid SQL_DATE_STRUCT", Status::InvalidArguments))
}

impl SqlDataBinder for NaiveDate {
    fn column_type() -> ColumnType {
        ColumnType::Date
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, _queue: &mut CallbackQueue) -> Result<()> {
        let wire = to_wire(*value);
        let mut indicator: isize = std::mem::size_of::<SqlDateStruct>() as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Date,
                SqlDataType::DATE,
                10,
                0,
                &wire as *const SqlDateStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlDateStruct>() as isize,
                &mut indicator,
            )
        }
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let mut wire = SqlDateStruct::default();
        let mut indicator: isize = 0;
        unsafe {
            stmt.get_data(
                index,
                CDataType::Date,
                &mut wire as *mut SqlDateStruct as odbc_sys::Pointer,
                std::mem::size_of::<SqlDateStruct>() as isize,
                &mut indicator,
            )?;
        }
        if indicator == crate::handle::SQL_NULL_DATA {
            return Err(Error::new(format!("NULL fetched into non-nullable date column {index}"), Status::NullFetched));
        }
        from_wire(&wire)
    }

    fn inspect(value: &Self) -> String {
        value.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let wire = to_wire(d);
        assert_eq!(from_wire(&wire).unwrap(), d);
    }
}
