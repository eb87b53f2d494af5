//! Dynamic, capacity-bounded binary blob binder, sharing the
//! same truncation-growth loop as [`super::dynamic_string`].

use odbc_sys::{CDataType, SqlDataType};

use super::{fetch_growing, CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::{Error, Result, Status};
use crate::handle::RawStatement;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlDynamicBinary {
    pub max_capacity: usize,
    pub bytes: Vec<u8>,
}

impl SqlDynamicBinary {
    pub fn new(bytes: impl Into<Vec<u8>>, max_capacity: usize) -> Self {
        Self { max_capacity, bytes: bytes.into() }
    }
}

impl SqlDataBinder for SqlDynamicBinary {
    fn column_type() -> ColumnType {
        ColumnType::VarBinary(0)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, queue: &mut CallbackQueue) -> Result<()> {
        let owned = std::rc::Rc::new(value.bytes.clone());
        let owned_for_bind = owned.clone();
        let len = owned.len();
        let mut indicator: isize = len as isize;
        unsafe {
            stmt.bind_input_parameter(
                index,
                CDataType::Binary,
                SqlDataType::VARBINARY,
                len.max(1) as u32,
                0,
                owned_for_bind.as_ptr() as odbc_sys::Pointer,
                len as isize,
                &mut indicator,
            )?;
        }
        queue.push_post_execute(move |_stmt| {
            let _keep_alive = &owned;
            Ok(())
        });
        Ok(())
    }

    fn get_column(stmt: &mut RawStatement, index: u16, _queue: &mut CallbackQueue) -> Result<Self> {
        let bytes = fetch_growing(256, |buf| unsafe {
            let mut indicator: isize = 0;
            let ret = stmt.get_data(index, CDataType::Binary, buf.as_mut_ptr() as odbc_sys::Pointer, buf.len() as isize, &mut indicator)?;
            let had_more = ret == odbc_sys::SqlReturn::SUCCESS_WITH_INFO;
            Ok((indicator, had_more))
        })?;
        let Some(bytes) = bytes else {
            return Err(Error::new(format!("NULL fetched into non-nullable binary column {index}"), Status::NullFetched));
        };
        Ok(Self { max_capacity: 0, bytes })
    }

    fn inspect(value: &Self) -> String {
        format!("<{} bytes>", value.bytes.len())
    }
}
