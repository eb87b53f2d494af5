//! Large-text binder for CLOB-shaped columns, sharing the dynamic string's
//! growth loop but declared with
//! `ColumnType::Text` so schema synthesis picks the dialect's unbounded text
//! type instead of a bounded `VARCHAR`.

use super::dynamic_string::SqlDynamicString;
use super::{CallbackQueue, ColumnType, SqlDataBinder};
use crate::error::Result;
use crate::handle::RawStatement;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlText(pub SqlDynamicString);

impl SqlText {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SqlDynamicString::new(value, 0))
    }
}

impl std::ops::Deref for SqlText {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0.value
    }
}

impl SqlDataBinder for SqlText {
    fn column_type() -> ColumnType {
        ColumnType::Text(0)
    }

    fn bind_input_parameter(stmt: &mut RawStatement, index: u16, value: &Self, queue: &mut CallbackQueue) -> Result<()> {
        SqlDynamicString::bind_input_parameter(stmt, index, &value.0, queue)
    }

    fn get_column(stmt: &mut RawStatement, index: u16, queue: &mut CallbackQueue) -> Result<Self> {
        Ok(Self(SqlDynamicString::get_column(stmt, index, queue)?))
    }

    fn inspect(value: &Self) -> String {
        SqlDynamicString::inspect(&value.0)
    }
}
