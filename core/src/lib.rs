//! lwodbc: a type-safe, compile-time-reflected ORM and data mapper over ODBC.
//!
//! Bridges three boundaries: the C-level, cell-oriented ODBC call interface
//! (binding, indicators, driver capability quirks); dialect differences
//! between backends (identity, pagination, time/decimal binding, string
//! encoding); and the higher-level object graph (records, relations,
//! migrations, backup/restore).
//!
//! The crate is organized as a dependency stack where lower layers never call
//! upward: [`error`]/[`logger`] at the base, [`handle`] wrapping raw ODBC,
//! [`binder`] as the per-type data binding family, [`connection`] and
//! [`statement`] for session/lifecycle, [`query`] for SQL rendering,
//! [`mapper`] for record CRUD and relations, [`schema`] for introspection,
//! [`migration`]/[`migration_lock`] for schema evolution, [`backup`]/
//! [`restore`] for bulk data movement, and [`pool`] for connection reuse.
//! Concrete per-backend [`dialect::Dialect`] implementations live in the
//! sibling `drivers/*` crates.

pub mod backup;
pub mod binder;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod handle;
pub mod logger;
pub mod mapper;
pub mod migration;
pub mod migration_lock;
pub mod pool;
pub mod query;
pub mod restore;
pub mod schema;
pub mod statement;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use connection::{Connection, ConnectionConfig, SqlDsnInfo};
pub use dialect::{Backend, ColumnType, Dialect, Pagination};
pub use error::{Error, Result, Status};
pub use statement::Statement;
