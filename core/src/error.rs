//! Error and result types.
//!
//! A single flat `Error` struct (one shape, not an enum-per-kind),
//! with `From` bridges from the crates that can fail underneath a binder or a
//! driver call.

use std::ffi::NulError;
use std::fmt::Display;
use std::panic::Location;
use std::str::Utf8Error;

/// Coarse classification of an ODBC/driver failure, independent of backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// SQLSTATE class 08, or HYT00/HYT01: connection lost or timed out. Transient.
    Connection,
    /// SQLSTATE class 40, or a backend's native deadlock/lock-busy code. Transient.
    TransactionConflict,
    /// Unique-constraint violation.
    UniqueViolation,
    /// Foreign-key violation.
    ForeignKeyViolation,
    /// Table already exists / does not exist.
    TableExists,
    TableMissing,
    /// Invalid parameter count, non-recoverable truncation, NULL fetched into
    /// a binder that has no NULL representation of its own.
    /// Programmer error: fatal, never retried.
    InvalidArguments,
    /// A nullable read produced SQL NULL. Recoverable: callers that accept
    /// NULL (variant reads, `Option<T>` fields) match on this and substitute
    /// their own empty representation instead of propagating the error.
    NullFetched,
    /// Statement/connection used in a state that does not allow the call
    /// (e.g. `Execute` on an unprepared statement with a live cursor).
    InvalidState,
    /// `Fetch` called with no open cursor, or any other call made out of the
    /// sequence the statement lifecycle requires.
    SequenceError,
    /// A referenced table, row, or catalog object does not exist.
    NotFound,
    /// A migration failed to apply or revert.
    MigrationFailed,
    /// A migration lock was not acquired within its timeout.
    LockTimeout,
    /// Anything else surfaced verbatim from the driver.
    Driver,
}

/// A SQL error, carrying the diagnostic record the driver reported plus a
/// capture-site hint for programmer errors.
#[derive(Debug)]
pub struct Error {
    pub message: String,
    pub status: Status,
    pub sqlstate: [u8; 5],
    pub native_code: i32,
    pub location: Option<&'static Location<'static>>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[track_caller]
    pub fn new(message: impl Into<String>, status: Status) -> Self {
        Self {
            message: message.into(),
            status,
            sqlstate: *b"00000",
            native_code: 0,
            location: Some(Location::caller()),
        }
    }

    /// Builds an error from a driver diagnostic record (SQLGetDiagRec output).
    #[track_caller]
    pub fn from_diag_parts(sqlstate: [u8; 5], native_code: i32, message: String) -> Self {
        let status = classify_sqlstate(&sqlstate, native_code);
        let status = refine_from_message(status, &message);
        Self {
            message,
            status,
            sqlstate,
            native_code,
            location: Some(Location::caller()),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.status, Status::Connection | Status::TransactionConflict)
    }
}

/// Classifies a SQLSTATE/native-code pair into a backend-independent [`Status`].
fn classify_sqlstate(sqlstate: &[u8; 5], native_code: i32) -> Status {
    let state = std::str::from_utf8(sqlstate).unwrap_or("00000");
    match &state[0..2] {
        "08" => return Status::Connection,
        "40" => return Status::TransactionConflict,
        _ => {}
    }
    if state == "HYT00" || state == "HYT01" {
        return Status::Connection;
    }
    match state {
        "23505" => Status::UniqueViolation,
        "23503" => Status::ForeignKeyViolation,
        "42S01" => Status::TableExists,
        "42S02" => Status::TableMissing,
        _ => match native_code {
            2627 | 2601 => Status::UniqueViolation,
            1062 => Status::UniqueViolation,
            547 | 1451 | 1452 => Status::ForeignKeyViolation,
            1205 | 1222 => Status::TransactionConflict,
            _ => Status::Driver,
        },
    }
}

/// SQLite (and some MySQL drivers) surface several taxonomy entries only as
/// message text rather than a dedicated SQLSTATE, so a
/// SQLSTATE-only classification would misreport them as `Driver`.
fn refine_from_message(status: Status, message: &str) -> Status {
    if status != Status::Driver {
        return status;
    }
    if message.contains("database is locked") {
        Status::TransactionConflict
    } else if message.contains("UNIQUE constraint failed") {
        Status::UniqueViolation
    } else if message.contains("FOREIGN KEY constraint failed") {
        Status::ForeignKeyViolation
    } else if message.contains("already exists") {
        Status::TableExists
    } else if message.contains("no such table") {
        Status::TableMissing
    } else {
        status
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = std::str::from_utf8(&self.sqlstate).unwrap_or("?????");
        write!(f, "{} ({}) - {}", state, self.native_code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<NulError> for Error {
    #[track_caller]
    fn from(value: NulError) -> Self {
        Error::new(
            format!("Interior null byte at position {}", value.nul_position()),
            Status::InvalidArguments,
        )
    }
}

impl From<Utf8Error> for Error {
    #[track_caller]
    fn from(value: Utf8Error) -> Self {
        Error::new(format!("Invalid UTF-8: {value}"), Status::InvalidArguments)
    }
}

impl From<rust_decimal::Error> for Error {
    #[track_caller]
    fn from(value: rust_decimal::Error) -> Self {
        Error::new(format!("Invalid decimal: {value}"), Status::InvalidArguments)
    }
}

impl From<uuid::Error> for Error {
    #[track_caller]
    fn from(value: uuid::Error) -> Self {
        Error::new(format!("Invalid GUID: {value}"), Status::InvalidArguments)
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(value: std::io::Error) -> Self {
        Error::new(format!("I/O error: {value}"), Status::Driver)
    }
}

impl From<zip::result::ZipError> for Error {
    #[track_caller]
    fn from(value: zip::result::ZipError) -> Self {
        Error::new(format!("ZIP error: {value}"), Status::Driver)
    }
}

/// A migration failure, carrying the extra context a migration runner needs
/// to report a precise cause.
#[derive(Debug, thiserror::Error)]
#[error("migration {title:?} ({timestamp}) failed at step {step}: {source}\n  -- {statement}")]
pub struct MigrationError {
    pub title: String,
    pub timestamp: i64,
    pub step: usize,
    pub statement: String,
    #[source]
    pub source: Error,
}

impl From<MigrationError> for Error {
    #[track_caller]
    fn from(value: MigrationError) -> Self {
        Error { message: value.to_string(), status: Status::MigrationFailed, sqlstate: value.source.sqlstate, native_code: value.source.native_code, location: Some(Location::caller()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connection_class() {
        assert_eq!(classify_sqlstate(b"08001", 0), Status::Connection);
        assert_eq!(classify_sqlstate(b"40001", 0), Status::TransactionConflict);
    }

    #[test]
    fn classifies_native_codes_per_backend() {
        assert_eq!(classify_sqlstate(b"23000", 2627), Status::UniqueViolation);
        assert_eq!(classify_sqlstate(b"23000", 1062), Status::UniqueViolation);
        assert_eq!(classify_sqlstate(b"23000", 547), Status::ForeignKeyViolation);
        assert_eq!(classify_sqlstate(b"23000", 1205), Status::TransactionConflict);
    }

    #[test]
    fn refines_sqlite_message_only_errors() {
        assert_eq!(refine_from_message(Status::Driver, "database is locked"), Status::TransactionConflict);
        assert_eq!(refine_from_message(Status::Driver, "UNIQUE constraint failed: t.id"), Status::UniqueViolation);
        assert_eq!(
            refine_from_message(Status::Driver, "FOREIGN KEY constraint failed"),
            Status::ForeignKeyViolation
        );
    }

    #[test]
    fn display_renders_sqlstate_native_and_message() {
        let err = Error::from_diag_parts(*b"08001", 5, "connection timed out".into());
        assert_eq!(err.to_string(), "08001 (5) - connection timed out");
    }
}
