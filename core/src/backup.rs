//! Backup engine: enumerates tables via schema introspection,
//! extracts each into chunked, checksummed records inside a ZIP container,
//! resumable on transient driver errors via stable ordering plus `OFFSET`.
//!
//! A worker-per-connection pool drains a shared table queue; each worker
//! holds one dedicated connection for its
//! lifetime and flushes chunks into a shared ZIP writer guarded by one mutex,
//! with chunk checksums recorded in a separately-guarded side map.

use std::collections::{HashMap, VecDeque};
use std::io::{Seek, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::binder::dynamic_binary::SqlDynamicBinary;
use crate::binder::dynamic_string::SqlDynamicString;
use crate::binder::guid::SqlGuid;
use crate::binder::numeric::SqlNumeric;
use crate::binder::{CallbackQueue, SqlDataBinder};
use crate::connection::retry::RetryPolicy;
use crate::connection::{Connection, ConnectionConfig};
use crate::dialect::{Backend, Dialect, Pagination};
use crate::error::{Error, Result, Status};
use crate::handle::{Environment, RawStatement};
use crate::schema;

/// A backed-up column value collapsed to its serialization category, rather
/// than kept in its original typed form
/// — a decimal stored as text loses nothing a restore needs, and collapsing
/// here keeps the wire format independent of the binder family that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackupValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackupRow(pub Vec<BackupValue>);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BackupChunk {
    table: String,
    rows: Vec<BackupRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Binary,
    Bool,
    Integer,
    Real,
    Decimal,
    Guid,
    Date,
    Time,
    DateTime,
    Text,
}

fn categorize(sql_type_name: &str) -> Category {
    let t = sql_type_name.to_ascii_lowercase();
    if t.contains("binary") || t.contains("blob") {
        Category::Binary
    } else if t.contains("bit") || t.contains("bool") {
        Category::Bool
    } else if t.contains("uniqueidentifier") || t.contains("guid") {
        Category::Guid
    } else if t.contains("numeric") || t.contains("decimal") {
        Category::Decimal
    } else if t.contains("datetime") || t.contains("timestamp") {
        Category::DateTime
    } else if t.contains("date") {
        Category::Date
    } else if t.contains("time") {
        Category::Time
    } else if t.contains("float") || t.contains("real") || t.contains("double") {
        Category::Real
    } else if t.contains("int") {
        Category::Integer
    } else {
        Category::Text
    }
}

/// Renders the column expression used in the ordered extraction `SELECT`.
/// Decimal columns are cast to text so precision survives the round trip.
/// `VARCHAR(41)` covers the widest decimal this crate ever declares
/// (`DECIMAL(38, _)`, plus three characters of slack for sign and point) on
/// SQL Server via `CONVERT`, elsewhere via the ANSI `CAST ... AS VARCHAR`
/// equivalent.
fn select_expr(dialect: &dyn Dialect, table: &str, column: &str, category: Category) -> String {
    let qualified = dialect.qualified_column(table, column);
    if category == Category::Decimal {
        match dialect.backend() {
            Backend::SqlServer => format!("CONVERT(VARCHAR(41), {qualified})"),
            _ => format!("CAST({qualified} AS VARCHAR(41))"),
        }
    } else {
        qualified
    }
}

fn read_value(stmt: &mut RawStatement, index: u16, category: Category) -> Result<BackupValue> {
    let mut queue = CallbackQueue::new();
    match category {
        Category::Bool => match bool::get_column(stmt, index, &mut queue) {
            Ok(v) => Ok(BackupValue::Bool(v)),
            Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
            Err(e) => Err(e),
        },
        Category::Integer => match i64::get_column(stmt, index, &mut queue) {
            Ok(v) => Ok(BackupValue::Integer(v)),
            Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
            Err(e) => Err(e),
        },
        Category::Real => match f64::get_column(stmt, index, &mut queue) {
            Ok(v) => Ok(BackupValue::Real(v)),
            Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
            Err(e) => Err(e),
        },
        Category::Binary => match SqlDynamicBinary::get_column(stmt, index, &mut queue) {
            Ok(v) => Ok(BackupValue::Binary(v.bytes)),
            Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
            Err(e) => Err(e),
        },
        Category::Guid => match SqlGuid::get_column(stmt, index, &mut queue) {
            Ok(v) => Ok(BackupValue::Text(v.to_string())),
            Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
            Err(e) => Err(e),
        },
        // Decimal/Date/Time/DateTime/Text all arrive as text: decimals because
        // the SELECT already cast them, the rest because the dynamic-string
        // binder is the portable fetch path for anything rendered as a
        // driver-formatted ISO-8601 string.
        Category::Decimal | Category::Date | Category::Time | Category::DateTime | Category::Text => {
            match SqlDynamicString::get_column(stmt, index, &mut queue) {
                Ok(v) => Ok(BackupValue::Text(v.value)),
                Err(e) if e.status == Status::NullFetched => Ok(BackupValue::Null),
                Err(e) => Err(e),
            }
        }
    }
}

fn sanitize_table_name(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}

/// Tuning knobs for [`BackupEngine::run`]: chunk size and compression method,
/// with defaults matching this crate's ambient configuration layer.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub chunk_byte_budget: usize,
    pub rows_per_page: u64,
    pub retry: RetryPolicy,
    pub worker_count: usize,
    pub compression: zip::CompressionMethod,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            chunk_byte_budget: 4 * 1024 * 1024,
            rows_per_page: 1000,
            retry: RetryPolicy::default(),
            worker_count: 1,
            compression: zip::CompressionMethod::Deflated,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackupSummary {
    pub tables_backed_up: Vec<String>,
    /// `table -> ordered chunk SHA-256 hex digests`, the checksum side map
    /// recorded alongside the ZIP entries.
    pub chunk_checksums: HashMap<String, Vec<String>>,
}

struct ColumnPlan {
    name: String,
    category: Category,
}

fn plan_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnPlan>> {
    schema::list_columns(conn, table)
        .map(|cols| cols.into_iter().map(|c| ColumnPlan { category: categorize(&c.sql_type_name), name: c.name }).collect())
}

fn order_columns(conn: &Connection, table: &str, columns: &[ColumnPlan]) -> Result<Vec<String>> {
    let pks = schema::list_primary_keys(conn, table)?;
    if !pks.is_empty() {
        let mut pks = pks;
        pks.sort_by_key(|pk| pk.key_sequence);
        Ok(pks.into_iter().map(|pk| pk.column_name).collect())
    } else if let Some(first) = columns.first() {
        Ok(vec![first.name.clone()])
    } else {
        Ok(Vec::new())
    }
}

fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let sql = conn.dialect().count_query(&format!("FROM {}", conn.dialect().quote_identifier(table)));
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    stmt.fetch()?;
    i64::get_column(&mut stmt, 1, &mut CallbackQueue::new())
}

/// Extracts rows `[offset, offset + page_size)` of `table` in stable order,
/// returning the decoded rows. An empty result means the table is exhausted.
fn extract_page(conn: &Connection, table: &str, columns: &[ColumnPlan], order_by: &[String], offset: u64, page_size: u64) -> Result<Vec<BackupRow>> {
    let dialect = conn.dialect();
    let select_list = columns.iter().map(|c| select_expr(dialect, table, &c.name, c.category)).collect::<Vec<_>>().join(", ");
    let order_clause = if order_by.is_empty() {
        String::new()
    } else {
        crate::dialect::render_order_by(dialect, table, &order_by.iter().map(String::as_str).collect::<Vec<_>>())
    };
    let core = format!("SELECT {select_list} FROM {}", dialect.quote_identifier(table));
    let sql = dialect.apply_pagination(&core, Pagination::Range { offset, limit: page_size }, &order_clause);
    let mut stmt = RawStatement::allocate(conn.raw())?;
    stmt.exec_direct(&sql)?;
    let mut rows = Vec::new();
    while stmt.fetch()? {
        let mut row = Vec::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            row.push(read_value(&mut stmt, (i + 1) as u16, col.category)?);
        }
        rows.push(BackupRow(row));
    }
    Ok(rows)
}

/// Runs the backup engine against `tables` (all user tables if `None`),
/// writing the ZIP container to `writer`. Single-threaded when
/// `options.worker_count == 1`; otherwise fans out across
/// `options.worker_count` dedicated connections.
pub struct BackupEngine {
    env: Arc<Environment>,
    config: ConnectionConfig,
    dialect: Arc<dyn Dialect>,
    options: BackupOptions,
}

impl BackupEngine {
    pub fn new(env: Arc<Environment>, config: ConnectionConfig, dialect: Arc<dyn Dialect>, options: BackupOptions) -> Self {
        Self { env, config, dialect, options }
    }

    pub fn run<W: Write + Seek + Send + 'static>(&self, writer: W, tables: Option<Vec<String>>) -> Result<BackupSummary> {
        let conn = Connection::open(self.env.clone(), &self.config, self.dialect.clone())?;
        let table_names = match tables {
            Some(t) => t,
            None => schema::list_tables(&conn)?.into_iter().map(|t| t.name).collect(),
        };
        drop(conn);

        let queue = Arc::new(Mutex::new(VecDeque::from(table_names)));
        let zip = Arc::new(Mutex::new(zip::ZipWriter::new(writer)));
        let checksums: Arc<Mutex<HashMap<String, Vec<String>>>> = Arc::new(Mutex::new(HashMap::new()));
        let backed_up: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let first_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

        let worker_count = self.options.worker_count.max(1);
        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let queue = Arc::clone(&queue);
                let zip = Arc::clone(&zip);
                let checksums = Arc::clone(&checksums);
                let backed_up = Arc::clone(&backed_up);
                let first_error = Arc::clone(&first_error);
                scope.spawn(move || {
                    let mut conn = match Connection::open(self.env.clone(), &self.config, self.dialect.clone()) {
                        Ok(c) => c,
                        Err(e) => {
                            first_error.lock().unwrap().get_or_insert(e);
                            return;
                        }
                    };
                    loop {
                        let table = {
                            let mut q = queue.lock().unwrap();
                            q.pop_front()
                        };
                        let Some(table) = table else { break };
                        match self.backup_one_table(&mut conn, &table, &zip, &checksums) {
                            Ok(()) => backed_up.lock().unwrap().push(table),
                            Err(e) => {
                                first_error.lock().unwrap().get_or_insert(e);
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error.lock().unwrap().take() {
            return Err(err);
        }

        Ok(BackupSummary {
            tables_backed_up: Arc::try_unwrap(backed_up).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            chunk_checksums: Arc::try_unwrap(checksums).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
        })
    }

    fn backup_one_table<W: Write + Seek>(
        &self,
        conn: &mut Connection,
        table: &str,
        zip: &Arc<Mutex<zip::ZipWriter<W>>>,
        checksums: &Arc<Mutex<HashMap<String, Vec<String>>>>,
    ) -> Result<()> {
        let columns = plan_columns(conn, table)?;
        let order_by = order_columns(conn, table, &columns)?;
        let total = count_rows(conn, table).unwrap_or(0);
        tracing::debug!(table, total, "backup: starting table extraction");

        let mut offset: u64 = 0;
        let mut attempt = 1u32;
        let mut pending = BackupChunk { table: table.to_string(), rows: Vec::new() };
        let mut pending_bytes = 0usize;
        let mut chunk_index = 0u32;

        loop {
            let page = match extract_page(conn, table, &columns, &order_by, offset, self.options.rows_per_page) {
                Ok(rows) => rows,
                Err(e) if e.is_transient() && attempt <= self.options.retry.max_attempts => {
                    flush_chunk(zip, checksums, &self.options, table, &mut pending, &mut pending_bytes, &mut chunk_index)?;
                    std::thread::sleep(self.options.retry.backoff_for(attempt));
                    attempt += 1;
                    *conn = Connection::open(self.env.clone(), &self.config, self.dialect.clone())?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if page.is_empty() {
                break;
            }
            offset += page.len() as u64;
            for row in page {
                pending_bytes += estimate_row_bytes(&row);
                pending.rows.push(row);
            }
            if pending_bytes >= self.options.chunk_byte_budget {
                flush_chunk(zip, checksums, &self.options, table, &mut pending, &mut pending_bytes, &mut chunk_index)?;
            }
            attempt = 1;
        }
        flush_chunk(zip, checksums, &self.options, table, &mut pending, &mut pending_bytes, &mut chunk_index)?;
        Ok(())
    }
}

fn estimate_row_bytes(row: &BackupRow) -> usize {
    row.0
        .iter()
        .map(|v| match v {
            BackupValue::Null | BackupValue::Bool(_) => 1,
            BackupValue::Integer(_) | BackupValue::Real(_) => 8,
            BackupValue::Text(s) => s.len(),
            BackupValue::Binary(b) => b.len(),
        })
        .sum()
}

fn flush_chunk<W: Write + Seek>(
    zip: &Arc<Mutex<zip::ZipWriter<W>>>,
    checksums: &Arc<Mutex<HashMap<String, Vec<String>>>>,
    options: &BackupOptions,
    table: &str,
    pending: &mut BackupChunk,
    pending_bytes: &mut usize,
    chunk_index: &mut u32,
) -> Result<()> {
    if pending.rows.is_empty() {
        return Ok(());
    }
    let bytes = rmp_serde::to_vec(&pending)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex_digest(&hasher.finalize());

    let entry_name = format!("data/{}/{:04}.msgpack", sanitize_table_name(table), chunk_index);
    {
        let mut zip = zip.lock().unwrap();
        let file_options = zip::write::FileOptions::default().compression_method(options.compression);
        zip.start_file(&entry_name, file_options).map_err(Error::from)?;
        zip.write_all(&bytes).map_err(Error::from)?;
    }
    checksums.lock().unwrap().entry(table.to_string()).or_default().push(digest);

    *chunk_index += 1;
    *pending_bytes = 0;
    pending.rows.clear();
    Ok(())
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::new(format!("msgpack encode failed: {e}"), Status::InvalidArguments)
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::new(format!("msgpack decode failed: {e}"), Status::InvalidArguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_common_sql_type_names() {
        assert_eq!(categorize("VARCHAR"), Category::Text);
        assert_eq!(categorize("DECIMAL"), Category::Decimal);
        assert_eq!(categorize("BIGINT"), Category::Integer);
        assert_eq!(categorize("DATETIME2"), Category::DateTime);
        assert_eq!(categorize("uniqueidentifier"), Category::Guid);
        assert_eq!(categorize("varbinary"), Category::Binary);
    }

    #[test]
    fn sanitizes_table_names_for_zip_paths() {
        assert_eq!(sanitize_table_name("dbo.Users"), "dbo_Users");
        assert_eq!(sanitize_table_name("orders"), "orders");
    }

    #[test]
    fn estimates_row_bytes_additively() {
        let row = BackupRow(vec![BackupValue::Integer(1), BackupValue::Text("abc".into()), BackupValue::Null]);
        assert_eq!(estimate_row_bytes(&row), 8 + 3 + 1);
    }

    #[test]
    fn chunk_round_trips_through_messagepack() {
        let chunk = BackupChunk { table: "t".into(), rows: vec![BackupRow(vec![BackupValue::Bool(true), BackupValue::Text("x".into())])] };
        let bytes = rmp_serde::to_vec(&chunk).unwrap();
        let back: BackupChunk = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.rows.len(), 1);
        assert_eq!(back.rows[0].0[0], BackupValue::Bool(true));
    }
}
