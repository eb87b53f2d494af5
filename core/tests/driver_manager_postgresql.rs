//! Live-driver integration test against a real PostgreSQL ODBC DSN.
//!
//! Ignored by default (no driver/server is available in CI); run with
//! `cargo test -- --ignored` after pointing `TEST_LWODBC_POSTGRESQL_DSN` at a
//! reachable `psqlodbc` data source, e.g.
//! `Driver={PostgreSQL Unicode};Server=localhost;Port=5432;Database=lwodbc_test;Uid=postgres;Pwd=postgres`.

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use lwodbc::binder::numeric::SqlNumeric;
use lwodbc::binder::variant::SqlVariant;
use lwodbc::connection::{Connection, ConnectionConfig};
use lwodbc::handle::Environment;
use lwodbc::mapper::record::VariantConvert;
use lwodbc::mapper::{Field, FieldDescriptor, Mapper, PrimaryKeyKind, Record};
use lwodbc::statement::Statement;
use lwodbc::Dialect;
use lwodbc_postgresql::PostgreSqlDialect;
use rust_decimal::Decimal;

fn get_dsn() -> String {
    env::var("TEST_LWODBC_POSTGRESQL_DSN").expect("environment variable TEST_LWODBC_POSTGRESQL_DSN is not defined")
}

fn connect() -> Connection {
    let env = Arc::new(Environment::new().expect("failed to allocate ODBC environment"));
    let config = ConnectionConfig::ConnectionString(get_dsn());
    let dialect: Arc<dyn Dialect> = Arc::new(PostgreSqlDialect);
    Connection::open(env, &config, dialect).expect("failed to connect")
}

#[derive(Default)]
struct Widget {
    id: Field<i64>,
    name: Field<String>,
}

const WIDGET_DESCRIPTORS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("id", "id", lwodbc::dialect::ColumnType::Bigint).primary_key(PrimaryKeyKind::ServerSideAutoIncrement),
    FieldDescriptor::new("name", "name", lwodbc::dialect::ColumnType::Varchar(0)).required(),
];

impl Record for Widget {
    fn table_name() -> &'static str {
        "lwodbc_test_widgets"
    }
    fn descriptors() -> &'static [FieldDescriptor] {
        &WIDGET_DESCRIPTORS
    }
    fn get_field(&self, index: usize) -> SqlVariant {
        match index {
            0 => self.id.get().to_variant(),
            1 => self.name.get().to_variant(),
            _ => unreachable!(),
        }
    }
    fn set_field(&mut self, index: usize, value: SqlVariant) -> lwodbc::error::Result<()> {
        match index {
            0 => self.id.set(i64::from_variant(value)?),
            1 => self.name.set(String::from_variant(value)?),
            _ => unreachable!(),
        }
        Ok(())
    }
    fn is_field_modified(&self, index: usize) -> bool {
        match index {
            0 => self.id.is_modified(),
            1 => self.name.is_modified(),
            _ => unreachable!(),
        }
    }
    fn clear_modified(&mut self) {
        self.id.clear_modified();
        self.name.clear_modified();
    }
}

fn drop_test_table(conn: &Connection) {
    let mut stmt = Statement::new(conn).unwrap();
    let _ = stmt.prepare("DROP TABLE IF EXISTS lwodbc_test_widgets");
    let _ = stmt.execute();
}

#[test]
#[ignore]
fn test_connection_opens() {
    let _conn = connect();
}

#[test]
#[ignore]
fn test_create_table_and_crud_roundtrip() {
    let mut conn = connect();
    drop_test_table(&conn);

    let mapper = Mapper::<Widget>::new(&conn);
    for sql in mapper.create_table_sql() {
        let mut stmt = Statement::new(&conn).unwrap();
        stmt.prepare(&sql).unwrap();
        stmt.execute().unwrap();
    }

    let mut widget = Widget::default();
    widget.name.set("sprocket".to_string());
    mapper.create(&mut widget).unwrap();
    assert!(*widget.id.get() > 0);

    let fetched = mapper.query_single(SqlVariant::Bigint(*widget.id.get())).unwrap().expect("row exists");
    assert_eq!(fetched.name.get().as_str(), "sprocket");

    widget.name.set("widget".to_string());
    let updated = mapper.update(&mut widget).unwrap();
    assert_eq!(updated, 1);

    let deleted = mapper.delete(&widget).unwrap();
    assert_eq!(deleted, 1);

    drop_test_table(&conn);
    let _ = &mut conn;
}

#[test]
#[ignore]
fn test_execute_rejects_parameter_count_mismatch() {
    let conn = connect();
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.prepare("SELECT $1::int4 + $2::int4").unwrap();
    stmt.bind_input_parameter(1, &1i32, None).unwrap();
    // Only one of the two expected parameters was bound.
    let err = stmt.execute().unwrap_err();
    assert_eq!(err.status, lwodbc::error::Status::InvalidArguments);
}

#[test]
#[ignore]
fn test_decimal_round_trips_through_structured_numeric_binding() {
    // PostgreSQL is a `numeric_binding_is_reliable()` backend, so this value
    // must travel through `SQL_NUMERIC_STRUCT`, not the `f64` shadow — which
    // would silently lose precision beyond what `f64` can represent exactly.
    let conn = connect();
    let mut stmt = Statement::new(&conn).unwrap();
    stmt.prepare("SELECT $1::numeric(38,10)").unwrap();
    let value = SqlNumeric::new(38, 10, Decimal::from_str("12345.6789012345").unwrap()).unwrap();
    stmt.bind_variant_input_parameter(1, &SqlVariant::Decimal(value), None).unwrap();
    stmt.execute().unwrap();
    stmt.fetch_row().unwrap();
    match stmt.get_variant_column(1, lwodbc::dialect::ColumnType::Decimal(38, 10)).unwrap() {
        SqlVariant::Decimal(fetched) => assert_eq!(fetched.to_string_exact(), "12345.6789012345"),
        other => panic!("expected decimal, got {other:?}"),
    }
}

#[test]
#[ignore]
fn test_transaction_rolls_back_on_error() {
    let mut conn = connect();
    drop_test_table(&conn);
    let mapper = Mapper::<Widget>::new(&conn);
    for sql in mapper.create_table_sql() {
        let mut stmt = Statement::new(&conn).unwrap();
        stmt.prepare(&sql).unwrap();
        stmt.execute().unwrap();
    }

    let result: lwodbc::error::Result<()> = conn.transaction(|txn_conn| {
        let mut stmt = Statement::new(txn_conn)?;
        stmt.prepare("INSERT INTO lwodbc_test_widgets (name) VALUES ('doomed')")?;
        stmt.execute()?;
        Err(lwodbc::error::Error::new("forced rollback", lwodbc::error::Status::InvalidArguments))
    });
    assert!(result.is_err());

    let rows = mapper.all().unwrap();
    assert!(rows.is_empty());

    drop_test_table(&conn);
}
