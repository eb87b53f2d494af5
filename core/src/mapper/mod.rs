//! Data mapper: generic CRUD over any [`Record`], plus `CREATE TABLE`
//! synthesis from field descriptors.
//!
//! Every operation goes through [`Statement`]'s prepare/bind/execute
//! lifecycle rather than through the literal-rendering query builder in
//! [`crate::query`] — field values keep their native binder precision
//! (GUID, Decimal, binary) instead of being rendered as inline SQL text.

pub mod field;
pub mod record;
pub mod relation;

pub use field::{Field, PrimaryKeyKind};
pub use record::{FieldDescriptor, ForeignKeyRef, Record, VariantConvert};
pub use relation::{BelongsTo, HasMany, HasManyThrough, HasOneThrough};

use crate::binder::variant::SqlVariant;
use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::error::{Error, Result, Status};
use crate::query::{ColumnDef, MigrationBuilder, SelectBuilder};
use crate::statement::Statement;

/// A bound mapper for one record type over one connection.
pub struct Mapper<'a, R: Record> {
    conn: &'a Connection,
    _marker: std::marker::PhantomData<R>,
}

impl<'a, R: Record + Default> Mapper<'a, R> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn, _marker: std::marker::PhantomData }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.conn.dialect()
    }

    fn primary_key_descriptor(&self) -> Result<(usize, &'static FieldDescriptor)> {
        let index = R::primary_key_index().ok_or_else(|| {
            Error::new(format!("{} has no primary key field", R::table_name()), Status::InvalidArguments)
        })?;
        Ok((index, &R::descriptors()[index]))
    }

    /// Renders `CREATE TABLE` (plus any `ADD FOREIGN KEY` follow-ups) for
    /// this record's descriptors.
    pub fn create_table_sql(&self) -> Vec<String> {
        let dialect = self.dialect();
        let mut builder = MigrationBuilder::new();
        let columns: Vec<ColumnDef> = R::descriptors()
            .iter()
            .map(|d| {
                let mut column = ColumnDef::new(d.column, d.column_type);
                column = match d.primary_key {
                    PrimaryKeyKind::None => {
                        if d.nullable {
                            column
                        } else {
                            column.required()
                        }
                    }
                    PrimaryKeyKind::AutoAssign => column.primary_key(false),
                    PrimaryKeyKind::ServerSideAutoIncrement => column.primary_key(true),
                };
                column
            })
            .collect();
        builder.create_table(R::table_name(), columns);
        for d in R::descriptors() {
            if let Some(fk) = d.foreign_key {
                builder.push(crate::query::MigratePlanElement::AddForeignKey {
                    table: R::table_name().to_string(),
                    column: d.column.to_string(),
                    ref_table: fk.ref_table.to_string(),
                    ref_column: fk.ref_column.to_string(),
                });
            }
        }
        builder.statements(dialect)
    }

    /// Inserts `record`. Assigns a client-side `AutoAssign` primary key if
    /// unset, binds every modified-or-mandatory field, and reads back a
    /// `ServerSideAutoIncrement` key afterwards.
    pub fn create(&self, record: &mut R) -> Result<()> {
        let descriptors = R::descriptors();
        let pk = R::primary_key_index();

        if let Some(pk_index) = pk {
            let d = &descriptors[pk_index];
            if d.primary_key == PrimaryKeyKind::AutoAssign && !record.is_field_modified(pk_index) {
                let current = record.get_field(pk_index);
                if matches!(&current, SqlVariant::Null(_))
                    || matches!(&current, SqlVariant::Bigint(0))
                    || matches!(&current, SqlVariant::Integer(0))
                {
                    let assigned = match &current {
                        SqlVariant::Guid(_) | SqlVariant::Null(crate::dialect::ColumnType::Guid) => {
                            SqlVariant::Guid(crate::binder::guid::SqlGuid::new_v4())
                        }
                        _ => self.next_auto_assign_value(d.column)?,
                    };
                    record.set_field(pk_index, assigned)?;
                }
            }
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (i, d) in descriptors.iter().enumerate() {
            if Some(i) == pk && d.primary_key == PrimaryKeyKind::ServerSideAutoIncrement {
                continue;
            }
            if record.is_field_modified(i) || !d.nullable {
                columns.push(d.column);
                values.push(record.get_field(i));
            }
        }
        if columns.is_empty() {
            return Err(Error::new("nothing to insert: no modified or mandatory fields", Status::InvalidArguments));
        }

        let dialect = self.dialect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let column_list = columns.iter().map(|c| dialect.quote_identifier(c)).collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO {} ({column_list}) VALUES ({placeholders})", dialect.quote_identifier(R::table_name()));

        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        for (i, value) in values.iter().enumerate() {
            stmt.bind_variant_input_parameter((i + 1) as u16, value, Some(columns[i]))?;
        }
        stmt.execute()?;

        if let Some(pk_index) = pk {
            let d = &descriptors[pk_index];
            if d.primary_key == PrimaryKeyKind::ServerSideAutoIncrement {
                let query = dialect.last_insert_id_query(R::table_name(), d.column);
                let mut id_stmt = Statement::new(self.conn)?;
                id_stmt.prepare(&query)?;
                id_stmt.execute()?;
                id_stmt.fetch_row()?;
                let value = id_stmt.get_variant_column(1, d.column_type)?;
                record.set_field(pk_index, value)?;
            }
        }

        record.clear_modified();
        record.wire_relations(self.conn);
        Ok(())
    }

    /// `AutoAssign` fallback for non-GUID keys: `MAX(pk) + 1`, or `1` if the
    /// table is empty.
    fn next_auto_assign_value(&self, pk_column: &str) -> Result<SqlVariant> {
        let dialect = self.dialect();
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            dialect.quote_identifier(pk_column),
            dialect.quote_identifier(R::table_name())
        );
        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        stmt.execute()?;
        stmt.fetch_row()?;
        match stmt.get_variant_column(1, crate::dialect::ColumnType::Bigint)? {
            SqlVariant::Null(_) => Ok(SqlVariant::Bigint(1)),
            SqlVariant::Bigint(n) => Ok(SqlVariant::Bigint(n + 1)),
            SqlVariant::Integer(n) => Ok(SqlVariant::Bigint(n as i64 + 1)),
            other => Ok(other),
        }
    }

    /// Updates modified non-key fields for `record`'s current primary key.
    /// Rejects a request where the primary key field itself was modified:
    /// the caller must re-fetch, or use a separate `delete` + `create`, since
    /// there is no captured "previous key" to issue the `WHERE` against
    /// (see DESIGN.md's Open Question resolution).
    pub fn update(&self, record: &mut R) -> Result<u64> {
        let (pk_index, pk_descriptor) = self.primary_key_descriptor()?;
        if record.is_field_modified(pk_index) {
            return Err(Error::new(
                "primary key field was modified; re-fetch the record or delete and re-create instead",
                Status::InvalidArguments,
            ));
        }

        let descriptors = R::descriptors();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (i, d) in descriptors.iter().enumerate() {
            if i == pk_index || !record.is_field_modified(i) {
                continue;
            }
            columns.push(d.column);
            values.push(record.get_field(i));
        }
        if columns.is_empty() {
            return Ok(0);
        }

        let dialect = self.dialect();
        let assignments = columns.iter().map(|c| format!("{} = ?", dialect.quote_identifier(c))).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?",
            dialect.quote_identifier(R::table_name()),
            dialect.quote_identifier(pk_descriptor.column)
        );

        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        for (i, value) in values.iter().enumerate() {
            stmt.bind_variant_input_parameter((i + 1) as u16, value, Some(columns[i]))?;
        }
        let pk_value = record.get_field(pk_index);
        stmt.bind_variant_input_parameter((values.len() + 1) as u16, &pk_value, Some(pk_descriptor.column))?;
        stmt.execute()?;
        let affected = stmt.row_count()?.max(0) as u64;

        record.clear_modified();
        Ok(affected)
    }

    /// Deletes the row matching `record`'s primary key.
    pub fn delete(&self, record: &R) -> Result<u64> {
        let (pk_index, pk_descriptor) = self.primary_key_descriptor()?;
        let dialect = self.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            dialect.quote_identifier(R::table_name()),
            dialect.quote_identifier(pk_descriptor.column)
        );
        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        let pk_value = record.get_field(pk_index);
        stmt.bind_variant_input_parameter(1, &pk_value, Some(pk_descriptor.column))?;
        stmt.execute()?;
        Ok(stmt.row_count()?.max(0) as u64)
    }

    /// Fetches the single row matching `pk`, or `None`.
    pub fn query_single(&self, pk: SqlVariant) -> Result<Option<R>> {
        let (pk_index, pk_descriptor) = self.primary_key_descriptor()?;
        let dialect = self.dialect();
        let columns = R::descriptors().iter().map(|d| dialect.quote_identifier(d.column)).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT {columns} FROM {} WHERE {} = ?",
            dialect.quote_identifier(R::table_name()),
            dialect.quote_identifier(pk_descriptor.column)
        );
        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        stmt.bind_variant_input_parameter(1, &pk, Some(pk_descriptor.column))?;
        stmt.execute()?;
        if !stmt.fetch_row()? {
            return Ok(None);
        }
        let record = self.build_record(&mut stmt)?;
        let _ = pk_index;
        Ok(Some(record))
    }

    /// Runs `builder`'s rendered `SELECT` and materializes every row.
    pub fn query(&self, builder: &SelectBuilder) -> Result<Vec<R>> {
        let dialect = self.dialect();
        let sql = builder.to_sql(dialect);
        let mut stmt = Statement::new(self.conn)?;
        stmt.prepare(&sql)?;
        stmt.execute()?;
        let mut out = Vec::new();
        while stmt.fetch_row()? {
            out.push(self.build_record(&mut stmt)?);
        }
        Ok(out)
    }

    /// Fetches every row in the table, in no particular order.
    pub fn all(&self) -> Result<Vec<R>> {
        let builder = SelectBuilder::new(R::table_name());
        self.query(&builder)
    }

    fn build_record(&self, stmt: &mut Statement) -> Result<R> {
        let mut record = self.empty_record()?;
        for (i, d) in R::descriptors().iter().enumerate() {
            let value = stmt.get_variant_column((i + 1) as u16, d.column_type)?;
            record.set_field(i, value)?;
        }
        record.clear_modified();
        record.wire_relations(self.conn);
        Ok(record)
    }

    fn empty_record(&self) -> Result<R> {
        Ok(R::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Backend, ColumnType, Pagination};

    struct TestDialect;
    impl Dialect for TestDialect {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }
        fn boolean_literal(&self, v: bool) -> &'static str {
            if v {
                "1"
            } else {
                "0"
            }
        }
        fn column_type_sql(&self, ty: ColumnType) -> String {
            match ty {
                ColumnType::Bigint => "INTEGER".into(),
                ColumnType::Varchar(_) => "TEXT".into(),
                _ => "TEXT".into(),
            }
        }
        fn apply_pagination(&self, select_core: &str, _p: Pagination, _o: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, column: &str, _ty: ColumnType) -> String {
            format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote_identifier(column))
        }
        fn drop_table(&self, table: &str, _cascade: bool, _d: &[(String, String)]) -> Vec<String> {
            vec![format!("DROP TABLE {}", self.quote_identifier(table))]
        }
        fn last_insert_id_query(&self, _t: &str, _p: &str) -> String {
            "SELECT last_insert_rowid()".to_string()
        }
    }

    #[derive(Default)]
    struct Widget {
        id: Field<i64>,
        name: Field<String>,
    }

    const WIDGET_DESCRIPTORS: [FieldDescriptor; 2] = [
        FieldDescriptor::new("id", "id", ColumnType::Bigint).primary_key(PrimaryKeyKind::ServerSideAutoIncrement),
        FieldDescriptor::new("name", "name", ColumnType::Varchar(0)).required(),
    ];

    impl Record for Widget {
        fn table_name() -> &'static str {
            "widgets"
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
        fn set_field(&mut self, index: usize, value: SqlVariant) -> Result<()> {
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

    #[test]
    fn create_table_sql_renders_primary_key_and_required_column() {
        let dialect = TestDialect;
        let descriptors = Widget::descriptors();
        let mut builder = MigrationBuilder::new();
        let columns: Vec<ColumnDef> = descriptors
            .iter()
            .map(|d| {
                let col = ColumnDef::new(d.column, d.column_type);
                match d.primary_key {
                    PrimaryKeyKind::ServerSideAutoIncrement => col.primary_key(true),
                    PrimaryKeyKind::AutoAssign => col.primary_key(false),
                    PrimaryKeyKind::None if !d.nullable => col.required(),
                    PrimaryKeyKind::None => col,
                }
            })
            .collect();
        builder.create_table(Widget::table_name(), columns);
        let statements = builder.statements(&dialect);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("AUTOINCREMENT"));
        assert!(statements[0].contains("\"name\" TEXT NOT NULL"));
    }

    #[test]
    fn primary_key_index_is_found() {
        assert_eq!(Widget::primary_key_index(), Some(0));
    }

    #[test]
    fn field_modification_tracking_drives_insert_column_selection() {
        let mut w = Widget::default();
        w.name.set("gadget".to_string());
        let descriptors = Widget::descriptors();
        let included: Vec<&str> = descriptors
            .iter()
            .enumerate()
            .filter(|(i, d)| w.is_field_modified(*i) || !d.nullable)
            .map(|(_, d)| d.column)
            .collect();
        assert_eq!(included, vec!["name"]);
    }
}
