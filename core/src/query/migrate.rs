//! Migration builder: emits an ordered plan of
//! [`MigratePlanElement`]s, each lowered to zero-or-more SQL statements via
//! the dialect formatter. The plan's checksum is the SHA-256 of its rendered
//! statements joined with newlines, matching what [`crate::migration`]
//! recomputes during `VerifyChecksums`.

use sha2::{Digest, Sha256};

use crate::dialect::{ColumnType, Dialect};

/// A single column in a `CreateTable` element.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty, primary_key: false, auto_increment: false, nullable: true }
    }

    pub fn primary_key(mut self, auto_increment: bool) -> Self {
        self.primary_key = true;
        self.auto_increment = auto_increment;
        self.nullable = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// One step of a migration plan; maps to zero or more SQL statements.
#[derive(Debug, Clone)]
pub enum MigratePlanElement {
    CreateTable { table: String, columns: Vec<ColumnDef> },
    AlterTableAddColumn { table: String, column: ColumnDef },
    AlterTableDropColumn { table: String, column: String },
    AddForeignKey { table: String, column: String, ref_table: String, ref_column: String },
    DropTable { table: String, cascade: bool, dropped_foreign_keys: Vec<(String, String)> },
    Raw(String),
}

fn render_column(dialect: &dyn Dialect, column: &ColumnDef) -> String {
    if column.primary_key && column.auto_increment {
        dialect.primary_key_auto_increment(&column.name, column.ty)
    } else if column.primary_key {
        dialect.primary_key(&column.name, column.ty)
    } else if column.nullable {
        dialect.column(&column.name, column.ty)
    } else {
        dialect.required_column(&column.name, column.ty)
    }
}

fn render_element(dialect: &dyn Dialect, element: &MigratePlanElement) -> Vec<String> {
    match element {
        MigratePlanElement::CreateTable { table, columns } => {
            let body = columns.iter().map(|c| render_column(dialect, c)).collect::<Vec<_>>().join(", ");
            vec![format!("CREATE TABLE {} ({body})", dialect.quote_identifier(table))]
        }
        MigratePlanElement::AlterTableAddColumn { table, column } => {
            vec![format!("ALTER TABLE {} ADD COLUMN {}", dialect.quote_identifier(table), render_column(dialect, column))]
        }
        MigratePlanElement::AlterTableDropColumn { table, column } => {
            vec![format!("ALTER TABLE {} DROP COLUMN {}", dialect.quote_identifier(table), dialect.quote_identifier(column))]
        }
        MigratePlanElement::AddForeignKey { table, column, ref_table, ref_column } => {
            vec![format!(
                "ALTER TABLE {} ADD {}",
                dialect.quote_identifier(table),
                dialect.foreign_key(column, ref_table, ref_column)
            )]
        }
        MigratePlanElement::DropTable { table, cascade, dropped_foreign_keys } => {
            dialect.drop_table(table, *cascade, dropped_foreign_keys)
        }
        MigratePlanElement::Raw(sql) => vec![sql.clone()],
    }
}

/// Builds an ordered plan of statements for one migration direction (Up or
/// Down).
#[derive(Debug, Clone, Default)]
pub struct MigrationBuilder {
    elements: Vec<MigratePlanElement>,
}

impl MigrationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: MigratePlanElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn create_table(&mut self, table: impl Into<String>, columns: Vec<ColumnDef>) -> &mut Self {
        self.push(MigratePlanElement::CreateTable { table: table.into(), columns })
    }

    pub fn drop_table(&mut self, table: impl Into<String>, cascade: bool) -> &mut Self {
        self.push(MigratePlanElement::DropTable { table: table.into(), cascade, dropped_foreign_keys: Vec::new() })
    }

    /// Lowers every element to SQL text, in order.
    pub fn statements(&self, dialect: &dyn Dialect) -> Vec<String> {
        self.elements.iter().flat_map(|e| render_element(dialect, e)).collect()
    }

    /// SHA-256 of the rendered statements joined with `\n`, hex-encoded.
    pub fn checksum(&self, dialect: &dyn Dialect) -> String {
        let joined = self.statements(dialect).join("\n");
        let digest = Sha256::digest(joined.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Backend, Pagination};

    struct TestDialect;
    impl Dialect for TestDialect {
        fn backend(&self) -> Backend {
            Backend::PostgreSql
        }
        fn boolean_literal(&self, v: bool) -> &'static str {
            if v {
                "TRUE"
            } else {
                "FALSE"
            }
        }
        fn column_type_sql(&self, ty: ColumnType) -> String {
            match ty {
                ColumnType::Bigint => "BIGINT".into(),
                ColumnType::Varchar(n) => format!("VARCHAR({n})"),
                _ => "TEXT".into(),
            }
        }
        fn apply_pagination(&self, select_core: &str, _p: Pagination, _o: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, column: &str, _ty: ColumnType) -> String {
            format!("{} BIGSERIAL PRIMARY KEY", self.quote_identifier(column))
        }
        fn drop_table(&self, table: &str, cascade: bool, _d: &[(String, String)]) -> Vec<String> {
            let suffix = if cascade { " CASCADE" } else { "" };
            vec![format!("DROP TABLE {}{suffix}", self.quote_identifier(table))]
        }
        fn last_insert_id_query(&self, _t: &str, _p: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn create_table_renders_primary_key_and_columns() {
        let dialect = TestDialect;
        let mut b = MigrationBuilder::new();
        b.create_table(
            "users",
            vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true), ColumnDef::new("name", ColumnType::Varchar(255)).required()],
        );
        assert_eq!(
            b.statements(&dialect),
            vec!["CREATE TABLE \"users\" (\"id\" BIGSERIAL PRIMARY KEY, \"name\" VARCHAR(255) NOT NULL)".to_string()]
        );
    }

    #[test]
    fn checksum_is_stable_for_identical_plans() {
        let dialect = TestDialect;
        let mut a = MigrationBuilder::new();
        a.create_table("t", vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true)]);
        let mut b = MigrationBuilder::new();
        b.create_table("t", vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true)]);
        assert_eq!(a.checksum(&dialect), b.checksum(&dialect));
        assert_eq!(a.checksum(&dialect).len(), 64);
    }

    #[test]
    fn checksum_changes_with_statements() {
        let dialect = TestDialect;
        let mut a = MigrationBuilder::new();
        a.create_table("t", vec![ColumnDef::new("id", ColumnType::Bigint).primary_key(true)]);
        let mut b = MigrationBuilder::new();
        b.drop_table("t", false);
        assert_ne!(a.checksum(&dialect), b.checksum(&dialect));
    }
}
