//! INSERT builder.

use crate::dialect::Dialect;
use crate::query::predicate::Literal;
use crate::query::ToSql;

#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<Literal>,
}

impl InsertBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), columns: Vec::new(), values: Vec::new() }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Literal>) -> &mut Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }
}

impl ToSql for InsertBuilder {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let columns = self.columns.iter().map(|c| dialect.quote_identifier(c)).collect::<Vec<_>>().join(", ");
        let values = self
            .values
            .iter()
            .map(|v| match v {
                Literal::Int(n) => n.to_string(),
                Literal::Float(n) => n.to_string(),
                Literal::Bool(b) => dialect.boolean_literal(*b).to_string(),
                Literal::Text(s) => dialect.quote_string_literal(s),
                Literal::Null => "NULL".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {} ({columns}) VALUES ({values})", dialect.quote_identifier(&self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Backend, ColumnType, Pagination};

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
        fn column_type_sql(&self, _ty: ColumnType) -> String {
            "TEXT".into()
        }
        fn apply_pagination(&self, select_core: &str, _p: Pagination, _o: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, column: &str, ty: ColumnType) -> String {
            format!("{} {}", column, self.column_type_sql(ty))
        }
        fn drop_table(&self, table: &str, _c: bool, _d: &[(String, String)]) -> Vec<String> {
            vec![format!("DROP TABLE {table}")]
        }
        fn last_insert_id_query(&self, _t: &str, _p: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn renders_insert_with_quoted_columns() {
        let dialect = TestDialect;
        let mut b = InsertBuilder::new("users");
        b.set("name", "ada").set("age", 30i64);
        assert_eq!(b.to_sql(&dialect), "INSERT INTO \"users\" (\"name\", \"age\") VALUES ('ada', 30)");
    }
}
