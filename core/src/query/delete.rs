//! DELETE builder. The mapper always constrains this by
//! primary key, but the builder itself is generic over whatever predicate the
//! caller composes.

use crate::dialect::Dialect;
use crate::query::predicate::PredicateBuilder;
use crate::query::{forward_predicate_builder, ToSql};

#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    predicates: PredicateBuilder,
}

forward_predicate_builder!(DeleteBuilder, predicates);

impl DeleteBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), predicates: PredicateBuilder::new() }
    }
}

impl ToSql for DeleteBuilder {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(&self.table));
        if let Some(where_clause) = self.predicates.render_where(dialect, &self.table) {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        sql
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
    fn renders_delete_by_primary_key() {
        let dialect = TestDialect;
        let mut b = DeleteBuilder::new("users");
        b.where_("id", 7i64);
        assert_eq!(b.to_sql(&dialect), "DELETE FROM \"users\" WHERE \"users\".\"id\" = 7");
    }
}
