//! UPDATE builder. The SET clause carries only the
//! columns the mapper marked modified; the caller supplies the WHERE clause
//! separately via the predicate mix-in (normally the primary key).

use crate::dialect::Dialect;
use crate::query::predicate::{Literal, PredicateBuilder};
use crate::query::{forward_predicate_builder, ToSql};

#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    assignments: Vec<(String, Literal)>,
    predicates: PredicateBuilder,
}

forward_predicate_builder!(UpdateBuilder, predicates);

impl UpdateBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), assignments: Vec::new(), predicates: PredicateBuilder::new() }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Literal>) -> &mut Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl ToSql for UpdateBuilder {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|(col, value)| {
                let rendered = match value {
                    Literal::Int(n) => n.to_string(),
                    Literal::Float(n) => n.to_string(),
                    Literal::Bool(b) => dialect.boolean_literal(*b).to_string(),
                    Literal::Text(s) => dialect.quote_string_literal(s),
                    Literal::Null => "NULL".to_string(),
                };
                format!("{} = {rendered}", dialect.quote_identifier(col))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {set_clause}", dialect.quote_identifier(&self.table));
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
    fn renders_set_and_where_by_primary_key() {
        let dialect = TestDialect;
        let mut b = UpdateBuilder::new("users");
        b.set("name", "ada").where_("id", 7i64);
        assert_eq!(b.to_sql(&dialect), "UPDATE \"users\" SET \"name\" = 'ada' WHERE \"users\".\"id\" = 7");
    }
}
