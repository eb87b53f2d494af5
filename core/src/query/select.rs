//! SELECT builder.

use crate::dialect::{Dialect, Pagination};
use crate::query::join::JoinBuilder;
use crate::query::predicate::PredicateBuilder;
use crate::query::{forward_predicate_builder, ToSql};

#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    fields: Vec<String>,
    joins: Vec<JoinBuilder>,
    predicates: PredicateBuilder,
    order_by: Vec<String>,
    pagination: Pagination,
}

forward_predicate_builder!(SelectBuilder, predicates);

impl SelectBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), fields: Vec::new(), joins: Vec::new(), predicates: PredicateBuilder::new(), order_by: Vec::new(), pagination: Pagination::All }
    }

    pub fn field(&mut self, name: impl Into<String>) -> &mut Self {
        self.fields.push(name.into());
        self
    }

    pub fn fields(&mut self, names: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn join(&mut self, join: JoinBuilder) -> &mut Self {
        self.joins.push(join);
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.order_by.push(column.into());
        self
    }

    pub fn all(&mut self) -> &mut Self {
        self.pagination = Pagination::All;
        self
    }

    pub fn first(&mut self, n: u64) -> &mut Self {
        self.pagination = Pagination::First(n);
        self
    }

    pub fn range(&mut self, offset: u64, limit: u64) -> &mut Self {
        self.pagination = Pagination::Range { offset, limit };
        self
    }

    fn select_core(&self, dialect: &dyn Dialect) -> String {
        let columns = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.iter().map(|f| dialect.qualified_column(&self.table, f)).collect::<Vec<_>>().join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", dialect.quote_identifier(&self.table));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.render(dialect));
        }
        if let Some(where_clause) = self.predicates.render_where(dialect, &self.table) {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        sql
    }

    fn order_by_clause(&self, dialect: &dyn Dialect) -> String {
        crate::dialect::render_order_by(dialect, &self.table, &self.order_by.iter().map(String::as_str).collect::<Vec<_>>())
    }

    /// Renders `SELECT COUNT(*) ...` over the same FROM/JOIN/WHERE.
    pub fn to_count_sql(&self, dialect: &dyn Dialect) -> String {
        let mut from_and_where = format!("FROM {}", dialect.quote_identifier(&self.table));
        for join in &self.joins {
            from_and_where.push(' ');
            from_and_where.push_str(&join.render(dialect));
        }
        if let Some(where_clause) = self.predicates.render_where(dialect, &self.table) {
            from_and_where.push(' ');
            from_and_where.push_str(&where_clause);
        }
        dialect.count_query(&from_and_where)
    }
}

impl ToSql for SelectBuilder {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let core = self.select_core(dialect);
        dialect.apply_pagination(&core, self.pagination, &self.order_by_clause(dialect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Backend, ColumnType};

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
        fn apply_pagination(&self, select_core: &str, pagination: Pagination, order_by: &str) -> String {
            let mut sql = select_core.to_string();
            if !order_by.is_empty() {
                sql.push(' ');
                sql.push_str(order_by);
            }
            match pagination {
                Pagination::All => {}
                Pagination::First(n) => sql.push_str(&format!(" LIMIT {n}")),
                Pagination::Range { offset, limit } => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            }
            sql
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
    fn builder_example_from_spec() {
        let dialect = TestDialect;
        let mut b = SelectBuilder::new("users");
        b.field("id").where_op("age", ">", 18i64).and().where_in("role", vec!["admin".into(), "staff".into()]).first(5);
        assert_eq!(
            b.to_sql(&dialect),
            "SELECT \"users\".\"id\" FROM \"users\" WHERE (\"users\".\"age\" > 18 AND \"users\".\"role\" IN ('admin', 'staff')) LIMIT 5"
        );
    }

    #[test]
    fn no_fields_renders_star() {
        let dialect = TestDialect;
        let b = SelectBuilder::new("t");
        assert_eq!(b.to_sql(&dialect), "SELECT * FROM \"t\"");
    }
}
