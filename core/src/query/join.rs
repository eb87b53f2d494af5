//! Join clause composition. Four kinds, two
//! shapes: a short form (`table`, `joinCol`, `onOtherCol`) and a callable
//! form building an `On`/`OrOn` chain joined by the caller's junctor.

use crate::dialect::Dialect;
use crate::query::predicate::Junctor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// One `ON` condition in a join chain: `left_col <op> other_table.right_col`.
#[derive(Debug, Clone)]
struct OnCondition {
    junctor: Junctor,
    left_column: String,
    op: &'static str,
    other_table: String,
    other_column: String,
}

/// A single join clause, built either via the short form or incrementally via
/// [`JoinBuilder::on`]/[`JoinBuilder::or_on`].
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    conditions: Vec<OnCondition>,
}

impl JoinBuilder {
    pub fn new(kind: JoinKind, table: impl Into<String>) -> Self {
        Self { kind, table: table.into(), alias: None, conditions: Vec::new() }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Short form: `join(table, joinCol, onOtherCol)` against `base_table`.
    pub fn short(kind: JoinKind, table: impl Into<String>, join_column: impl Into<String>, base_table: impl Into<String>, on_column: impl Into<String>) -> Self {
        let mut b = Self::new(kind, table);
        b.conditions.push(OnCondition {
            junctor: Junctor::And,
            left_column: join_column.into(),
            op: "=",
            other_table: base_table.into(),
            other_column: on_column.into(),
        });
        b
    }

    pub fn on(mut self, left_column: impl Into<String>, op: &'static str, other_table: impl Into<String>, other_column: impl Into<String>) -> Self {
        self.conditions.push(OnCondition { junctor: Junctor::And, left_column: left_column.into(), op, other_table: other_table.into(), other_column: other_column.into() });
        self
    }

    pub fn or_on(mut self, left_column: impl Into<String>, op: &'static str, other_table: impl Into<String>, other_column: impl Into<String>) -> Self {
        self.conditions.push(OnCondition { junctor: Junctor::Or, left_column: left_column.into(), op, other_table: other_table.into(), other_column: other_column.into() });
        self
    }

    /// Renders `JOIN "table" [AS "alias"] ON ...`. An aliased table qualifies
    /// its side of the `ON` clause with the alias instead of the table name.
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let joined_side = self.alias.as_deref().unwrap_or(&self.table);
        let mut on = String::new();
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                on.push(' ');
                on.push_str(match cond.junctor {
                    Junctor::And => "AND",
                    Junctor::Or => "OR",
                });
                on.push(' ');
            }
            on.push_str(&format!(
                "{} {} {}",
                dialect.qualified_column(joined_side, &cond.left_column),
                cond.op,
                dialect.qualified_column(&cond.other_table, &cond.other_column)
            ));
        }
        let table_sql = match &self.alias {
            Some(alias) => format!("{} AS {}", dialect.quote_identifier(&self.table), dialect.quote_identifier(alias)),
            None => dialect.quote_identifier(&self.table),
        };
        format!("{} {table_sql} ON {on}", self.kind.sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::ColumnType;

    struct TestDialect;
    impl Dialect for TestDialect {
        fn backend(&self) -> crate::dialect::Backend {
            crate::dialect::Backend::PostgreSql
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
        fn apply_pagination(&self, select_core: &str, _p: crate::dialect::Pagination, _o: &str) -> String {
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
    fn short_form_renders_simple_equality() {
        let dialect = TestDialect;
        let join = JoinBuilder::short(JoinKind::Inner, "orders", "user_id", "users", "id");
        assert_eq!(join.render(&dialect), "JOIN \"orders\" ON \"orders\".\"user_id\" = \"users\".\"id\"");
    }

    #[test]
    fn aliased_table_qualifies_on_clause_with_alias() {
        let dialect = TestDialect;
        let join = JoinBuilder::new(JoinKind::Left, "orders").alias("o").on("user_id", "=", "users", "id");
        assert_eq!(join.render(&dialect), "LEFT JOIN \"orders\" AS \"o\" ON \"o\".\"user_id\" = \"users\".\"id\"");
    }

    #[test]
    fn or_on_chains_with_or() {
        let dialect = TestDialect;
        let join = JoinBuilder::new(JoinKind::Inner, "t").on("a", "=", "u", "a").or_on("b", "=", "u", "b");
        assert_eq!(join.render(&dialect), "JOIN \"t\" ON \"t\".\"a\" = \"u\".\"a\" OR \"t\".\"b\" = \"u\".\"b\"");
    }
}
