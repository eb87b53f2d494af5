//! WHERE-clause predicate composition shared by all five builders.
//! `And`/`Or`/`Not` are stateful junctors affecting only the next
//! added predicate; a `Group` that ends up empty collapses entirely so a
//! caller can build conditionally without special-casing "nothing was added".

use crate::dialect::Dialect;

/// A literal value as it appears on the right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}
impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}
impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}
impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}
impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_string())
    }
}
impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

fn render_literal(dialect: &dyn Dialect, value: &Literal) -> String {
    match value {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Bool(v) => dialect.boolean_literal(*v).to_string(),
        Literal::Text(v) => dialect.quote_string_literal(v),
        Literal::Null => "NULL".to_string(),
    }
}

/// Junctor state: affects only the next predicate added, then resets to
/// `And`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junctor {
    And,
    Or,
}

impl Junctor {
    fn sql(self) -> &'static str {
        match self {
            Junctor::And => "AND",
            Junctor::Or => "OR",
        }
    }
}

/// The right-hand side of a `WhereIn`: an explicit literal set or a rendered
/// sub-select — any builder implementing [`crate::query::ToSql`] can appear
/// here.
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    Literals(Vec<Literal>),
    SubSelect(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { column: String, op: &'static str, value: Literal },
    ColumnCompare { left: String, op: &'static str, right: String },
    In { column: String, set: InSet, negated: bool },
    Null { column: String, negated: bool },
    Bool { column: String, value: bool },
    Raw(String),
    Group(PredicateList),
}

fn render_predicate(dialect: &dyn Dialect, table: &str, pred: &Predicate) -> Option<String> {
    match pred {
        Predicate::Compare { column, op, value } => {
            Some(format!("{} {op} {}", dialect.qualified_column(table, column), render_literal(dialect, value)))
        }
        Predicate::ColumnCompare { left, op, right } => {
            Some(format!("{} {op} {}", dialect.qualified_column(table, left), dialect.qualified_column(table, right)))
        }
        Predicate::In { column, set, negated } => {
            let not = if *negated { "NOT " } else { "" };
            match set {
                InSet::Literals(values) => {
                    if values.is_empty() {
                        // An empty IN-set is never true; NOT IN (empty) is
                        // always true — render a tautology/contradiction
                        // instead of invalid SQL.
                        Some(if *negated { "1 = 1".to_string() } else { "1 = 0".to_string() })
                    } else {
                        let rendered = values.iter().map(|v| render_literal(dialect, v)).collect::<Vec<_>>().join(", ");
                        Some(format!("{} {not}IN ({rendered})", dialect.qualified_column(table, column)))
                    }
                }
                InSet::SubSelect(sql) => Some(format!("{} {not}IN ({sql})", dialect.qualified_column(table, column))),
            }
        }
        Predicate::Null { column, negated } => {
            let suffix = if *negated { "IS NOT NULL" } else { "IS NULL" };
            Some(format!("{} {suffix}", dialect.qualified_column(table, column)))
        }
        Predicate::Bool { column, value } => {
            Some(format!("{} = {}", dialect.qualified_column(table, column), dialect.boolean_literal(*value)))
        }
        Predicate::Raw(sql) => Some(sql.clone()),
        Predicate::Group(list) => list.render(dialect, table),
    }
}

/// An ordered sequence of `(junctor, negated, predicate)` triples; the first
/// junctor is never rendered (nothing precedes the first predicate). `Not`
/// is tracked per-entry rather than baked into individual `Predicate`
/// variants so it applies uniformly to every predicate shape, not just the
/// ones (`WhereIn`, `WhereNotNull`) that
/// happen to have a negated sibling form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateList {
    items: Vec<(Junctor, bool, Predicate)>,
}

impl PredicateList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, junctor: Junctor, predicate: Predicate) {
        self.items.push((junctor, false, predicate));
    }

    pub fn push_negated(&mut self, junctor: Junctor, negated: bool, predicate: Predicate) {
        self.items.push((junctor, negated, predicate));
    }

    /// Renders `(p1 AND p2 OR p3)` style text, or `None` if every member
    /// rendered to nothing.
    pub fn render(&self, dialect: &dyn Dialect, table: &str) -> Option<String> {
        let mut rendered = Vec::new();
        for (junctor, negated, pred) in &self.items {
            if let Some(mut text) = render_predicate(dialect, table, pred) {
                if *negated {
                    text = format!("NOT ({text})");
                }
                rendered.push((*junctor, text));
            }
        }
        if rendered.is_empty() {
            return None;
        }
        let mut out = String::new();
        for (i, (junctor, text)) in rendered.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(junctor.sql());
                out.push(' ');
            }
            out.push_str(text);
        }
        Some(format!("({out})"))
    }

    /// Same as [`Self::render`] but without the outer parentheses — used at
    /// the top level of a builder's WHERE clause.
    pub fn render_unparenthesized(&self, dialect: &dyn Dialect, table: &str) -> Option<String> {
        self.render(dialect, table).map(|s| s[1..s.len() - 1].to_string())
    }
}

/// Mixin shared by Select/Insert/Update/Delete/Migrate for predicate
/// composition.
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    list: PredicateList,
    pending: Junctor,
    negate_next: bool,
}

impl Default for Junctor {
    fn default() -> Self {
        Junctor::And
    }
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self) -> &mut Self {
        self.pending = Junctor::And;
        self
    }

    pub fn or(&mut self) -> &mut Self {
        self.pending = Junctor::Or;
        self
    }

    /// Toggles negation for the next predicate only.
    pub fn not(&mut self) -> &mut Self {
        self.negate_next = !self.negate_next;
        self
    }

    fn take_junctor(&mut self) -> Junctor {
        std::mem::take(&mut self.pending)
    }

    fn take_negate(&mut self) -> bool {
        std::mem::replace(&mut self.negate_next, false)
    }

    pub fn where_op(&mut self, column: impl Into<String>, op: &'static str, value: impl Into<Literal>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push_negated(junctor, negated, Predicate::Compare { column: column.into(), op, value: value.into() });
        self
    }

    /// `Where(col, val)`: defaults to `=`, or `IS`/`IS NOT` for an explicit
    /// null literal.
    pub fn where_(&mut self, column: impl Into<String>, value: impl Into<Literal>) -> &mut Self {
        let value = value.into();
        if matches!(value, Literal::Null) {
            return self.where_null(column);
        }
        self.where_op(column, "=", value)
    }

    pub fn where_not_equal(&mut self, column: impl Into<String>, value: impl Into<Literal>) -> &mut Self {
        self.where_op(column, "<>", value)
    }

    pub fn where_in(&mut self, column: impl Into<String>, values: Vec<Literal>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push(junctor, Predicate::In { column: column.into(), set: InSet::Literals(values), negated });
        self
    }

    pub fn where_in_subselect(&mut self, column: impl Into<String>, sub_select_sql: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push(junctor, Predicate::In { column: column.into(), set: InSet::SubSelect(sub_select_sql.into()), negated });
        self
    }

    pub fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push(junctor, Predicate::Null { column: column.into(), negated });
        self
    }

    pub fn where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = !self.take_negate();
        self.list.push(junctor, Predicate::Null { column: column.into(), negated });
        self
    }

    pub fn where_true(&mut self, column: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push_negated(junctor, negated, Predicate::Bool { column: column.into(), value: true });
        self
    }

    pub fn where_false(&mut self, column: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push_negated(junctor, negated, Predicate::Bool { column: column.into(), value: false });
        self
    }

    pub fn where_column(&mut self, left: impl Into<String>, op: &'static str, right: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push_negated(junctor, negated, Predicate::ColumnCompare { left: left.into(), op, right: right.into() });
        self
    }

    pub fn where_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        self.list.push_negated(junctor, negated, Predicate::Raw(sql.into()));
        self
    }

    /// `Where(|builder| { ... })`: wraps the inner additions in parentheses;
    /// a group that adds nothing collapses entirely.
    pub fn group(&mut self, build: impl FnOnce(&mut PredicateBuilder)) -> &mut Self {
        let junctor = self.take_junctor();
        let negated = self.take_negate();
        let mut inner = PredicateBuilder::new();
        build(&mut inner);
        if !inner.list.is_empty() {
            self.list.push_negated(junctor, negated, Predicate::Group(inner.list));
        }
        self
    }

    pub fn render_where(&self, dialect: &dyn Dialect, table: &str) -> Option<String> {
        self.list.render_unparenthesized(dialect, table).map(|s| format!("WHERE {s}"))
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
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
        fn boolean_literal(&self, value: bool) -> &'static str {
            if value {
                "TRUE"
            } else {
                "FALSE"
            }
        }
        fn column_type_sql(&self, _ty: ColumnType) -> String {
            "TEXT".to_string()
        }
        fn apply_pagination(&self, select_core: &str, _pagination: crate::dialect::Pagination, _order_by: &str) -> String {
            select_core.to_string()
        }
        fn primary_key_auto_increment(&self, column: &str, ty: ColumnType) -> String {
            format!("{} {} PRIMARY KEY", self.quote_identifier(column), self.column_type_sql(ty))
        }
        fn drop_table(&self, table: &str, _cascade: bool, _dropped_foreign_keys: &[(String, String)]) -> Vec<String> {
            vec![format!("DROP TABLE {}", self.quote_identifier(table))]
        }
        fn last_insert_id_query(&self, _table: &str, _pk_column: &str) -> String {
            "SELECT lastval()".to_string()
        }
    }

    #[test]
    fn builder_example_from_spec() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.where_op("age", ">", 18i64).and().where_in("role", vec!["admin".into(), "staff".into()]);
        let where_clause = b.render_where(&dialect, "users").unwrap();
        assert_eq!(where_clause, "WHERE (\"users\".\"age\" > 18 AND \"users\".\"role\" IN ('admin', 'staff'))");
    }

    #[test]
    fn empty_in_set_never_true() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.where_in("role", vec![]);
        assert_eq!(b.render_where(&dialect, "users").unwrap(), "WHERE 1 = 0");
    }

    #[test]
    fn empty_group_contributes_nothing() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.where_op("id", "=", 1i64).and().group(|_inner| {});
        let where_clause = b.render_where(&dialect, "t").unwrap();
        assert_eq!(where_clause, "WHERE \"t\".\"id\" = 1");
    }

    #[test]
    fn where_null_dispatches_to_is_null() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.where_("deleted_at", Literal::Null);
        assert_eq!(b.render_where(&dialect, "t").unwrap(), "WHERE \"t\".\"deleted_at\" IS NULL");
    }

    #[test]
    fn not_toggles_a_plain_compare() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.not().where_op("age", ">", 18i64);
        assert_eq!(b.render_where(&dialect, "users").unwrap(), "WHERE NOT (\"users\".\"age\" > 18)");
    }

    #[test]
    fn not_is_consumed_by_the_next_predicate_only() {
        let dialect = TestDialect;
        let mut b = PredicateBuilder::new();
        b.not().where_true("active").and().where_op("age", ">", 18i64);
        assert_eq!(
            b.render_where(&dialect, "users").unwrap(),
            "WHERE NOT (\"users\".\"active\" = TRUE) AND \"users\".\"age\" > 18"
        );
    }
}
