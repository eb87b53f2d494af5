//! Dialect-aware SQL query builder: Select/Insert/Update/
//! Delete/Migrate builders sharing the [`predicate`] WHERE mix-in and the
//! [`join`] clause builder.

pub mod delete;
pub mod insert;
pub mod join;
pub mod migrate;
pub mod predicate;
pub mod select;
pub mod update;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use join::{JoinBuilder, JoinKind};
pub use migrate::{ColumnDef, MigratePlanElement, MigrationBuilder};
pub use predicate::{Literal, PredicateBuilder};
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::dialect::Dialect;

/// Anything that can render itself to SQL text against a dialect — the
/// interoperability point that lets any builder implementing it appear as
/// the right-hand side of a `Where` sub-select.
pub trait ToSql {
    fn to_sql(&self, dialect: &dyn Dialect) -> String;
}

/// Forwards the predicate-composition vocabulary from an embedded
/// [`PredicateBuilder`] field onto the enclosing builder, so callers chain
/// `.where_(...)`/`.and()`/`.or()` directly on `Select`/`Update`/`Delete`
/// instead of reaching into a nested field.
macro_rules! forward_predicate_builder {
    ($ty:ty, $field:ident) => {
        impl $ty {
            pub fn and(&mut self) -> &mut Self {
                self.$field.and();
                self
            }
            pub fn or(&mut self) -> &mut Self {
                self.$field.or();
                self
            }
            pub fn not(&mut self) -> &mut Self {
                self.$field.not();
                self
            }
            pub fn where_(&mut self, column: impl Into<String>, value: impl Into<$crate::query::predicate::Literal>) -> &mut Self {
                self.$field.where_(column, value);
                self
            }
            pub fn where_op(&mut self, column: impl Into<String>, op: &'static str, value: impl Into<$crate::query::predicate::Literal>) -> &mut Self {
                self.$field.where_op(column, op, value);
                self
            }
            pub fn where_not_equal(&mut self, column: impl Into<String>, value: impl Into<$crate::query::predicate::Literal>) -> &mut Self {
                self.$field.where_not_equal(column, value);
                self
            }
            pub fn where_in(&mut self, column: impl Into<String>, values: Vec<$crate::query::predicate::Literal>) -> &mut Self {
                self.$field.where_in(column, values);
                self
            }
            pub fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
                self.$field.where_null(column);
                self
            }
            pub fn where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
                self.$field.where_not_null(column);
                self
            }
            pub fn where_true(&mut self, column: impl Into<String>) -> &mut Self {
                self.$field.where_true(column);
                self
            }
            pub fn where_false(&mut self, column: impl Into<String>) -> &mut Self {
                self.$field.where_false(column);
                self
            }
            pub fn where_column(&mut self, left: impl Into<String>, op: &'static str, right: impl Into<String>) -> &mut Self {
                self.$field.where_column(left, op, right);
                self
            }
            pub fn group(&mut self, build: impl FnOnce(&mut $crate::query::predicate::PredicateBuilder)) -> &mut Self {
                self.$field.group(build);
                self
            }
        }
    };
}

pub(crate) use forward_predicate_builder;
