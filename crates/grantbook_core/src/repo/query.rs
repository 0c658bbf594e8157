//! Parameterized WHERE-clause builder for filter criteria.
//!
//! # Invariants
//! - Field names are static column names chosen by the store; caller values
//!   only ever travel as positional arguments.
//! - `Any` criteria produce no predicate and no argument.
//! - Predicate and argument order follow call order exactly.

use crate::model::filter::{Criterion, TextCriterion};
use rusqlite::types::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    predicates: Vec<String>,
    args: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a numeric id criterion.
    pub fn id(mut self, field: &'static str, criterion: &Criterion) -> Self {
        match criterion {
            Criterion::Any => {}
            Criterion::Eq(value) => {
                self.predicates.push(format!("{field} = ?"));
                self.args.push(Value::Integer(*value));
            }
        }
        self
    }

    /// Adds a text criterion.
    pub fn text(mut self, field: &'static str, criterion: &TextCriterion) -> Self {
        match criterion {
            TextCriterion::Any => {}
            TextCriterion::Eq(value) => {
                self.predicates.push(format!("{field} = ?"));
                self.args.push(Value::Text(value.clone()));
            }
            TextCriterion::Like(pattern) => {
                self.predicates.push(format!("{field} LIKE ?"));
                self.args.push(Value::Text(pattern.clone()));
            }
        }
        self
    }

    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Appends ` WHERE p1 AND p2 ...` when at least one predicate exists.
    pub fn append_where(&self, base: &str) -> String {
        if self.predicates.is_empty() {
            return base.to_string();
        }
        format!("{base} WHERE {}", self.predicates.join(" AND "))
    }

    /// Builds a paged select: WHERE clause, ordering, then `LIMIT ? OFFSET ?`.
    ///
    /// Returns the SQL text and the full positional argument list.
    pub fn select_page(
        &self,
        base: &str,
        order_by: &str,
        offset: i64,
        limit: i64,
    ) -> (String, Vec<Value>) {
        let sql = format!(
            "{} ORDER BY {order_by} LIMIT ? OFFSET ?",
            self.append_where(base)
        );
        let mut args = self.args.clone();
        args.push(Value::Integer(limit));
        args.push(Value::Integer(offset));
        (sql, args)
    }
}
