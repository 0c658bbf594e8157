//! Typed filter criteria for account/privilege lookups.
//!
//! # Responsibility
//! - Describe per-field match conditions without carrying SQL text.
//! - Keep criterion construction pure; nothing here touches storage.
//!
//! # Invariants
//! - Numeric id fields only support `Any` / `Eq`.
//! - Pattern matching is only available on text fields and uses the
//!   backend's native `LIKE` syntax (`%`, `_`).

use serde::{Deserialize, Serialize};

/// Criterion for numeric id fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Criterion {
    /// Matches every row.
    #[default]
    Any,
    /// Exact match.
    Eq(i64),
}

/// Criterion for text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum TextCriterion {
    /// Matches every row.
    #[default]
    Any,
    /// Exact match.
    Eq(String),
    /// Pattern match, e.g. `User%` or `%@cool.com`.
    Like(String),
}

impl TextCriterion {
    pub fn eq(value: impl Into<String>) -> Self {
        Self::Eq(value.into())
    }

    pub fn like(pattern: impl Into<String>) -> Self {
        Self::Like(pattern.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl Criterion {
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// Filter over the `account` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    #[serde(default)]
    pub id: Criterion,
    #[serde(default)]
    pub name: TextCriterion,
    #[serde(default)]
    pub email: TextCriterion,
}

impl AccountFilter {
    pub fn id_eq(mut self, id: i64) -> Self {
        self.id = Criterion::Eq(id);
        self
    }

    pub fn name_eq(mut self, name: impl Into<String>) -> Self {
        self.name = TextCriterion::eq(name);
        self
    }

    pub fn name_like(mut self, pattern: impl Into<String>) -> Self {
        self.name = TextCriterion::like(pattern);
        self
    }

    pub fn email_eq(mut self, email: impl Into<String>) -> Self {
        self.email = TextCriterion::eq(email);
        self
    }

    pub fn email_like(mut self, pattern: impl Into<String>) -> Self {
        self.email = TextCriterion::like(pattern);
        self
    }
}

/// Filter over the `privilege` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeFilter {
    #[serde(default)]
    pub id: Criterion,
    #[serde(default)]
    pub name: TextCriterion,
    #[serde(default)]
    pub description: TextCriterion,
}

impl PrivilegeFilter {
    pub fn id_eq(mut self, id: i64) -> Self {
        self.id = Criterion::Eq(id);
        self
    }

    pub fn name_eq(mut self, name: impl Into<String>) -> Self {
        self.name = TextCriterion::eq(name);
        self
    }

    pub fn name_like(mut self, pattern: impl Into<String>) -> Self {
        self.name = TextCriterion::like(pattern);
        self
    }

    pub fn description_like(mut self, pattern: impl Into<String>) -> Self {
        self.description = TextCriterion::like(pattern);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountFilter, Criterion, TextCriterion};

    #[test]
    fn default_filter_matches_everything() {
        let filter = AccountFilter::default();
        assert!(filter.id.is_any());
        assert!(filter.name.is_any());
        assert!(filter.email.is_any());
    }

    #[test]
    fn builder_sets_only_requested_fields() {
        let filter = AccountFilter::default().name_like("User%").id_eq(7);
        assert_eq!(filter.name, TextCriterion::Like("User%".to_string()));
        assert_eq!(filter.id, Criterion::Eq(7));
        assert!(filter.email.is_any());
    }

    #[test]
    fn criterion_serializes_with_op_tag() {
        let json = serde_json::to_string(&TextCriterion::like("%@cool.com")).unwrap();
        assert_eq!(json, r#"{"op":"like","value":"%@cool.com"}"#);
        let any = serde_json::to_string(&Criterion::Any).unwrap();
        assert_eq!(any, r#"{"op":"any"}"#);
    }
}
