//! QA rule and violation types.
//!
//! Rules are described by [`QaRule`]; evaluating them yields an ordered list
//! of [`QaViolation`]s, each tagged with a [`Severity`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{geometry::Point, network::AttributeValue};

/// The severity level of a violation.
///
/// - [`Severity::Error`] marks a design that does not meet a requirement
/// - [`Severity::Warning`] marks a condition that should be reviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A requirement is not met.
    Error,

    /// An advisory finding.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Static description of a QA rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Threshold section the rule belongs to (`sewer`, `ada`, `schedule`).
    pub category: String,
}

impl QaRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            severity,
            category: category.into(),
        }
    }
}

/// A single rule finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaViolation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub location: Option<Point>,
    /// Id of the offending feature (edge id, element index, table title).
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub details: IndexMap<String, AttributeValue>,
}

impl QaViolation {
    /// Creates a violation for `rule`, inheriting its severity.
    pub fn new(rule: &QaRule, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            severity: rule.severity,
            message: message.into(),
            location: None,
            reference: None,
            details: IndexMap::new(),
        }
    }

    /// Sets the location, builder style.
    pub fn at(mut self, location: Option<Point>) -> Self {
        self.location = location;
        self
    }

    /// Sets the feature reference, builder style.
    pub fn referencing(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Adds a detail entry, builder style.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display_and_predicates() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert!(Severity::Error.is_error());
        assert!(Severity::Warning.is_warning());
        assert!(!Severity::Warning.is_error());
    }

    #[test]
    fn test_violation_inherits_rule_severity() {
        let rule = QaRule::new(
            "sewer_min_slope",
            "Minimum sewer slope",
            "Gravity pipes must meet the minimum slope",
            Severity::Error,
            "sewer",
        );
        let violation = QaViolation::new(&rule, "too flat")
            .referencing("P-1")
            .with_detail("slope_percent", 0.3);

        assert_eq!(violation.rule_id, "sewer_min_slope");
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.reference.as_deref(), Some("P-1"));
        assert_eq!(
            violation.details.get("slope_percent"),
            Some(&AttributeValue::Float(0.3))
        );
    }

    #[test]
    fn test_violation_serializes_plainly() {
        let rule = QaRule::new("r", "r", "r", Severity::Warning, "schedule");
        let violation = QaViolation::new(&rule, "msg");
        let value = serde_json::to_value(&violation).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["message"], "msg");
    }
}
