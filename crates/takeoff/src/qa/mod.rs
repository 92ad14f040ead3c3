//! Design-rule validation.
//!
//! The [`QaEngine`] runs an ordered list of [`QaCheck`]s over a
//! [`QaContext`] and returns their violations in check order. The default
//! checks are:
//!
//! | Rule | Severity | Finds |
//! |------|----------|-------|
//! | `sewer_min_slope` | error | gravity pipes flatter than the minimum slope |
//! | `sewer_max_slope` | warning | gravity pipes steeper than the maximum slope |
//! | `ada_ramp_slope` | error | ramps graded steeper than the ADA maximum |
//! | `ada_ramp_width` | warning | ramp strokes wider than expected |
//! | `schedule_reconciliation` | warning | scheduled cut/fill far from measured volumes |
//! | `schedule_station_order` | warning | schedule rows whose end station precedes the start |
//!
//! Thresholds come from [`QaThresholds`]. Checks can be added or removed, so
//! the rule set is data rather than code paths.

mod rules;
mod thresholds;

pub use rules::{
    AdaRampSlope, AdaRampWidth, QaCheck, QaContext, ScheduleReconciliation, ScheduleStationOrder,
    SewerMaxSlope, SewerMinSlope, default_checks, relative_difference_percent,
};
pub use thresholds::{AdaThresholds, QaThresholds, ScheduleThresholds, SewerThresholds};

use std::{fs, path::Path};

use indexmap::IndexMap;
use log::{error, info};
use serde::{Deserialize, Serialize};

use takeoff_core::qa::{QaRule, QaViolation, Severity};

/// Violation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Counts by severity name, in first-seen order.
    pub by_severity: IndexMap<String, usize>,
    /// Counts by rule id, in first-seen order.
    pub by_rule: IndexMap<String, usize>,
}

impl QaSummary {
    /// Returns true when any violation is an error.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// The document written by [`QaEngine::export`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub summary: QaSummary,
    pub violations: Vec<QaViolation>,
}

/// Evaluates QA checks.
pub struct QaEngine {
    checks: Vec<Box<dyn QaCheck>>,
}

impl QaEngine {
    /// Creates an engine with the default checks.
    pub fn new(thresholds: &QaThresholds) -> Self {
        Self {
            checks: default_checks(thresholds),
        }
    }

    /// Creates an engine with no checks.
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    /// Appends a check, builder style.
    pub fn with_check(mut self, check: Box<dyn QaCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Removes every check with the given rule id, builder style.
    pub fn without_rule(mut self, rule_id: &str) -> Self {
        self.checks.retain(|check| check.rule().id != rule_id);
        self
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &QaRule> {
        self.checks.iter().map(|check| check.rule())
    }

    /// Runs every check in order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use takeoff::qa::{QaContext, QaEngine, QaThresholds};
    /// # use takeoff_core::{category::Category, network::{Edge, EdgeType, Network}};
    /// let mut network = Network::new("sewer", "Sewer", Category::Sewer);
    /// network.add_edge(Edge::new("P-1", EdgeType::Pipe, "MH-1", "MH-2").with_slope_percent(0.3));
    /// let networks = [network];
    ///
    /// let engine = QaEngine::new(&QaThresholds::default());
    /// let violations = engine.evaluate(&QaContext { networks: &networks, ..QaContext::default() });
    /// assert_eq!(violations.len(), 1);
    /// assert_eq!(violations[0].rule_id, "sewer_min_slope");
    /// ```
    pub fn evaluate(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        let violations: Vec<QaViolation> = self
            .checks
            .iter()
            .flat_map(|check| check.check(context))
            .collect();
        info!(
            rules_count = self.checks.len(),
            violations_count = violations.len();
            "QA finished"
        );
        violations
    }

    /// Counts violations by severity and rule.
    pub fn summarize(violations: &[QaViolation]) -> QaSummary {
        let mut summary = QaSummary {
            total: violations.len(),
            ..QaSummary::default()
        };
        for violation in violations {
            match violation.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            *summary
                .by_severity
                .entry(violation.severity.to_string())
                .or_default() += 1;
            *summary.by_rule.entry(violation.rule_id.clone()).or_default() += 1;
        }
        summary
    }

    /// Writes violations and their summary as JSON.
    ///
    /// Returns `false` when the document could not be written; the failure is
    /// logged, never raised.
    pub fn export(violations: &[QaViolation], path: &Path) -> bool {
        let report = ViolationReport {
            summary: Self::summarize(violations),
            violations: violations.to_vec(),
        };
        let result = serde_json::to_string_pretty(&report)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(path, json).map_err(|err| err.to_string()));
        match result {
            Ok(()) => {
                info!(path:? = path, violations_count = violations.len(); "Violations exported");
                true
            }
            Err(err) => {
                error!(path:? = path, err; "Failed to export violations");
                false
            }
        }
    }
}

impl Default for QaEngine {
    fn default() -> Self {
        Self::new(&QaThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::{
        category::Category,
        network::{Edge, EdgeType, Network},
    };

    use super::*;

    fn networks() -> Vec<Network> {
        let mut network = Network::new("storm", "Storm", Category::Storm);
        network.add_edge(Edge::new("S-1", EdgeType::Pipe, "CB-1", "CB-2").with_slope_percent(0.2));
        network.add_edge(Edge::new("S-2", EdgeType::Pipe, "CB-2", "CB-3").with_slope_percent(15.0));
        network.add_edge(Edge::new("S-3", EdgeType::Pipe, "CB-3", "CB-4").with_slope_percent(0.1));
        vec![network]
    }

    #[test]
    fn test_default_rules_in_order() {
        let ids: Vec<String> = QaEngine::default().rules().map(|r| r.id.clone()).collect();
        assert_eq!(
            ids,
            [
                "sewer_min_slope",
                "sewer_max_slope",
                "ada_ramp_slope",
                "ada_ramp_width",
                "schedule_reconciliation",
                "schedule_station_order",
            ]
        );
    }

    #[test]
    fn test_evaluate_orders_by_check() {
        let networks = networks();
        let violations = QaEngine::default().evaluate(&QaContext {
            networks: &networks,
            ..QaContext::default()
        });
        let found: Vec<(&str, &str)> = violations
            .iter()
            .map(|v| (v.rule_id.as_str(), v.reference.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(
            found,
            [
                ("sewer_min_slope", "S-1"),
                ("sewer_min_slope", "S-3"),
                ("sewer_max_slope", "S-2"),
            ]
        );
    }

    #[test]
    fn test_thresholds_change_results() {
        let networks = networks();
        let mut thresholds = QaThresholds::default();
        thresholds.sewer.min_slope_percent = 0.15;
        thresholds.sewer.max_slope_percent = 20.0;
        let violations = QaEngine::new(&thresholds).evaluate(&QaContext {
            networks: &networks,
            ..QaContext::default()
        });
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_without_rule() {
        let networks = networks();
        let engine = QaEngine::default().without_rule("sewer_min_slope");
        let violations = engine.evaluate(&QaContext {
            networks: &networks,
            ..QaContext::default()
        });
        assert_eq!(violations.len(), 1);
        assert_eq!(engine.rules().count(), 5);
    }

    #[test]
    fn test_empty_context_has_no_violations() {
        assert!(QaEngine::default().evaluate(&QaContext::default()).is_empty());
        assert!(QaEngine::empty().evaluate(&QaContext::default()).is_empty());
    }

    #[test]
    fn test_summarize() {
        let networks = networks();
        let violations = QaEngine::default().evaluate(&QaContext {
            networks: &networks,
            ..QaContext::default()
        });
        let summary = QaEngine::summarize(&violations);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 1);
        assert!(summary.has_errors());
        assert_eq!(summary.by_severity["error"], 2);
        assert_eq!(summary.by_rule["sewer_min_slope"], 2);
        assert_eq!(summary.by_rule["sewer_max_slope"], 1);
    }

    #[test]
    fn test_export_writes_document() {
        let networks = networks();
        let violations = QaEngine::default().evaluate(&QaContext {
            networks: &networks,
            ..QaContext::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("violations.json");

        assert!(QaEngine::export(&violations, &path));
        let report: ViolationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.summary.errors, 2);
    }

    #[test]
    fn test_export_failure_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("violations.json");
        assert!(!QaEngine::export(&[], &path));
    }
}
