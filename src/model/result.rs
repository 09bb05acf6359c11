//! Oracle outputs and validated test results.

#![allow(missing_docs)]

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::case::{TestCase, TestKind};

/// Opaque key/value record produced by a detection oracle.
///
/// Recognized keys are exposed through typed accessors; anything else is
/// carried through to the report untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActualResult(Map<String, Value>);

impl ActualResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn fraud_alert_triggered(&self) -> Option<bool> {
        self.get("fraud_alert_triggered").and_then(Value::as_bool)
    }

    #[must_use]
    pub fn risk_score(&self) -> Option<f64> {
        self.get("risk_score").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.get("confidence").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn alert_priority(&self) -> Option<&str> {
        self.get("alert_priority").and_then(Value::as_str)
    }

    #[must_use]
    pub fn compliance_met(&self) -> Option<bool> {
        self.get("compliance_met").and_then(Value::as_bool)
    }

    #[must_use]
    pub fn max_response_time_ms(&self) -> Option<f64> {
        self.get("max_response_time_ms").and_then(Value::as_f64)
    }

    /// String entries of `fraud_indicators`; non-string entries are ignored.
    #[must_use]
    pub fn fraud_indicators(&self) -> Vec<&str> {
        self.string_list("fraud_indicators")
    }

    #[must_use]
    pub fn violations(&self) -> Vec<&str> {
        self.string_list("violations")
    }

    fn string_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Outcome of one executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Passed,
    Failed,
    /// The oracle could not be invoked.
    Blocked,
    Skipped,
}

impl TestStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a validation finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    FalseNegative,
    FalsePositive,
    ScoreDrift,
    SlaViolation,
    ComplianceViolation,
    OracleFailure,
}

/// Ordered: `Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingSeverity {
    /// Recorded but never fails a test.
    Warning,
    Error,
    /// Fails the test and blocks deployment.
    Critical,
}

/// One structured validation observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: FindingSeverity,
    pub message: String,
}

impl Finding {
    #[must_use]
    pub fn new(kind: FindingKind, severity: FindingSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }

    /// Whether this finding fails its test.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.severity >= FindingSeverity::Error
    }
}

/// Validated outcome for one test case. Created once; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case_id: String,
    pub kind: TestKind,
    pub status: TestStatus,
    #[serde(default)]
    pub actual_result: ActualResult,
    pub execution_time_ms: f64,
    pub timestamp: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl TestResult {
    /// Build a result from validator findings: FAILED iff any finding is a failure.
    #[must_use]
    pub fn from_findings(
        case: &TestCase,
        actual_result: ActualResult,
        findings: Vec<Finding>,
        execution_time_ms: f64,
    ) -> Self {
        let status = if findings.iter().any(Finding::is_failure) {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        };
        Self::assemble(case, status, actual_result, findings, execution_time_ms)
    }

    /// Result for a case whose oracle invocation failed.
    #[must_use]
    pub fn blocked(case: &TestCase, reason: &str, execution_time_ms: f64) -> Self {
        let finding = Finding::new(
            FindingKind::OracleFailure,
            FindingSeverity::Error,
            format!("Test execution failed: {reason}"),
        );
        Self::assemble(
            case,
            TestStatus::Blocked,
            ActualResult::new(),
            vec![finding],
            execution_time_ms,
        )
    }

    /// Result for a case that was deliberately not executed.
    #[must_use]
    pub fn skipped(case: &TestCase, reason: &str) -> Self {
        let finding = Finding::new(FindingKind::OracleFailure, FindingSeverity::Warning, reason);
        Self::assemble(case, TestStatus::Skipped, ActualResult::new(), vec![finding], 0.0)
    }

    fn assemble(
        case: &TestCase,
        status: TestStatus,
        actual_result: ActualResult,
        findings: Vec<Finding>,
        execution_time_ms: f64,
    ) -> Self {
        let errors = findings
            .iter()
            .filter(|f| f.is_failure())
            .map(|f| f.message.clone())
            .collect();
        let warnings = findings
            .iter()
            .filter(|f| !f.is_failure())
            .map(|f| f.message.clone())
            .collect();
        Self {
            test_case_id: case.id.clone(),
            kind: case.kind,
            status,
            actual_result,
            execution_time_ms: execution_time_ms.max(0.0),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            errors,
            warnings,
            findings,
        }
    }

    #[must_use]
    pub fn has_finding(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    /// FAILED with at least one critical finding.
    #[must_use]
    pub fn is_critical_failure(&self) -> bool {
        self.status == TestStatus::Failed
            && self
                .findings
                .iter()
                .any(|f| f.severity == FindingSeverity::Critical)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }

    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> TestCase {
        TestCase::new("TC-CARD-001", TestKind::FraudPositive, "Card Fraud")
    }

    #[test]
    fn accessors_read_recognized_keys() {
        let actual = ActualResult::new()
            .with("fraud_alert_triggered", true)
            .with("risk_score", 87)
            .with("confidence", 0.91)
            .with("fraud_indicators", serde_json::json!(["velocity", 7, "new_device"]))
            .with("vendor_trace", "abc");
        assert_eq!(actual.fraud_alert_triggered(), Some(true));
        assert_eq!(actual.risk_score(), Some(87.0));
        assert_eq!(actual.confidence(), Some(0.91));
        assert_eq!(actual.fraud_indicators(), vec!["velocity", "new_device"]);
        assert!(actual.violations().is_empty());
        assert_eq!(actual.get("vendor_trace"), Some(&Value::from("abc")));
    }

    #[test]
    fn wrongly_typed_keys_read_as_absent() {
        let actual = ActualResult::new()
            .with("fraud_alert_triggered", "yes")
            .with("risk_score", "high");
        assert_eq!(actual.fraud_alert_triggered(), None);
        assert_eq!(actual.risk_score(), None);
    }

    #[test]
    fn warnings_alone_never_fail() {
        let findings = vec![Finding::new(
            FindingKind::ScoreDrift,
            FindingSeverity::Warning,
            "Risk score variance: expected ~80, got 50",
        )];
        let result = TestResult::from_findings(&case(), ActualResult::new(), findings, 12.0);
        assert_eq!(result.status, TestStatus::Passed);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn error_findings_fail_and_fill_errors() {
        let findings = vec![
            Finding::new(FindingKind::FalseNegative, FindingSeverity::Error, "FALSE NEGATIVE"),
            Finding::new(FindingKind::ScoreDrift, FindingSeverity::Warning, "drift"),
        ];
        let result = TestResult::from_findings(&case(), ActualResult::new(), findings, 3.0);
        assert!(result.is_failed());
        assert_eq!(result.errors, vec!["FALSE NEGATIVE".to_string()]);
        assert_eq!(result.warnings, vec!["drift".to_string()]);
        assert!(result.has_finding(FindingKind::FalseNegative));
        assert!(!result.is_critical_failure());
    }

    #[test]
    fn critical_failure_requires_failed_status() {
        let findings = vec![Finding::new(
            FindingKind::FalseNegative,
            FindingSeverity::Critical,
            "CRITICAL FALSE NEGATIVE",
        )];
        let result = TestResult::from_findings(&case(), ActualResult::new(), findings, 1.0);
        assert!(result.is_critical_failure());
    }

    #[test]
    fn blocked_result_carries_oracle_failure() {
        let result = TestResult::blocked(&case(), "connection refused", 4.0);
        assert_eq!(result.status, TestStatus::Blocked);
        assert_eq!(result.kind, TestKind::FraudPositive);
        assert_eq!(
            result.errors,
            vec!["Test execution failed: connection refused".to_string()]
        );
        assert!(result.has_finding(FindingKind::OracleFailure));
    }

    #[test]
    fn negative_execution_time_is_clamped() {
        let result = TestResult::from_findings(&case(), ActualResult::new(), Vec::new(), -5.0);
        assert!(result.execution_time_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn status_serializes_as_name() {
        let result = TestResult::skipped(&case(), "not selected");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "SKIPPED");
        assert_eq!(value["kind"], "FRAUD_POSITIVE");
        assert_eq!(value["findings"][0]["severity"], "WARNING");
    }
}
