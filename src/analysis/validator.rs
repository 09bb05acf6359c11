//! Result validator: compares a case's expectation with the oracle's output.

#![allow(missing_docs)]

use crate::core::config::ValidationConfig;
use crate::model::{
    ActualResult, Finding, FindingKind, FindingSeverity, TestCase, TestKind, TestResult,
    TestStatus,
};

/// Findings produced for one `(case, actual)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub findings: Vec<Finding>,
}

impl Validation {
    /// FAILED iff any finding is error-or-worse; warnings never fail a test.
    #[must_use]
    pub fn status(&self) -> TestStatus {
        if self.findings.iter().any(Finding::is_failure) {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        }
    }

    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.findings
            .iter()
            .filter(|f| f.is_failure())
            .map(|f| f.message.as_str())
            .collect()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.findings
            .iter()
            .filter(|f| !f.is_failure())
            .map(|f| f.message.as_str())
            .collect()
    }

    /// Seal into an immutable result.
    #[must_use]
    pub fn into_result(
        self,
        case: &TestCase,
        actual: ActualResult,
        execution_time_ms: f64,
    ) -> TestResult {
        TestResult::from_findings(case, actual, self.findings, execution_time_ms)
    }
}

/// Stateless validator parameterized by tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultValidator {
    risk_score_tolerance: f64,
    default_max_response_time_ms: f64,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

impl ResultValidator {
    #[must_use]
    pub fn from_config(cfg: &ValidationConfig) -> Self {
        Self {
            risk_score_tolerance: cfg.risk_score_tolerance,
            default_max_response_time_ms: cfg.default_max_response_time_ms,
        }
    }

    /// Validate one oracle output. Mismatches are data, never faults.
    #[must_use]
    pub fn validate(&self, case: &TestCase, actual: &ActualResult) -> Validation {
        let mut findings = Vec::new();
        let expected = &case.expected_result;

        if let Some(expected_alert) = expected.fraud_alert_triggered {
            // Absent flag reads as "no alert raised".
            let got_alert = actual.fraud_alert_triggered().unwrap_or(false);
            if expected_alert && !got_alert {
                findings.push(false_negative(expected.is_critical_priority()));
            } else if !expected_alert && got_alert {
                findings.push(Finding::new(
                    FindingKind::FalsePositive,
                    FindingSeverity::Error,
                    "FALSE POSITIVE: Legitimate transaction flagged (expected no alert, got alert)",
                ));
            }
        }

        if let Some(expected_score) = expected.risk_score {
            match actual.risk_score() {
                Some(got) if (expected_score - got).abs() > self.risk_score_tolerance => {
                    findings.push(Finding::new(
                        FindingKind::ScoreDrift,
                        FindingSeverity::Warning,
                        format!(
                            "Risk score variance: expected ~{}, got {}",
                            fmt_num(expected_score),
                            fmt_num(got)
                        ),
                    ));
                }
                Some(_) => {}
                None => findings.push(Finding::new(
                    FindingKind::ScoreDrift,
                    FindingSeverity::Warning,
                    format!(
                        "Risk score variance: expected ~{}, got none",
                        fmt_num(expected_score)
                    ),
                )),
            }
        }

        match case.kind {
            TestKind::Performance => {
                let sla = case
                    .max_allowed_response_time_ms()
                    .unwrap_or(self.default_max_response_time_ms);
                let observed = actual.max_response_time_ms().unwrap_or(0.0);
                if observed > sla {
                    findings.push(Finding::new(
                        FindingKind::SlaViolation,
                        FindingSeverity::Error,
                        format!(
                            "Performance SLA violation: {}ms > {}ms",
                            fmt_num(observed),
                            fmt_num(sla)
                        ),
                    ));
                }
            }
            TestKind::Compliance => {
                if actual.compliance_met() == Some(false) {
                    findings.push(Finding::new(
                        FindingKind::ComplianceViolation,
                        FindingSeverity::Error,
                        format!(
                            "Compliance validation failed: [{}]",
                            actual.violations().join(", ")
                        ),
                    ));
                }
            }
            TestKind::FraudPositive | TestKind::Legitimate | TestKind::Edge => {}
        }

        Validation { findings }
    }
}

fn false_negative(critical: bool) -> Finding {
    if critical {
        Finding::new(
            FindingKind::FalseNegative,
            FindingSeverity::Critical,
            "FALSE NEGATIVE: Fraud not detected (expected alert, got none) [CRITICAL priority]",
        )
    } else {
        Finding::new(
            FindingKind::FalseNegative,
            FindingSeverity::Error,
            "FALSE NEGATIVE: Fraud not detected (expected alert, got none)",
        )
    }
}

/// Integers print without a fraction; everything else to two places.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
