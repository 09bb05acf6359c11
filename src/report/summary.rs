//! Run summary: metrics, failure breakdown, hallucination roll-up and insights.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::hallucination::{HallucinationCheck, HallucinationSeverity};
use crate::analysis::metrics::{
    AccuracyMetrics, OverallMetrics, PerformanceMetrics, accuracy_metrics, overall_metrics,
    performance_metrics, ratio,
};
use crate::analysis::risk::{RiskAssessment, RiskLevel};
use crate::analysis::round2;
use crate::model::{FindingKind, TestKind, TestResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalFailure {
    pub test_case_id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub total_failures: usize,
    /// Failed results per test kind label.
    pub by_kind: BTreeMap<String, usize>,
    pub critical_failures: Vec<CriticalFailure>,
    pub critical_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HallucinationSummary {
    pub total_checks: usize,
    pub hallucinations_detected: usize,
    /// Percentage of executed results that produced a check.
    pub hallucination_rate: f64,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub critical_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub top_risk: String,
    pub recommendations_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub overall_metrics: OverallMetrics,
    pub accuracy_metrics: AccuracyMetrics,
    pub performance_metrics: PerformanceMetrics,
    pub failure_analysis: FailureAnalysis,
    pub hallucination_summary: HallucinationSummary,
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment_summary: Option<RiskSummary>,
}

/// Build the summary for one finished cycle.
#[must_use]
pub fn create_summary(
    results: &[TestResult],
    checks: &[HallucinationCheck],
    assessment: Option<&RiskAssessment>,
) -> Summary {
    let accuracy = accuracy_metrics(results);
    let executed = results
        .iter()
        .filter(|r| r.is_passed() || r.is_failed())
        .count();
    let hallucinations = summarize_hallucinations(checks, executed);
    Summary {
        overall_metrics: overall_metrics(results),
        performance_metrics: performance_metrics(results),
        failure_analysis: analyze_failures(results),
        insights: insights(results, &accuracy, &hallucinations, assessment),
        accuracy_metrics: accuracy,
        hallucination_summary: hallucinations,
        risk_assessment_summary: assessment.map(|a| RiskSummary {
            overall_risk_score: a.overall_risk_score,
            risk_level: a.risk_level,
            top_risk: top_risk(a),
            recommendations_count: a.recommendations.len(),
        }),
    }
}

#[must_use]
pub fn analyze_failures(results: &[TestResult]) -> FailureAnalysis {
    let mut analysis = FailureAnalysis::default();
    for r in results.iter().filter(|r| r.is_failed()) {
        analysis.total_failures += 1;
        *analysis.by_kind.entry(r.kind.label().to_string()).or_default() += 1;
        if r.is_critical_failure() || r.has_finding(FindingKind::FalseNegative) {
            analysis.critical_failures.push(CriticalFailure {
                test_case_id: r.test_case_id.clone(),
                errors: r.errors.clone(),
            });
        }
    }
    analysis.critical_count = analysis.critical_failures.len();
    analysis
}

#[must_use]
pub fn summarize_hallucinations(
    checks: &[HallucinationCheck],
    executed: usize,
) -> HallucinationSummary {
    let mut summary = HallucinationSummary {
        total_checks: checks.len(),
        hallucination_rate: round2(ratio(checks.len(), executed) * 100.0),
        ..HallucinationSummary::default()
    };
    for check in checks {
        summary.hallucinations_detected += check.hallucinations_detected.len();
        *summary
            .by_severity
            .entry(check.severity.as_str().to_string())
            .or_default() += 1;
        for h in &check.hallucinations_detected {
            *summary.by_type.entry(h.kind.as_str().to_string()).or_default() += 1;
        }
    }
    summary.critical_count = checks
        .iter()
        .filter(|c| c.severity == HallucinationSeverity::Critical)
        .count();
    summary
}

/// Plain-language observations, most important first.
#[must_use]
pub fn insights(
    results: &[TestResult],
    accuracy: &AccuracyMetrics,
    hallucinations: &HallucinationSummary,
    assessment: Option<&RiskAssessment>,
) -> Vec<String> {
    let mut out = Vec::new();

    let recall = accuracy.recall;
    if recall >= 95.0 {
        out.push("OK: Excellent fraud detection accuracy (>95% recall)".to_string());
    } else if recall >= 85.0 {
        out.push("WARNING: Good fraud detection accuracy, but room for improvement".to_string());
    } else {
        out.push("CRITICAL: Fraud detection accuracy below target (<85% recall)".to_string());
    }

    let fp = accuracy.false_positive_rate;
    if fp > 15.0 {
        out.push(format!(
            "WARNING: High false positive rate ({fp}%) may cause customer friction"
        ));
    } else if fp > 10.0 {
        out.push(format!("WARNING: False positive rate ({fp}%) approaching threshold"));
    } else {
        out.push(format!("OK: False positive rate ({fp}%) within acceptable range"));
    }

    let fn_rate = accuracy.false_negative_rate;
    if fn_rate > 10.0 {
        out.push(format!(
            "CRITICAL: High false negative rate ({fn_rate}%) - significant fraud being missed"
        ));
    } else if fn_rate > 5.0 {
        out.push(format!(
            "WARNING: Elevated false negative rate ({fn_rate}%) - some fraud patterns not detected"
        ));
    }

    if hallucinations.hallucination_rate > 10.0 {
        out.push(format!(
            "WARNING: High hallucination rate ({:.1}%) in detection outputs - review model reliability",
            hallucinations.hallucination_rate
        ));
    }

    let perf_failures = results
        .iter()
        .filter(|r| r.kind == TestKind::Performance && r.is_failed())
        .count();
    if perf_failures > 0 {
        out.push(format!(
            "WARNING: Performance issues detected in {perf_failures} test(s)"
        ));
    }

    match assessment.map(|a| a.risk_level) {
        Some(RiskLevel::Critical) => out.push(
            "CRITICAL: CRITICAL risk level - immediate action required before deployment"
                .to_string(),
        ),
        Some(RiskLevel::High) => out.push(
            "WARNING: HIGH risk level - careful review and mitigation required".to_string(),
        ),
        _ => {}
    }
    out
}

/// Highest component as `"Name (score)"`; ties go to the earlier component.
#[must_use]
pub fn top_risk(assessment: &RiskAssessment) -> String {
    let candidates = [
        ("Detection Risk", assessment.detection_risk),
        ("False Positive Risk", assessment.false_positive_risk),
        ("Compliance Risk", assessment.compliance_risk),
        ("System Risk", assessment.system_risk),
    ];
    let (name, score) = candidates
        .into_iter()
        .fold(candidates[0], |best, c| if c.1 > best.1 { c } else { best });
    format!("{name} ({score:.1})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::hallucination::{Hallucination, HallucinationType};
    use crate::analysis::risk::RiskAnalyzer;
    use crate::model::{ActualResult, Finding, FindingSeverity, TestCase};

    fn result(id: &str, kind: TestKind, findings: Vec<Finding>) -> TestResult {
        TestResult::from_findings(&TestCase::new(id, kind, "x"), ActualResult::new(), findings, 10.0)
    }

    fn missed(id: &str, severity: FindingSeverity) -> TestResult {
        result(
            id,
            TestKind::FraudPositive,
            vec![Finding::new(FindingKind::FalseNegative, severity, "FALSE NEGATIVE: missed")],
        )
    }

    #[test]
    fn failures_grouped_by_kind_with_critical_list() {
        let results = vec![
            missed("TC-A-001", FindingSeverity::Critical),
            missed("TC-A-002", FindingSeverity::Error),
            result(
                "TC-PERF-003",
                TestKind::Performance,
                vec![Finding::new(FindingKind::SlaViolation, FindingSeverity::Error, "slow")],
            ),
            result("TC-A-004", TestKind::FraudPositive, Vec::new()),
        ];
        let fa = analyze_failures(&results);
        assert_eq!(fa.total_failures, 3);
        assert_eq!(fa.by_kind["FRAUD_POSITIVE"], 2);
        assert_eq!(fa.by_kind["PERFORMANCE"], 1);
        assert_eq!(fa.critical_count, 2);
        assert_eq!(fa.critical_failures[0].test_case_id, "TC-A-001");
        assert_eq!(fa.critical_failures[0].errors.len(), 1);
    }

    #[test]
    fn hallucination_rollup() {
        let checks = vec![
            HallucinationCheck::from_findings(
                "TC-1",
                vec![
                    Hallucination {
                        kind: HallucinationType::IncorrectCalculations,
                        description: "score 140".to_string(),
                        severity: HallucinationSeverity::Critical,
                        field: "risk_score".to_string(),
                    },
                    Hallucination {
                        kind: HallucinationType::InvalidLogic,
                        description: "alert with low score".to_string(),
                        severity: HallucinationSeverity::High,
                        field: "fraud_alert_triggered".to_string(),
                    },
                ],
            ),
            HallucinationCheck::from_findings(
                "TC-2",
                vec![Hallucination {
                    kind: HallucinationType::InvalidLogic,
                    description: "no alert with high score".to_string(),
                    severity: HallucinationSeverity::High,
                    field: "fraud_alert_triggered".to_string(),
                }],
            ),
        ];
        let s = summarize_hallucinations(&checks, 8);
        assert_eq!(s.total_checks, 2);
        assert_eq!(s.hallucinations_detected, 3);
        assert!((s.hallucination_rate - 25.0).abs() < 1e-9);
        assert_eq!(s.by_severity["CRITICAL"], 1);
        assert_eq!(s.by_severity["HIGH"], 1);
        assert_eq!(s.by_type["invalid_logic"], 2);
        assert_eq!(s.critical_count, 1);
    }

    #[test]
    fn hallucination_rate_ignores_blocked_and_skipped() {
        let mut results: Vec<TestResult> = (0..3)
            .map(|i| result(&format!("TC-{i}"), TestKind::FraudPositive, Vec::new()))
            .collect();
        let idle = TestCase::new("TC-8", TestKind::FraudPositive, "x");
        results.push(TestResult::blocked(&idle, "offline", 0.0));
        results.push(TestResult::skipped(&idle, "not run"));
        let checks = vec![HallucinationCheck::from_findings(
            "TC-0",
            vec![Hallucination {
                kind: HallucinationType::InvalidLogic,
                description: "alert with low score".to_string(),
                severity: HallucinationSeverity::High,
                field: "fraud_alert_triggered".to_string(),
            }],
        )];
        let s = create_summary(&results, &checks, None);
        assert!((s.hallucination_summary.hallucination_rate - 33.33).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_give_neutral_summary() {
        let s = create_summary(&[], &[], None);
        assert_eq!(s.overall_metrics.total_test_cases, 0);
        assert_eq!(s.hallucination_summary.hallucination_rate, 0.0);
        assert!(s.risk_assessment_summary.is_none());
        assert!(s.insights[0].contains("below target"));
    }

    #[test]
    fn insights_follow_thresholds() {
        let mut results: Vec<TestResult> = (0..9)
            .map(|i| result(&format!("TC-{i}"), TestKind::FraudPositive, Vec::new()))
            .collect();
        results.push(missed("TC-9", FindingSeverity::Error));
        let accuracy = accuracy_metrics(&results);
        let lines = insights(&results, &accuracy, &HallucinationSummary::default(), None);
        assert!(lines[0].starts_with("WARNING: Good fraud detection"));
        assert!(lines[1].starts_with("OK: False positive rate (0"));
        assert!(lines[2].contains("Elevated false negative rate (10"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn top_risk_picks_largest_component() {
        let analyzer = RiskAnalyzer::default();
        let results = vec![missed("TC-1", FindingSeverity::Error)];
        let assessment = analyzer.calculate_risk(&results);
        assert_eq!(top_risk(&assessment), "Detection Risk (100.0)");

        let summary = create_summary(&results, &[], Some(&assessment));
        let risk = summary.risk_assessment_summary.unwrap();
        assert_eq!(risk.top_risk, "Detection Risk (100.0)");
        assert_eq!(risk.recommendations_count, assessment.recommendations.len());
    }

    #[test]
    fn top_risk_tie_prefers_detection() {
        let assessment = RiskAnalyzer::default().calculate_risk(&[]);
        assert_eq!(top_risk(&assessment), "Detection Risk (0.0)");
    }
}
