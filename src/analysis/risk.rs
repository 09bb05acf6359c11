//! Weighted multi-factor risk analysis.
//!
//! Four components, each mapped from a raw rate (or count) to 0..=100:
//! detection (missed fraud), false positives (customer friction),
//! compliance (step function over failed audits) and system reliability
//! (performance failures plus blocked executions). The overall score is the
//! weighted sum of the rounded components, rounded to two places.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::metrics::ratio;
use crate::analysis::round2;
use crate::core::config::RiskConfig;
use crate::model::{FindingKind, TestKind, TestResult, TestStatus};

/// Continuous piecewise-linear map from a rate in `[0, ∞)` to a 0..=100 score.
///
/// Segments are interpolated between breakpoints; past the last breakpoint
/// the score grows with `tail_slope`. Output is capped at 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskCurve {
    points: &'static [(f64, f64)],
    tail_slope: f64,
}

impl RiskCurve {
    /// 5% FN → 20, 10% FN → 80.
    pub const DETECTION: Self = Self {
        points: &[(0.0, 0.0), (0.05, 20.0), (0.10, 80.0)],
        tail_slope: 200.0,
    };

    /// 10% FP → 30, 20% FP → 80.
    pub const FALSE_POSITIVE: Self = Self {
        points: &[(0.0, 0.0), (0.10, 30.0), (0.20, 80.0)],
        tail_slope: 100.0,
    };

    /// 2% → 20, 5% → 60.
    pub const SYSTEM: Self = Self {
        points: &[(0.0, 0.0), (0.02, 20.0), (0.05, 60.0)],
        tail_slope: 800.0,
    };

    #[must_use]
    pub const fn breakpoints(&self) -> &'static [(f64, f64)] {
        self.points
    }

    #[must_use]
    pub fn score(&self, rate: f64) -> f64 {
        let rate = if rate.is_nan() { 0.0 } else { rate.max(0.0) };
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if rate <= x1 {
                let t = (rate - x0) / (x1 - x0);
                return clamp_score(y0 + t * (y1 - y0));
            }
        }
        let (x_last, y_last) = self.points[self.points.len() - 1];
        clamp_score(y_last + (rate - x_last) * self.tail_slope)
    }
}

/// Clamp to `[0, 100]`.
#[must_use]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Categorical bucket of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Closed lower bounds: `>= critical`, `>= high`, `>= medium`, else LOW.
    #[must_use]
    pub fn from_score(score: f64, cfg: &RiskConfig) -> Self {
        if score >= cfg.critical_threshold {
            Self::Critical
        } else if score >= cfg.high_threshold {
            Self::High
        } else if score >= cfg.medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unweighted component scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub detection: f64,
    pub false_positive: f64,
    pub compliance: f64,
    pub system: f64,
}

impl RiskComponents {
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        Self {
            detection: detection_risk(results),
            false_positive: false_positive_risk(results),
            compliance: compliance_risk(results),
            system: system_risk(results),
        }
    }

    /// Each component clamped and rounded to two places.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            detection: round2(clamp_score(self.detection)),
            false_positive: round2(clamp_score(self.false_positive)),
            compliance: round2(clamp_score(self.compliance)),
            system: round2(clamp_score(self.system)),
        }
    }

    /// `(name, score, weight)` in a fixed order.
    #[must_use]
    pub fn weighted_terms(&self, cfg: &RiskConfig) -> [(&'static str, f64, f64); 4] {
        [
            ("detection_risk", self.detection, cfg.detection_weight),
            (
                "false_positive_risk",
                self.false_positive,
                cfg.false_positive_weight,
            ),
            ("compliance_risk", self.compliance, cfg.compliance_weight),
            ("system_risk", self.system, cfg.system_weight),
        ]
    }

    /// Weighted sum, unrounded.
    #[must_use]
    pub fn weighted_sum(&self, cfg: &RiskConfig) -> f64 {
        self.weighted_terms(cfg)
            .iter()
            .map(|(_, score, weight)| score * weight)
            .sum()
    }
}

/// One cycle's risk verdict. Created once; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub detection_risk: f64,
    pub false_positive_risk: f64,
    pub compliance_risk: f64,
    pub system_risk: f64,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    #[must_use]
    pub fn components(&self) -> RiskComponents {
        RiskComponents {
            detection: self.detection_risk,
            false_positive: self.false_positive_risk,
            compliance: self.compliance_risk,
            system: self.system_risk,
        }
    }
}

/// Missed-fraud share of executed fraud-positive tests through [`RiskCurve::DETECTION`].
#[must_use]
pub fn detection_risk(results: &[TestResult]) -> f64 {
    let (hits, total) = rate_parts(results, TestKind::FraudPositive, FindingKind::FalseNegative);
    RiskCurve::DETECTION.score(ratio(hits, total))
}

/// False-alert share of executed legitimate tests through [`RiskCurve::FALSE_POSITIVE`].
#[must_use]
pub fn false_positive_risk(results: &[TestResult]) -> f64 {
    let (hits, total) = rate_parts(results, TestKind::Legitimate, FindingKind::FalsePositive);
    RiskCurve::FALSE_POSITIVE.score(ratio(hits, total))
}

/// Step function over failed compliance tests.
#[must_use]
pub fn compliance_risk(results: &[TestResult]) -> f64 {
    let failures = results
        .iter()
        .filter(|r| r.kind == TestKind::Compliance && r.status == TestStatus::Failed)
        .count();
    compliance_step(failures)
}

/// 0 → 0, 1 → 60, 2 → 85, 3+ → 100.
#[must_use]
pub const fn compliance_step(failures: usize) -> f64 {
    match failures {
        0 => 0.0,
        1 => 60.0,
        2 => 85.0,
        _ => 100.0,
    }
}

/// `(failed performance + blocked) / total` through [`RiskCurve::SYSTEM`].
#[must_use]
pub fn system_risk(results: &[TestResult]) -> f64 {
    let failing = results
        .iter()
        .filter(|r| {
            r.status == TestStatus::Blocked
                || (r.kind == TestKind::Performance && r.status == TestStatus::Failed)
        })
        .count();
    RiskCurve::SYSTEM.score(ratio(failing, results.len()))
}

/// Blocked and skipped results carry no verdict; they only feed system risk.
/// This keeps the denominator equal to the confusion-matrix totals.
fn rate_parts(results: &[TestResult], kind: TestKind, finding: FindingKind) -> (usize, usize) {
    results
        .iter()
        .filter(|r| r.kind == kind && matches!(r.status, TestStatus::Passed | TestStatus::Failed))
        .fold((0, 0), |(hits, total), r| {
            let hit = r.status == TestStatus::Failed && r.has_finding(finding);
            (hits + usize::from(hit), total + 1)
        })
}

const PASS_RATE_FLOOR_FAIL_SHARE: f64 = 0.15;

/// Turns results into a [`RiskAssessment`].
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAnalyzer {
    cfg: RiskConfig,
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskAnalyzer {
    #[must_use]
    pub fn new(cfg: RiskConfig) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.cfg
    }

    #[must_use]
    pub fn calculate_risk(&self, results: &[TestResult]) -> RiskAssessment {
        let failed = results.iter().filter(|r| r.is_failed()).count();
        self.assess(RiskComponents::from_results(results), failed, results.len())
    }

    /// Assess precomputed components. `failed`/`total` drive the pass-rate advisory.
    #[must_use]
    pub fn assess(&self, components: RiskComponents, failed: usize, total: usize) -> RiskAssessment {
        let components = components.rounded();
        let overall = round2(clamp_score(components.weighted_sum(&self.cfg)));
        RiskAssessment {
            overall_risk_score: overall,
            risk_level: RiskLevel::from_score(overall, &self.cfg),
            detection_risk: components.detection,
            false_positive_risk: components.false_positive,
            compliance_risk: components.compliance,
            system_risk: components.system,
            recommendations: recommendations(&components, failed, total),
        }
    }
}

/// Advisory text, gated per component; a single approval line when nothing fires.
#[must_use]
pub fn recommendations(c: &RiskComponents, failed: usize, total: usize) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();

    if c.detection >= 75.0 {
        out.push(
            "CRITICAL: High false negative rate detected. Immediately review and retrain fraud detection models.",
        );
    } else if c.detection >= 50.0 {
        out.push(
            "HIGH: Elevated false negative rate. Review detection rules and thresholds for missed fraud patterns.",
        );
    } else if c.detection >= 25.0 {
        out.push("MEDIUM: Some fraud patterns being missed. Fine-tune detection rules for identified gaps.");
    }

    if c.false_positive >= 75.0 {
        out.push(
            "CRITICAL: High false positive rate causing customer friction. Adjust overly aggressive rules.",
        );
    } else if c.false_positive >= 50.0 {
        out.push("HIGH: Elevated false positive rate. Optimize risk scoring to reduce false alerts.");
    }

    if c.compliance >= 60.0 {
        out.push(
            "BLOCKING: Compliance violations detected. Fix all compliance gaps before production deployment.",
        );
    } else if c.compliance >= 30.0 {
        out.push("Compliance concerns identified. Address and re-validate before deployment.");
    }

    if c.system >= 60.0 {
        out.push(
            "CRITICAL: System reliability issues detected. Conduct capacity planning and optimize critical paths.",
        );
    } else if c.system >= 30.0 {
        out.push("System performance concerns. Optimize slow paths before deployment.");
    }

    if ratio(failed, total) > PASS_RATE_FLOOR_FAIL_SHARE {
        out.push("Overall test pass rate below 85%. Comprehensive remediation required before deployment.");
    }

    if out.is_empty() {
        out.push(APPROVED_RECOMMENDATION);
    }
    out.into_iter().map(str::to_string).collect()
}

/// Emitted alone when no advisory rule fires.
pub const APPROVED_RECOMMENDATION: &str =
    "All risk metrics within acceptable ranges. System appears ready for deployment pending final approvals.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActualResult, Finding, FindingSeverity, TestCase};

    fn passed(kind: TestKind) -> TestResult {
        TestResult::from_findings(&TestCase::new("TC", kind, "x"), ActualResult::new(), Vec::new(), 1.0)
    }

    fn failed(kind: TestKind, finding: FindingKind) -> TestResult {
        TestResult::from_findings(
            &TestCase::new("TC", kind, "x"),
            ActualResult::new(),
            vec![Finding::new(finding, FindingSeverity::Error, "x")],
            1.0,
        )
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn curves_hit_breakpoints_exactly() {
        assert!(approx(RiskCurve::DETECTION.score(0.05), 20.0));
        assert!(approx(RiskCurve::DETECTION.score(0.10), 80.0));
        assert!(approx(RiskCurve::FALSE_POSITIVE.score(0.10), 30.0));
        assert!(approx(RiskCurve::FALSE_POSITIVE.score(0.20), 80.0));
        assert!(approx(RiskCurve::SYSTEM.score(0.02), 20.0));
        assert!(approx(RiskCurve::SYSTEM.score(0.05), 60.0));
    }

    #[test]
    fn curves_are_continuous_at_breakpoints() {
        for curve in [RiskCurve::DETECTION, RiskCurve::FALSE_POSITIVE, RiskCurve::SYSTEM] {
            for &(x, y) in curve.breakpoints() {
                let below = curve.score((x - 1e-9).max(0.0));
                let above = curve.score(x + 1e-9);
                assert!((below - y).abs() < 1e-4, "gap below {x}: {below} vs {y}");
                assert!((above - y).abs() < 1e-4, "gap above {x}: {above} vs {y}");
            }
        }
    }

    #[test]
    fn curve_segments_match_published_slopes() {
        assert!(approx(RiskCurve::DETECTION.score(0.025), 10.0));
        assert!(approx(RiskCurve::DETECTION.score(0.075), 50.0));
        assert!(approx(RiskCurve::DETECTION.score(0.15), 90.0));
        assert!(approx(RiskCurve::FALSE_POSITIVE.score(0.15), 55.0));
        assert!(approx(RiskCurve::FALSE_POSITIVE.score(0.30), 90.0));
        assert!(approx(RiskCurve::SYSTEM.score(0.01), 10.0));
        assert!(approx(RiskCurve::SYSTEM.score(0.10), 100.0));
    }

    #[test]
    fn curves_cap_at_100_and_floor_at_0() {
        assert!(approx(RiskCurve::DETECTION.score(1.0), 100.0));
        assert!(approx(RiskCurve::SYSTEM.score(5.0), 100.0));
        assert!(approx(RiskCurve::FALSE_POSITIVE.score(-0.3), 0.0));
        assert!(approx(RiskCurve::DETECTION.score(f64::NAN), 0.0));
    }

    #[test]
    fn scenario_a_ten_percent_false_negatives() {
        let mut results: Vec<TestResult> = (0..9).map(|_| passed(TestKind::FraudPositive)).collect();
        results.push(failed(TestKind::FraudPositive, FindingKind::FalseNegative));
        assert!(approx(detection_risk(&results), 80.0));
    }

    #[test]
    fn detection_ignores_failures_without_false_negative() {
        let results = vec![
            failed(TestKind::FraudPositive, FindingKind::SlaViolation),
            passed(TestKind::FraudPositive),
            failed(TestKind::Edge, FindingKind::FalseNegative),
        ];
        assert!(approx(detection_risk(&results), 0.0));
    }

    #[test]
    fn scenario_b_compliance_steps() {
        for (n, expected) in [(0, 0.0), (1, 60.0), (2, 85.0), (3, 100.0), (7, 100.0)] {
            let mut results: Vec<TestResult> = (0..n)
                .map(|_| failed(TestKind::Compliance, FindingKind::ComplianceViolation))
                .collect();
            results.push(passed(TestKind::Compliance));
            assert!(approx(compliance_risk(&results), expected), "{n} failures");
        }
    }

    #[test]
    fn system_risk_counts_blocked_and_perf_failures() {
        let case = TestCase::new("TC", TestKind::FraudPositive, "x");
        let mut results: Vec<TestResult> = (0..98).map(|_| passed(TestKind::FraudPositive)).collect();
        results.push(TestResult::blocked(&case, "down", 0.0));
        results.push(failed(TestKind::Performance, FindingKind::SlaViolation));
        // 2 / 100 = 2% -> 20
        assert!(approx(system_risk(&results), 20.0));
    }

    #[test]
    fn false_positive_risk_uses_legitimate_tests() {
        let mut results: Vec<TestResult> = (0..4).map(|_| passed(TestKind::Legitimate)).collect();
        results.push(failed(TestKind::Legitimate, FindingKind::FalsePositive));
        // 20% -> 80
        assert!(approx(false_positive_risk(&results), 80.0));
    }

    #[test]
    fn blocked_fraud_case_shares_the_accuracy_denominator() {
        let mut results: Vec<TestResult> = (0..8).map(|_| passed(TestKind::FraudPositive)).collect();
        results.push(failed(TestKind::FraudPositive, FindingKind::FalseNegative));
        results.push(TestResult::blocked(
            &TestCase::new("TC-B", TestKind::FraudPositive, "x"),
            "down",
            0.0,
        ));

        let accuracy = crate::analysis::metrics::accuracy_metrics(&results);
        assert_eq!(accuracy.total_fraud_tests, 9);
        assert!(approx(accuracy.false_negative_rate, 11.11));
        assert!(approx(
            detection_risk(&results),
            RiskCurve::DETECTION.score(1.0 / 9.0)
        ));
        assert!(detection_risk(&results) > 80.0);
    }

    #[test]
    fn empty_results_are_neutral() {
        let a = RiskAnalyzer::default().calculate_risk(&[]);
        assert!(approx(a.overall_risk_score, 0.0));
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert_eq!(a.recommendations, vec![APPROVED_RECOMMENDATION.to_string()]);
    }

    #[test]
    fn scenario_d_all_pass_is_low_and_approved() {
        let results = vec![
            passed(TestKind::FraudPositive),
            passed(TestKind::Legitimate),
            passed(TestKind::Compliance),
            passed(TestKind::Performance),
        ];
        let a = RiskAnalyzer::default().calculate_risk(&results);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert_eq!(a.recommendations.len(), 1);
        assert_eq!(a.recommendations[0], APPROVED_RECOMMENDATION);
    }

    #[test]
    fn overall_is_weighted_sum_rounded() {
        let components = RiskComponents {
            detection: 80.0,
            false_positive: 30.0,
            compliance: 60.0,
            system: 20.0,
        };
        let a = RiskAnalyzer::default().assess(components, 0, 10);
        // 28 + 6 + 18 + 3
        assert!(approx(a.overall_risk_score, 55.0));
        assert_eq!(a.risk_level, RiskLevel::High);
        assert!(a.recommendations.iter().any(|r| r.starts_with("CRITICAL: High false negative")));
        assert!(a.recommendations.iter().any(|r| r.starts_with("BLOCKING")));
    }

    #[test]
    fn level_thresholds_are_closed_lower_bounds() {
        let cfg = RiskConfig::default();
        assert_eq!(RiskLevel::from_score(75.0, &cfg), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(74.99, &cfg), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(50.0, &cfg), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(25.0, &cfg), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(24.99, &cfg), RiskLevel::Low);
    }

    #[test]
    fn pass_rate_advisory_fires_above_fifteen_percent() {
        let quiet = RiskComponents::default();
        let recs = recommendations(&quiet, 2, 10);
        assert!(recs[0].starts_with("Overall test pass rate below 85%"));
        let recs = recommendations(&quiet, 15, 100);
        assert_eq!(recs, vec![APPROVED_RECOMMENDATION.to_string()]);
    }

    #[test]
    fn medium_bands_emit_concerns() {
        let c = RiskComponents {
            detection: 30.0,
            false_positive: 0.0,
            compliance: 40.0,
            system: 35.0,
        };
        let recs = recommendations(&c, 0, 10);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].starts_with("MEDIUM"));
        assert!(recs[1].starts_with("Compliance concerns"));
        assert!(recs[2].starts_with("System performance concerns"));
    }

    #[test]
    fn level_serializes_as_name() {
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"CRITICAL\"");
    }
}
