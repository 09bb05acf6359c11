//! Accuracy & performance aggregation over a finished result set.
//!
//! Every function here is a pure, order-independent reduction. Empty input
//! yields zeroed metrics; every ratio is guarded against a zero denominator.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::analysis::round2;
use crate::model::{TestKind, TestResult, TestStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

/// Detection accuracy. Ratios are percentages rounded to two places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub confusion_matrix: ConfusionMatrix,
    /// Fraud-positive tests with a verdict (passed or failed).
    pub total_fraud_tests: usize,
    /// Legitimate tests with a verdict (passed or failed).
    pub total_legitimate_tests: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
}

/// Nearest-rank latency distribution over positive execution times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub samples: usize,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
}

/// Status counts and timing for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub total_test_cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub skipped: usize,
    pub pass_rate: f64,
    pub fail_rate: f64,
    pub total_execution_time_ms: f64,
    pub avg_execution_time_ms: f64,
    pub execution_time_formatted: String,
}

/// Combined aggregator output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub accuracy: AccuracyMetrics,
    pub latency: PerformanceMetrics,
}

/// Accuracy plus latency in one pass-friendly call.
#[must_use]
pub fn aggregate(results: &[TestResult]) -> Aggregate {
    Aggregate {
        accuracy: accuracy_metrics(results),
        latency: performance_metrics(results),
    }
}

/// `num / den`, or 0 when `den` is 0.
#[must_use]
pub fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Confusion matrix over fraud-positive and legitimate results.
///
/// Blocked and skipped results carry no verdict and are left out. Edge,
/// performance and compliance kinds never enter the matrix.
#[must_use]
pub fn confusion_matrix(results: &[TestResult]) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::default();
    for r in results {
        match (r.kind, r.status) {
            (TestKind::FraudPositive, TestStatus::Passed) => cm.true_positives += 1,
            (TestKind::FraudPositive, TestStatus::Failed) => cm.false_negatives += 1,
            (TestKind::Legitimate, TestStatus::Passed) => cm.true_negatives += 1,
            (TestKind::Legitimate, TestStatus::Failed) => cm.false_positives += 1,
            _ => {}
        }
    }
    cm
}

#[must_use]
pub fn accuracy_metrics(results: &[TestResult]) -> AccuracyMetrics {
    let cm = confusion_matrix(results);
    let total_fraud = cm.true_positives + cm.false_negatives;
    let total_legit = cm.true_negatives + cm.false_positives;

    let precision = ratio(cm.true_positives, cm.true_positives + cm.false_positives);
    let recall = ratio(cm.true_positives, total_fraud);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    AccuracyMetrics {
        confusion_matrix: cm,
        total_fraud_tests: total_fraud,
        total_legitimate_tests: total_legit,
        precision: round2(precision * 100.0),
        recall: round2(recall * 100.0),
        f1_score: round2(f1 * 100.0),
        false_positive_rate: round2(ratio(cm.false_positives, total_legit) * 100.0),
        false_negative_rate: round2(ratio(cm.false_negatives, total_fraud) * 100.0),
    }
}

/// Nearest-rank percentile of an ascending slice: index `floor(n * p)`,
/// clamped to the last element. Empty input is 0.
#[must_use]
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[must_use]
pub fn performance_metrics(results: &[TestResult]) -> PerformanceMetrics {
    let mut times: Vec<f64> = results
        .iter()
        .map(|r| r.execution_time_ms)
        .filter(|t| *t > 0.0)
        .collect();
    if times.is_empty() {
        return PerformanceMetrics::default();
    }
    times.sort_by(f64::total_cmp);

    let n = times.len();
    let avg = times.iter().sum::<f64>() / n as f64;
    PerformanceMetrics {
        samples: n,
        avg_response_time_ms: round2(avg),
        min_response_time_ms: round2(times[0]),
        max_response_time_ms: round2(times[n - 1]),
        p95_response_time_ms: round2(nearest_rank(&times, 0.95)),
        p99_response_time_ms: round2(nearest_rank(&times, 0.99)),
    }
}

#[must_use]
pub fn overall_metrics(results: &[TestResult]) -> OverallMetrics {
    let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
    let total = results.len();
    let passed = count(TestStatus::Passed);
    let failed = count(TestStatus::Failed);
    let total_time: f64 = results.iter().map(|r| r.execution_time_ms).sum();
    let avg_time = if total == 0 {
        0.0
    } else {
        total_time / total as f64
    };

    OverallMetrics {
        total_test_cases: total,
        passed,
        failed,
        blocked: count(TestStatus::Blocked),
        skipped: count(TestStatus::Skipped),
        pass_rate: round2(ratio(passed, total) * 100.0),
        fail_rate: round2(ratio(failed, total) * 100.0),
        total_execution_time_ms: round2(total_time),
        avg_execution_time_ms: round2(avg_time),
        execution_time_formatted: format_duration(total_time),
    }
}

/// `12.3s`, `4m 5s`, `1h 2m`.
#[must_use]
pub fn format_duration(ms: f64) -> String {
    let seconds = ms.max(0.0) / 1000.0;
    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = seconds as u64;
    let minutes = whole / 60;
    if minutes < 60 {
        return format!("{minutes}m {}s", whole % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActualResult, Finding, FindingKind, FindingSeverity, TestCase};

    fn result(kind: TestKind, failed: bool, ms: f64) -> TestResult {
        let case = TestCase::new("TC-X", kind, "x");
        let findings = if failed {
            vec![Finding::new(
                FindingKind::FalseNegative,
                FindingSeverity::Error,
                "FALSE NEGATIVE",
            )]
        } else {
            Vec::new()
        };
        TestResult::from_findings(&case, ActualResult::new(), findings, ms)
    }

    #[test]
    fn empty_input_is_all_zero() {
        let agg = aggregate(&[]);
        assert_eq!(agg, Aggregate::default());
        let overall = overall_metrics(&[]);
        assert_eq!(overall.total_test_cases, 0);
        assert!(overall.pass_rate.abs() < f64::EPSILON);
        assert_eq!(overall.execution_time_formatted, "0.0s");
    }

    #[test]
    fn confusion_matrix_partitions_by_kind() {
        let results = vec![
            result(TestKind::FraudPositive, false, 1.0),
            result(TestKind::FraudPositive, false, 1.0),
            result(TestKind::FraudPositive, true, 1.0),
            result(TestKind::Legitimate, false, 1.0),
            result(TestKind::Legitimate, true, 1.0),
            result(TestKind::Edge, true, 1.0),
            result(TestKind::Performance, true, 1.0),
            result(TestKind::Compliance, false, 1.0),
        ];
        let acc = accuracy_metrics(&results);
        assert_eq!(
            acc.confusion_matrix,
            ConfusionMatrix {
                true_positives: 2,
                false_positives: 1,
                true_negatives: 1,
                false_negatives: 1,
            }
        );
        assert_eq!(acc.total_fraud_tests, 3);
        assert_eq!(acc.total_legitimate_tests, 2);
        assert!((acc.precision - 66.67).abs() < 1e-9);
        assert!((acc.recall - 66.67).abs() < 1e-9);
        assert!((acc.f1_score - 66.67).abs() < 1e-9);
        assert!((acc.false_positive_rate - 50.0).abs() < 1e-9);
        assert!((acc.false_negative_rate - 33.33).abs() < 1e-9);
    }

    #[test]
    fn blocked_results_have_no_verdict() {
        let case = TestCase::new("TC-CARD-1", TestKind::FraudPositive, "Card");
        let results = vec![TestResult::blocked(&case, "down", 3.0)];
        let acc = accuracy_metrics(&results);
        assert_eq!(acc.total_fraud_tests, 0);
        assert!(acc.recall.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_denominators_do_not_propagate() {
        let results = vec![result(TestKind::FraudPositive, true, 1.0)];
        let acc = accuracy_metrics(&results);
        assert!(acc.precision.abs() < f64::EPSILON);
        assert!(acc.f1_score.abs() < f64::EPSILON);
        assert!(acc.false_positive_rate.abs() < f64::EPSILON);
        assert!((acc.false_negative_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nearest_rank_indexes_by_floor_and_clamps() {
        let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
        // floor(20 * 0.95) = 19 -> last element
        assert!((nearest_rank(&sorted, 0.95) - 20.0).abs() < f64::EPSILON);
        assert!((nearest_rank(&sorted, 0.5) - 11.0).abs() < f64::EPSILON);
        assert!((nearest_rank(&sorted, 1.0) - 20.0).abs() < f64::EPSILON);
        assert!(nearest_rank(&[], 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn latency_ignores_non_positive_samples_and_sorts() {
        let results = vec![
            result(TestKind::FraudPositive, false, 30.0),
            result(TestKind::FraudPositive, false, 0.0),
            result(TestKind::FraudPositive, false, 10.0),
            result(TestKind::FraudPositive, false, 20.0),
        ];
        let perf = performance_metrics(&results);
        assert_eq!(perf.samples, 3);
        assert!((perf.min_response_time_ms - 10.0).abs() < f64::EPSILON);
        assert!((perf.max_response_time_ms - 30.0).abs() < f64::EPSILON);
        assert!((perf.avg_response_time_ms - 20.0).abs() < f64::EPSILON);
        assert!((perf.p95_response_time_ms - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_counts_and_rates() {
        let case = TestCase::new("TC-1", TestKind::FraudPositive, "x");
        let results = vec![
            result(TestKind::FraudPositive, false, 1000.0),
            result(TestKind::Legitimate, true, 2000.0),
            TestResult::blocked(&case, "down", 0.0),
            TestResult::skipped(&case, "filtered"),
        ];
        let overall = overall_metrics(&results);
        assert_eq!(overall.passed, 1);
        assert_eq!(overall.failed, 1);
        assert_eq!(overall.blocked, 1);
        assert_eq!(overall.skipped, 1);
        assert!((overall.pass_rate - 25.0).abs() < f64::EPSILON);
        assert!((overall.avg_execution_time_ms - 750.0).abs() < f64::EPSILON);
        assert_eq!(overall.execution_time_formatted, "3.0s");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(1_500.0), "1.5s");
        assert_eq!(format_duration(125_000.0), "2m 5s");
        assert_eq!(format_duration(3_720_000.0), "1h 2m");
    }

    #[test]
    fn aggregation_is_idempotent() {
        let results = vec![
            result(TestKind::FraudPositive, true, 5.0),
            result(TestKind::Legitimate, false, 7.0),
        ];
        assert_eq!(aggregate(&results), aggregate(&results));
    }
}
