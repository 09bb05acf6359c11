//! Test case records: explicit routing kind, expected outcome, opaque test data.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Routing tag attached to every test case at creation.
///
/// Validation, hallucination checking, accuracy partitioning and risk
/// components all dispatch on this tag instead of substrings of ids or
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    /// Fraudulent activity the detector must flag.
    FraudPositive,
    /// Legitimate activity the detector must let through.
    Legitimate,
    /// Latency/SLA run.
    Performance,
    /// Regulatory audit run.
    Compliance,
    /// Borderline scenario; excluded from the confusion matrix.
    Edge,
}

impl TestKind {
    /// Classify a free-text case (e.g. an LLM reply) once, at the source boundary.
    ///
    /// Precedence: performance, compliance, legitimate (`NEG` id segment),
    /// edge, then the expected alert decides between legitimate and fraud.
    /// Ids are matched on whole `-`-separated segments, so `COMPROMISE` or
    /// `IMPERFECT` never route a case.
    #[must_use]
    pub fn infer(id: &str, category: &str, expected_alert: Option<bool>) -> Self {
        let category_lower = category.to_ascii_lowercase();
        let has_segment = |names: &[&str]| {
            id.split('-')
                .any(|seg| names.iter().any(|n| seg.eq_ignore_ascii_case(n)))
        };
        if category_lower.contains("performance") || has_segment(&["PERF", "PERFORMANCE"]) {
            Self::Performance
        } else if category_lower.contains("compliance") || has_segment(&["COMP", "COMPLIANCE"]) {
            Self::Compliance
        } else if has_segment(&["NEG", "NEGATIVE"]) {
            Self::Legitimate
        } else if has_segment(&["EDGE"]) || category_lower.contains("edge") {
            Self::Edge
        } else if expected_alert == Some(false) {
            Self::Legitimate
        } else {
            Self::FraudPositive
        }
    }

    /// Stable label used in reports and failure breakdowns.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FraudPositive => "FRAUD_POSITIVE",
            Self::Legitimate => "LEGITIMATE",
            Self::Performance => "PERFORMANCE",
            Self::Compliance => "COMPLIANCE",
            Self::Edge => "EDGE",
        }
    }

    /// Whether the oracle output for this kind is a detection verdict
    /// (and therefore subject to hallucination checks).
    #[must_use]
    pub const fn is_detection(self) -> bool {
        matches!(self, Self::FraudPositive | Self::Legitimate | Self::Edge)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected detector behavior. Every key is optional; absent keys are not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraud_alert_triggered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Unrecognized keys, preserved for the report.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpectedResult {
    /// Expect an alert (or its absence).
    #[must_use]
    pub fn alert(triggered: bool) -> Self {
        Self {
            fraud_alert_triggered: Some(triggered),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_risk_score(mut self, score: f64) -> Self {
        self.risk_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.alert_priority = Some(priority.into());
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Whether a missed alert on this case is a critical miss.
    #[must_use]
    pub fn is_critical_priority(&self) -> bool {
        self.alert_priority
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("critical"))
    }
}

/// A synthetic scenario with expected fraud-detection behavior. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "test_case_id")]
    pub id: String,
    pub kind: TestKind,
    /// Free-form label for humans; never used for routing.
    pub category: String,
    pub priority: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_data: Map<String, Value>,
    #[serde(default)]
    pub expected_result: ExpectedResult,
    #[serde(default)]
    pub fraud_patterns_tested: Vec<String>,
    #[serde(default)]
    pub validation_points: Vec<String>,
}

impl TestCase {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: TestKind, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            category: category.into(),
            priority: "P2".to_string(),
            description: String::new(),
            test_data: Map::new(),
            expected_result: ExpectedResult::default(),
            fraud_patterns_tested: Vec::new(),
            validation_points: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.test_data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: ExpectedResult) -> Self {
        self.expected_result = expected;
        self
    }

    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fraud_patterns_tested = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Per-case SLA for performance runs, when the case carries one.
    #[must_use]
    pub fn max_allowed_response_time_ms(&self) -> Option<f64> {
        self.test_data
            .get("max_allowed_response_time_ms")
            .and_then(Value::as_f64)
    }
}
