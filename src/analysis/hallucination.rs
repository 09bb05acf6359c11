//! Hallucination checker: flags self-contradictory or unsupported claims in
//! detection-oracle output.
//!
//! Rules are independent and each contributes zero or more findings:
//! indicator grounding, score range, score/alert consistency, mutually
//! exclusive indicator pairs, and confidence calibration. Results with no
//! findings produce no check at all.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::validator::fmt_num;
use crate::core::config::HallucinationConfig;
use crate::model::{TestCase, TestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationType {
    IncorrectCalculations,
    InvalidLogic,
    MisattributedFactors,
    ContradictoryStatements,
}

impl HallucinationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncorrectCalculations => "incorrect_calculations",
            Self::InvalidLogic => "invalid_logic",
            Self::MisattributedFactors => "misattributed_factors",
            Self::ContradictoryStatements => "contradictory_statements",
        }
    }
}

impl fmt::Display for HallucinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `None < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HallucinationSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl HallucinationSeverity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Detection confidence attached to a finding of this severity.
    #[must_use]
    pub const fn detection_confidence(self) -> f64 {
        match self {
            Self::Critical => 0.95,
            Self::High => 0.85,
            Self::Medium => 0.70,
            Self::Low => 0.60,
            Self::None => 0.0,
        }
    }
}

impl fmt::Display for HallucinationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unsupported or contradictory claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hallucination {
    #[serde(rename = "type")]
    pub kind: HallucinationType,
    pub description: String,
    pub severity: HallucinationSeverity,
    pub field: String,
}

impl Hallucination {
    fn new(
        kind: HallucinationType,
        severity: HallucinationSeverity,
        field: &str,
        description: String,
    ) -> Self {
        Self {
            kind,
            description,
            severity,
            field: field.to_string(),
        }
    }
}

/// All findings for one test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationCheck {
    pub test_case_id: String,
    pub hallucinations_detected: Vec<Hallucination>,
    pub severity: HallucinationSeverity,
    pub confidence_score: f64,
}

impl HallucinationCheck {
    /// Aggregate findings: max severity, mean per-severity confidence (2 dp).
    #[must_use]
    pub fn from_findings(test_case_id: &str, hallucinations: Vec<Hallucination>) -> Self {
        let severity = hallucinations
            .iter()
            .map(|h| h.severity)
            .max()
            .unwrap_or(HallucinationSeverity::None);
        let confidence_score = if hallucinations.is_empty() {
            0.0
        } else {
            let total: f64 = hallucinations
                .iter()
                .map(|h| h.severity.detection_confidence())
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = total / hallucinations.len() as f64;
            (mean * 100.0).round() / 100.0
        };
        Self {
            test_case_id: test_case_id.to_string(),
            hallucinations_detected: hallucinations,
            severity,
            confidence_score,
        }
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.severity == HallucinationSeverity::Critical
    }
}

/// Decides whether a cited fraud indicator is supported by the case data.
pub trait IndicatorGrounding {
    fn is_grounded(&self, test_case_id: &str, indicator: &str) -> bool;
}

impl<F> IndicatorGrounding for F
where
    F: Fn(&str, &str) -> bool,
{
    fn is_grounded(&self, test_case_id: &str, indicator: &str) -> bool {
        self(test_case_id, indicator)
    }
}

/// Accepts every indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl IndicatorGrounding for AcceptAll {
    fn is_grounded(&self, _test_case_id: &str, _indicator: &str) -> bool {
        true
    }
}

/// An indicator is grounded when its case declared it in `fraud_patterns_tested`.
///
/// Cases without declared patterns accept anything; unknown ids do too.
#[derive(Debug, Clone, Default)]
pub struct PatternGrounding {
    patterns: HashMap<String, HashSet<String>>,
}

impl PatternGrounding {
    #[must_use]
    pub fn from_cases(cases: &[TestCase]) -> Self {
        let patterns = cases
            .iter()
            .filter(|c| !c.fraud_patterns_tested.is_empty())
            .map(|c| {
                (
                    c.id.clone(),
                    c.fraud_patterns_tested.iter().cloned().collect(),
                )
            })
            .collect();
        Self { patterns }
    }
}

impl IndicatorGrounding for PatternGrounding {
    fn is_grounded(&self, test_case_id: &str, indicator: &str) -> bool {
        self.patterns
            .get(test_case_id)
            .is_none_or(|declared| declared.contains(indicator))
    }
}

/// Fixed vocabulary of indicators the detector is allowed to cite.
#[derive(Debug, Clone, Default)]
pub struct IndicatorAllowlist(HashSet<String>);

impl IndicatorAllowlist {
    #[must_use]
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }
}

impl IndicatorGrounding for IndicatorAllowlist {
    fn is_grounded(&self, _test_case_id: &str, indicator: &str) -> bool {
        self.0.contains(indicator)
    }
}

/// Rule engine over oracle outputs.
pub struct HallucinationChecker {
    rules: HallucinationConfig,
    grounding: Box<dyn IndicatorGrounding + Send + Sync>,
}

impl fmt::Debug for HallucinationChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HallucinationChecker")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Default for HallucinationChecker {
    fn default() -> Self {
        Self::new(HallucinationConfig::default())
    }
}

impl HallucinationChecker {
    /// Checker that trusts every cited indicator.
    #[must_use]
    pub fn new(rules: HallucinationConfig) -> Self {
        Self::with_grounding(rules, AcceptAll)
    }

    #[must_use]
    pub fn with_grounding<G>(rules: HallucinationConfig, grounding: G) -> Self
    where
        G: IndicatorGrounding + Send + Sync + 'static,
    {
        Self {
            rules,
            grounding: Box::new(grounding),
        }
    }

    /// Check one result. Performance and compliance results are never checked.
    #[must_use]
    pub fn check(&self, result: &TestResult) -> Option<HallucinationCheck> {
        if !result.kind.is_detection() {
            return None;
        }
        let found = self.detect(result);
        if found.is_empty() {
            None
        } else {
            Some(HallucinationCheck::from_findings(&result.test_case_id, found))
        }
    }

    /// Check a whole result set, keeping only non-empty checks (input order).
    #[must_use]
    pub fn verify(&self, results: &[TestResult]) -> Vec<HallucinationCheck> {
        results.iter().filter_map(|r| self.check(r)).collect()
    }

    fn detect(&self, result: &TestResult) -> Vec<Hallucination> {
        let actual = &result.actual_result;
        let indicators = actual.fraud_indicators();
        let mut found = Vec::new();

        for indicator in &indicators {
            if !self.grounding.is_grounded(&result.test_case_id, indicator) {
                found.push(Hallucination::new(
                    HallucinationType::MisattributedFactors,
                    HallucinationSeverity::High,
                    "fraud_indicators",
                    format!("Fraud indicator '{indicator}' cited but not present in data"),
                ));
            }
        }

        if let Some(score) = actual.risk_score() {
            let alert = actual.fraud_alert_triggered().unwrap_or(false);
            if !(0.0..=100.0).contains(&score) {
                found.push(Hallucination::new(
                    HallucinationType::IncorrectCalculations,
                    HallucinationSeverity::Critical,
                    "risk_score",
                    format!("Risk score {} outside valid range [0-100]", fmt_num(score)),
                ));
            } else if score > self.rules.alert_high_score && !alert {
                found.push(Hallucination::new(
                    HallucinationType::InvalidLogic,
                    HallucinationSeverity::High,
                    "risk_score",
                    format!(
                        "Risk score {} very high but no alert triggered - logical inconsistency",
                        fmt_num(score)
                    ),
                ));
            } else if score < self.rules.alert_low_score && alert {
                found.push(Hallucination::new(
                    HallucinationType::InvalidLogic,
                    HallucinationSeverity::High,
                    "risk_score",
                    format!(
                        "Risk score {} low but alert triggered - logical inconsistency",
                        fmt_num(score)
                    ),
                ));
            }
        }

        for (left, right) in &self.rules.contradictory_pairs {
            if indicators.contains(&left.as_str()) && indicators.contains(&right.as_str()) {
                found.push(Hallucination::new(
                    HallucinationType::ContradictoryStatements,
                    HallucinationSeverity::High,
                    "fraud_indicators",
                    format!("Claims both \"{left}\" and \"{right}\""),
                ));
            }
        }

        if let Some(confidence) = actual.confidence() {
            let score = actual.risk_score().unwrap_or(0.0);
            if score > self.rules.calibration_high_score
                && confidence < self.rules.calibration_min_confidence
            {
                found.push(Hallucination::new(
                    HallucinationType::InvalidLogic,
                    HallucinationSeverity::Medium,
                    "confidence",
                    format!(
                        "High risk score ({}) but low confidence ({confidence}) - poor calibration",
                        fmt_num(score)
                    ),
                ));
            } else if score < self.rules.calibration_low_score
                && confidence > self.rules.calibration_max_confidence
            {
                found.push(Hallucination::new(
                    HallucinationType::InvalidLogic,
                    HallucinationSeverity::Medium,
                    "confidence",
                    format!(
                        "Low risk score ({}) but very high confidence ({confidence}) - overconfident",
                        fmt_num(score)
                    ),
                ));
            }
        }

        found
    }
}
