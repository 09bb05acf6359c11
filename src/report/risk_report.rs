//! Weighted breakdown of a risk assessment and its text rendering.

#![allow(missing_docs)]

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::analysis::risk::{RiskAssessment, RiskLevel};
use crate::core::config::RiskConfig;
use crate::report::summary::top_risk;

/// One component's share of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    pub score: f64,
    pub weight: f64,
    /// `score * weight`, unrounded.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub detection_risk: RiskContribution,
    pub false_positive_risk: RiskContribution,
    pub compliance_risk: RiskContribution,
    pub system_risk: RiskContribution,
    pub top_risk: String,
    pub recommendations: Vec<String>,
}

impl RiskBreakdown {
    #[must_use]
    pub fn from_assessment(assessment: &RiskAssessment, weights: &RiskConfig) -> Self {
        let [detection, false_positive, compliance, system] = assessment
            .components()
            .weighted_terms(weights)
            .map(|(_, score, weight)| RiskContribution {
                score,
                weight,
                contribution: score * weight,
            });
        Self {
            overall_risk_score: assessment.overall_risk_score,
            risk_level: assessment.risk_level,
            detection_risk: detection,
            false_positive_risk: false_positive,
            compliance_risk: compliance,
            system_risk: system,
            top_risk: top_risk(assessment),
            recommendations: assessment.recommendations.clone(),
        }
    }

    /// Components in report order, with display names.
    #[must_use]
    pub fn components(&self) -> [(&'static str, RiskContribution); 4] {
        [
            ("Detection Risk", self.detection_risk),
            ("False Positive Risk", self.false_positive_risk),
            ("Compliance Risk", self.compliance_risk),
            ("System Risk", self.system_risk),
        ]
    }

    /// Sum of the contributions; equals the overall score up to rounding.
    #[must_use]
    pub fn contribution_total(&self) -> f64 {
        self.components().iter().map(|(_, c)| c.contribution).sum()
    }

    /// Fixed-width bar chart of the overall score and each component.
    #[must_use]
    pub fn render_bars(&self, width: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {}",
            "Overall Risk",
            risk_bar(self.overall_risk_score, width)
        );
        for (name, c) in self.components() {
            let _ = writeln!(out, "{name:<20} {}", risk_bar(c.score, width));
        }
        out
    }
}

/// `[#######.............]  35.0/100 MEDIUM`-style bar; `score` is clamped to `[0, 100]`.
#[must_use]
pub fn risk_bar(score: f64, width: usize) -> String {
    let clamped = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((clamped / 100.0) * width as f64).floor() as usize;
    let filled = filled.min(width);
    let band = if clamped >= 75.0 {
        "HIGH"
    } else if clamped >= 50.0 {
        "ELEVATED"
    } else {
        "OK"
    };
    format!(
        "[{}{}] {clamped:>5.1}/100 {band}",
        "#".repeat(filled),
        ".".repeat(width - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::risk::{RiskAnalyzer, RiskComponents};

    fn assessment() -> RiskAssessment {
        RiskAnalyzer::default().assess(
            RiskComponents {
                detection: 80.0,
                false_positive: 30.0,
                compliance: 60.0,
                system: 20.0,
            },
            0,
            10,
        )
    }

    #[test]
    fn contributions_sum_to_overall() {
        let a = assessment();
        let b = RiskBreakdown::from_assessment(&a, &RiskConfig::default());
        assert!((b.contribution_total() - a.overall_risk_score).abs() < 0.01);
        assert!((b.detection_risk.contribution - 28.0).abs() < 1e-9);
        assert!((b.compliance_risk.weight - 0.30).abs() < 1e-12);
        assert_eq!(b.top_risk, "Detection Risk (80.0)");
        assert_eq!(b.recommendations, a.recommendations);
    }

    #[test]
    fn bar_fill_and_band() {
        assert_eq!(risk_bar(50.0, 10), "[#####.....]  50.0/100 ELEVATED");
        assert_eq!(risk_bar(0.0, 4), "[....]   0.0/100 OK");
        assert_eq!(risk_bar(150.0, 4), "[####] 100.0/100 HIGH");
        assert_eq!(risk_bar(f64::NAN, 2), "[..]   0.0/100 OK");
    }

    #[test]
    fn render_lists_every_component() {
        let b = RiskBreakdown::from_assessment(&assessment(), &RiskConfig::default());
        let text = b.render_bars(20);
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().next().unwrap().starts_with("Overall Risk"));
        assert!(text.contains("System Risk"));
    }
}
