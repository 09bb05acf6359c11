//! Deployment gate: ordered rules over a risk assessment and raw results.
//!
//! Two named policies exist. `Gated` evaluates every rule including the
//! compliance block and is the canonical decision; `ScoreOnly` skips the
//! compliance rule and reproduces the score-driven recommendation.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::risk::RiskAssessment;
use crate::core::config::DecisionConfig;
use crate::model::TestResult;

/// Which rule set the deployment gate evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Critical failure, high score, compliance block, caution, approve.
    #[default]
    Gated,
    /// Same order without the compliance block.
    ScoreOnly,
}

impl DecisionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::ScoreOnly => "score_only",
        }
    }
}

impl fmt::Display for DecisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "gated" => Ok(Self::Gated),
            "score_only" => Ok(Self::ScoreOnly),
            other => Err(format!(
                "unknown decision policy {other:?} (expected gated or score_only)"
            )),
        }
    }
}

/// Final go/no-go outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentDecision {
    BlockCriticalFailure,
    BlockHighRisk,
    BlockCompliance,
    DeployWithCaution,
    Approved,
}

impl DeploymentDecision {
    /// Name as serialized in the report (`BLOCK_HIGH_RISK`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockCriticalFailure => "BLOCK_CRITICAL_FAILURE",
            Self::BlockHighRisk => "BLOCK_HIGH_RISK",
            Self::BlockCompliance => "BLOCK_COMPLIANCE",
            Self::DeployWithCaution => "DEPLOY_WITH_CAUTION",
            Self::Approved => "APPROVED",
        }
    }

    /// Human-facing recommendation line stored in the report.
    #[must_use]
    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::BlockCriticalFailure => "DO NOT DEPLOY - Critical failures detected",
            Self::BlockHighRisk => "DO NOT DEPLOY - High risk score",
            Self::BlockCompliance => "DO NOT DEPLOY - Compliance violations (BLOCKING)",
            Self::DeployWithCaution => "DEPLOY WITH CAUTION - Medium risk, requires approval",
            Self::Approved => "APPROVED FOR DEPLOYMENT - Low risk",
        }
    }

    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(
            self,
            Self::BlockCriticalFailure | Self::BlockHighRisk | Self::BlockCompliance
        )
    }
}

impl fmt::Display for DeploymentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.recommendation())
    }
}

/// The three numbers the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs {
    pub critical_failures: usize,
    pub overall_risk_score: f64,
    pub compliance_risk: f64,
}

impl DecisionInputs {
    #[must_use]
    pub fn collect(assessment: &RiskAssessment, results: &[TestResult]) -> Self {
        Self {
            critical_failures: results.iter().filter(|r| r.is_critical_failure()).count(),
            overall_risk_score: assessment.overall_risk_score,
            compliance_risk: assessment.compliance_risk,
        }
    }
}

/// Evaluate the gate rules in order; the first match wins.
#[must_use]
pub fn decide_from(
    policy: DecisionPolicy,
    thresholds: &DecisionConfig,
    inputs: DecisionInputs,
) -> DeploymentDecision {
    if inputs.critical_failures > 0 {
        return DeploymentDecision::BlockCriticalFailure;
    }
    if inputs.overall_risk_score >= thresholds.block_score {
        return DeploymentDecision::BlockHighRisk;
    }
    if policy == DecisionPolicy::Gated && inputs.compliance_risk >= thresholds.compliance_block {
        return DeploymentDecision::BlockCompliance;
    }
    if inputs.overall_risk_score >= thresholds.caution_score {
        return DeploymentDecision::DeployWithCaution;
    }
    DeploymentDecision::Approved
}

/// Decide deployment for a finished cycle.
#[must_use]
pub fn decide(
    policy: DecisionPolicy,
    thresholds: &DecisionConfig,
    assessment: &RiskAssessment,
    results: &[TestResult],
) -> DeploymentDecision {
    decide_from(
        policy,
        thresholds,
        DecisionInputs::collect(assessment, results),
    )
}
