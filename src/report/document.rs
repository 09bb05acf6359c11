//! The persisted QA report document.
//!
//! This JSON document is the only durable artifact of a cycle. Field names
//! are a contract with external tooling; enum values serialize as their
//! upper-case names.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::decision::{DecisionPolicy, DeploymentDecision};
use crate::analysis::hallucination::HallucinationCheck;
use crate::analysis::risk::RiskAssessment;
use crate::core::errors::{QaError, Result};
use crate::model::{TestCase, TestResult};
use crate::report::risk_report::RiskBreakdown;
use crate::report::summary::Summary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub timestamp: String,
    pub test_cases: Vec<TestCase>,
    pub test_results: Vec<TestResult>,
    pub hallucination_checks: Vec<HallucinationCheck>,
    pub risk_assessment: RiskAssessment,
    pub deployment_recommendation: String,
    pub deployment_decision: DeploymentDecision,
    #[serde(default)]
    pub decision_policy: DecisionPolicy,
    pub summary: Summary,
    pub risk_breakdown: RiskBreakdown,
    #[serde(default)]
    pub config_hash: String,
}

impl QaReport {
    /// Current time in the report's timestamp format.
    #[must_use]
    pub fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON via a temp file and rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| QaError::io(parent, source))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, self.to_json_pretty()?).map_err(|source| QaError::io(&tmp, source))?;
        fs::rename(&tmp, path).map_err(|source| QaError::io(path, source))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| QaError::io(path, source))?;
        Ok(serde_json::from_str(&raw)?)
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.deployment_decision.is_blocking()
    }
}
