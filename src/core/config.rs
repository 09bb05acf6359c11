//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::decision::DecisionPolicy;
use crate::core::errors::{QaError, Result};

/// Full pipeline configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub risk: RiskConfig,
    pub decision: DecisionConfig,
    pub validation: ValidationConfig,
    pub hallucination: HallucinationConfig,
    pub execution: ExecutionConfig,
    pub paths: PathsConfig,
}

/// Component weights and level thresholds for the risk analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub detection_weight: f64,
    pub false_positive_weight: f64,
    pub compliance_weight: f64,
    pub system_weight: f64,
    /// Lower bound (inclusive) of the CRITICAL risk level.
    pub critical_threshold: f64,
    /// Lower bound (inclusive) of the HIGH risk level.
    pub high_threshold: f64,
    /// Lower bound (inclusive) of the MEDIUM risk level.
    pub medium_threshold: f64,
}

/// Deployment gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionConfig {
    pub policy: DecisionPolicy,
    /// Overall score at or above which deployment is blocked.
    pub block_score: f64,
    /// Overall score at or above which deployment needs approval.
    pub caution_score: f64,
    /// Compliance component score at or above which the gated policy blocks.
    pub compliance_block: f64,
}

/// Result validator tolerances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Absolute risk-score drift tolerated before a warning is raised.
    pub risk_score_tolerance: f64,
    /// SLA used when a performance case omits `max_allowed_response_time_ms`.
    pub default_max_response_time_ms: f64,
}

/// Hallucination checker rule bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HallucinationConfig {
    /// Scores strictly above this must come with an alert.
    pub alert_high_score: f64,
    /// Scores strictly below this must not come with an alert.
    pub alert_low_score: f64,
    pub calibration_high_score: f64,
    pub calibration_min_confidence: f64,
    pub calibration_low_score: f64,
    pub calibration_max_confidence: f64,
    /// Indicator pairs that cannot both be true of one transaction.
    pub contradictory_pairs: Vec<(String, String)>,
}

/// Test execution and simulated-oracle knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Number of executor threads; 1 runs the suite sequentially.
    pub workers: usize,
    pub oracle_seed: u64,
    /// Probability the simulated detector classifies a case correctly.
    pub simulated_accuracy: f64,
    /// Probability a simulated compliance audit passes.
    pub compliance_pass_rate: f64,
    /// Probability a simulated performance run breaches its SLA.
    pub sla_breach_rate: f64,
    /// Artificial delay per simulated oracle call.
    pub simulated_latency_ms: u64,
}

/// Filesystem paths used by fqa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub report_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            detection_weight: 0.35,
            false_positive_weight: 0.20,
            compliance_weight: 0.30,
            system_weight: 0.15,
            critical_threshold: 75.0,
            high_threshold: 50.0,
            medium_threshold: 25.0,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            policy: DecisionPolicy::Gated,
            block_score: 75.0,
            caution_score: 50.0,
            compliance_block: 60.0,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            risk_score_tolerance: 15.0,
            default_max_response_time_ms: 5_000.0,
        }
    }
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            alert_high_score: 90.0,
            alert_low_score: 30.0,
            calibration_high_score: 80.0,
            calibration_min_confidence: 0.5,
            calibration_low_score: 30.0,
            calibration_max_confidence: 0.9,
            contradictory_pairs: vec![(
                "first_international".to_string(),
                "high_international_volume".to_string(),
            )],
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            oracle_seed: 42,
            simulated_accuracy: 0.95,
            compliance_pass_rate: 0.90,
            sla_breach_rate: 0.10,
            simulated_latency_ms: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[FQA-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let data = home_dir.join(".local").join("share").join("fqa");
        Self {
            config_file: home_dir.join(".config").join("fqa").join("config.toml"),
            report_file: data.join("fraud_qa_results.json"),
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl RiskConfig {
    /// Sum of the four component weights.
    #[must_use]
    pub fn weight_sum(&self) -> f64 {
        self.detection_weight
            + self.false_positive_weight
            + self.compliance_weight
            + self.system_weight
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| QaError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(QaError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging and report provenance.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes and Rust releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        Ok(format!("{:016x}", fnv1a(canonical.as_bytes())))
    }

    /// Apply `FQA_<SECTION>_<FIELD>` overrides read through `lookup`.
    pub fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut env = EnvReader {
            lookup: &mut lookup,
        };

        // risk
        env.f64("FQA_RISK_DETECTION_WEIGHT", &mut self.risk.detection_weight)?;
        env.f64(
            "FQA_RISK_FALSE_POSITIVE_WEIGHT",
            &mut self.risk.false_positive_weight,
        )?;
        env.f64("FQA_RISK_COMPLIANCE_WEIGHT", &mut self.risk.compliance_weight)?;
        env.f64("FQA_RISK_SYSTEM_WEIGHT", &mut self.risk.system_weight)?;
        env.f64("FQA_RISK_CRITICAL_THRESHOLD", &mut self.risk.critical_threshold)?;
        env.f64("FQA_RISK_HIGH_THRESHOLD", &mut self.risk.high_threshold)?;
        env.f64("FQA_RISK_MEDIUM_THRESHOLD", &mut self.risk.medium_threshold)?;

        // decision
        if let Some(raw) = env.raw("FQA_DECISION_POLICY") {
            self.decision.policy =
                raw.parse::<DecisionPolicy>()
                    .map_err(|details| QaError::ConfigParse {
                        context: "env",
                        details: format!("FQA_DECISION_POLICY={raw:?}: {details}"),
                    })?;
        }
        env.f64("FQA_DECISION_BLOCK_SCORE", &mut self.decision.block_score)?;
        env.f64("FQA_DECISION_CAUTION_SCORE", &mut self.decision.caution_score)?;
        env.f64(
            "FQA_DECISION_COMPLIANCE_BLOCK",
            &mut self.decision.compliance_block,
        )?;

        // validation
        env.f64(
            "FQA_VALIDATION_RISK_SCORE_TOLERANCE",
            &mut self.validation.risk_score_tolerance,
        )?;
        env.f64(
            "FQA_VALIDATION_DEFAULT_MAX_RESPONSE_TIME_MS",
            &mut self.validation.default_max_response_time_ms,
        )?;

        // execution
        env.usize("FQA_EXECUTION_WORKERS", &mut self.execution.workers)?;
        env.u64("FQA_EXECUTION_ORACLE_SEED", &mut self.execution.oracle_seed)?;
        env.f64(
            "FQA_EXECUTION_SIMULATED_ACCURACY",
            &mut self.execution.simulated_accuracy,
        )?;
        env.f64(
            "FQA_EXECUTION_COMPLIANCE_PASS_RATE",
            &mut self.execution.compliance_pass_rate,
        )?;
        env.f64(
            "FQA_EXECUTION_SLA_BREACH_RATE",
            &mut self.execution.sla_breach_rate,
        )?;
        env.u64(
            "FQA_EXECUTION_SIMULATED_LATENCY_MS",
            &mut self.execution.simulated_latency_ms,
        )?;

        // paths
        if let Some(raw) = env.raw("FQA_PATHS_REPORT_FILE") {
            self.paths.report_file = PathBuf::from(raw);
        }
        if let Some(raw) = env.raw("FQA_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Check every cross-field constraint; the first violation is reported.
    pub fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("detection_weight", self.risk.detection_weight),
            ("false_positive_weight", self.risk.false_positive_weight),
            ("compliance_weight", self.risk.compliance_weight),
            ("system_weight", self.risk.system_weight),
        ] {
            if !(0.0..=1.0).contains(&val) {
                return Err(QaError::InvalidConfig {
                    details: format!("risk.{name} must be in [0, 1], got {val}"),
                });
            }
        }

        let sum = self.risk.weight_sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(QaError::InvalidConfig {
                details: format!("risk weights must sum to 1.0; got {sum:.6}"),
            });
        }

        for (name, val) in [
            ("critical_threshold", self.risk.critical_threshold),
            ("high_threshold", self.risk.high_threshold),
            ("medium_threshold", self.risk.medium_threshold),
        ] {
            validate_score(&format!("risk.{name}"), val)?;
        }
        if !(self.risk.critical_threshold > self.risk.high_threshold
            && self.risk.high_threshold > self.risk.medium_threshold)
        {
            return Err(QaError::InvalidConfig {
                details: "risk thresholds must strictly descend: critical > high > medium"
                    .to_string(),
            });
        }

        validate_score("decision.block_score", self.decision.block_score)?;
        validate_score("decision.caution_score", self.decision.caution_score)?;
        validate_score("decision.compliance_block", self.decision.compliance_block)?;
        if self.decision.caution_score > self.decision.block_score {
            return Err(QaError::InvalidConfig {
                details: format!(
                    "decision.caution_score ({}) must be <= decision.block_score ({})",
                    self.decision.caution_score, self.decision.block_score
                ),
            });
        }

        if self.validation.risk_score_tolerance < 0.0 {
            return Err(QaError::InvalidConfig {
                details: "validation.risk_score_tolerance must be >= 0".to_string(),
            });
        }
        if self.validation.default_max_response_time_ms <= 0.0 {
            return Err(QaError::InvalidConfig {
                details: "validation.default_max_response_time_ms must be > 0".to_string(),
            });
        }

        let hal = &self.hallucination;
        validate_score("hallucination.alert_high_score", hal.alert_high_score)?;
        validate_score("hallucination.alert_low_score", hal.alert_low_score)?;
        if hal.alert_low_score >= hal.alert_high_score {
            return Err(QaError::InvalidConfig {
                details: "hallucination.alert_low_score must be < alert_high_score".to_string(),
            });
        }
        validate_prob(
            "hallucination.calibration_min_confidence",
            hal.calibration_min_confidence,
        )?;
        validate_prob(
            "hallucination.calibration_max_confidence",
            hal.calibration_max_confidence,
        )?;
        for (left, right) in &hal.contradictory_pairs {
            if left.is_empty() || right.is_empty() || left == right {
                return Err(QaError::InvalidConfig {
                    details: format!(
                        "hallucination.contradictory_pairs entry ({left:?}, {right:?}) must name two distinct indicators"
                    ),
                });
            }
        }

        if self.execution.workers == 0 {
            return Err(QaError::InvalidConfig {
                details: "execution.workers must be >= 1".to_string(),
            });
        }
        validate_prob(
            "execution.simulated_accuracy",
            self.execution.simulated_accuracy,
        )?;
        validate_prob(
            "execution.compliance_pass_rate",
            self.execution.compliance_pass_rate,
        )?;
        validate_prob("execution.sla_breach_rate", self.execution.sla_breach_rate)?;

        Ok(())
    }
}

/// FNV-1a 64-bit digest.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn validate_prob(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(QaError::InvalidConfig {
            details: format!("{name} must be in [0,1], got {value}"),
        });
    }
    Ok(())
}

fn validate_score(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(QaError::InvalidConfig {
            details: format!("{name} must be in [0, 100], got {value}"),
        });
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

struct EnvReader<'a, F: FnMut(&str) -> Option<String>> {
    lookup: &'a mut F,
}

impl<F: FnMut(&str) -> Option<String>> EnvReader<'_, F> {
    fn raw(&mut self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|raw| !raw.trim().is_empty())
    }

    fn parsed<T>(&mut self, name: &str, slot: &mut T) -> Result<()>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.raw(name) {
            *slot = raw.trim().parse::<T>().map_err(|error| QaError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
        }
        Ok(())
    }

    fn f64(&mut self, name: &str, slot: &mut f64) -> Result<()> {
        self.parsed(name, slot)
    }

    fn u64(&mut self, name: &str, slot: &mut u64) -> Result<()> {
        self.parsed(name, slot)
    }

    fn usize(&mut self, name: &str, slot: &mut usize) -> Result<()> {
        self.parsed(name, slot)
    }
}
