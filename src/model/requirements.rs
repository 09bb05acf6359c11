//! Cycle input: what the suite must cover.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::errors::{QaError, Result};

/// Requirements handed opaquely to a test case source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub fraud_types: Vec<String>,
    pub detection_rules: Map<String, Value>,
    pub compliance_requirements: Vec<String>,
    pub performance_requirements: Map<String, Value>,
}

impl Requirements {
    /// Full regression preset: five fraud types, three regimes, 5 s SLA.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            fraud_types: strings(&[
                "wire_transfer_fraud",
                "account_takeover",
                "card_fraud",
                "identity_theft",
                "money_laundering",
            ]),
            detection_rules: default_detection_rules(),
            compliance_requirements: strings(&["AML_KYC", "PCI_DSS", "GDPR"]),
            performance_requirements: object(json!({
                "max_response_time_ms": 5000,
                "min_throughput_tps": 1000,
                "max_false_positive_rate": 0.10,
                "max_false_negative_rate": 0.05,
            })),
        }
    }

    /// Smoke preset: two fraud types and PCI only.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            fraud_types: strings(&["wire_transfer_fraud", "card_fraud"]),
            detection_rules: default_detection_rules(),
            compliance_requirements: strings(&["PCI_DSS"]),
            performance_requirements: object(json!({
                "max_response_time_ms": 5000,
                "min_throughput_tps": 1000,
            })),
        }
    }

    /// Load requirements from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| QaError::io(path, source))?;
        Ok(serde_json::from_str(&raw)?)
    }

    #[must_use]
    pub fn max_response_time_ms(&self) -> Option<f64> {
        self.performance_requirements
            .get("max_response_time_ms")
            .and_then(Value::as_f64)
    }

    #[must_use]
    pub fn high_value_threshold(&self) -> Option<f64> {
        self.detection_rules
            .get("high_value_threshold")
            .and_then(Value::as_f64)
    }
}

fn default_detection_rules() -> Map<String, Value> {
    object(json!({
        "high_value_threshold": 10000,
        "velocity_check_window": 3600,
        "geographic_risk_countries": ["NG", "RU", "CN"],
        "max_failed_logins": 3,
    }))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
