//! Deterministic rule-based suite generation.

#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::core::errors::Result;
use crate::model::{ExpectedResult, Requirements, TestCase, TestKind};
use crate::source::{CaseIdAllocator, TestCaseSource};

/// Secondary signals a fraud-positive case may exercise alongside its type.
const SIGNAL_POOL: &[&str] = &[
    "high_value",
    "velocity",
    "new_device",
    "unusual_time",
    "high_risk_destination",
    "dormant_account",
];

/// Per fraud type: two fraud-positive cases (the first CRITICAL), one
/// legitimate and one edge case. Then one compliance case per regime and a
/// performance case when a response-time SLA is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleBasedSource {
    seed: u64,
}

impl Default for RuleBasedSource {
    fn default() -> Self {
        Self::new(42)
    }
}

impl RuleBasedSource {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn fraud_cases(
        rng: &mut StdRng,
        fraud_type: &str,
        high_value: f64,
        ids: &mut CaseIdAllocator,
    ) -> Vec<TestCase> {
        let tag = fraud_type.to_ascii_uppercase();
        let category = title_case(fraud_type);
        let mut cases = Vec::with_capacity(4);

        for (priority, alert_priority) in [("P1", "CRITICAL"), ("P2", "HIGH")] {
            let signal = SIGNAL_POOL.choose(rng).copied().unwrap_or("high_value");
            let amount = rng.random_range(high_value * 0.1..high_value * 5.0).round();
            let score = f64::from(rng.random_range(70_u8..=95));
            cases.push(
                TestCase::new(ids.allocate(&tag), TestKind::FraudPositive, &category)
                    .with_priority(priority)
                    .with_description(format!("Detect {category} with {signal} signal"))
                    .with_data("amount", amount)
                    .with_data("fraud_type", fraud_type)
                    .with_expected(
                        ExpectedResult::alert(true)
                            .with_risk_score(score)
                            .with_priority(alert_priority)
                            .with_action("block_and_notify"),
                    )
                    .with_patterns([fraud_type, signal]),
            );
        }

        let amount = rng.random_range(10.0..high_value * 0.5).round();
        let score = f64::from(rng.random_range(5_u8..=25));
        cases.push(
            TestCase::new(
                ids.allocate(&format!("NEG-{tag}")),
                TestKind::Legitimate,
                &category,
            )
            .with_priority("P2")
            .with_description(format!("Legitimate activity resembling {category} must pass"))
            .with_data("amount", amount)
            .with_data("fraud_type", fraud_type)
            .with_expected(ExpectedResult::alert(false).with_risk_score(score)),
        );

        cases.push(
            TestCase::new(
                ids.allocate(&format!("EDGE-{tag}")),
                TestKind::Edge,
                &category,
            )
            .with_priority("P3")
            .with_description(format!("{category} right at the high-value threshold"))
            .with_data("amount", high_value)
            .with_data("fraud_type", fraud_type)
            .with_expected(
                ExpectedResult::alert(true)
                    .with_risk_score(50.0)
                    .with_priority("MEDIUM")
                    .with_action("review"),
            )
            .with_patterns([fraud_type]),
        );

        cases
    }
}

impl TestCaseSource for RuleBasedSource {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn generate(
        &self,
        requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<Vec<TestCase>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let high_value = requirements
            .high_value_threshold()
            .unwrap_or(10_000.0)
            .max(100.0);
        let mut cases = Vec::new();

        for fraud_type in &requirements.fraud_types {
            cases.extend(Self::fraud_cases(&mut rng, fraud_type, high_value, ids));
        }

        for regime in &requirements.compliance_requirements {
            let tag = regime.to_ascii_uppercase();
            cases.push(
                TestCase::new(
                    ids.allocate(&format!("COMP-{tag}")),
                    TestKind::Compliance,
                    "Compliance",
                )
                .with_priority("P1")
                .with_description(format!("{regime} audit of alert handling"))
                .with_data("compliance_standard", regime.as_str()),
            );
        }

        if let Some(sla) = requirements.max_response_time_ms() {
            let tps = requirements
                .performance_requirements
                .get("min_throughput_tps")
                .and_then(Value::as_u64)
                .unwrap_or(100);
            cases.push(
                TestCase::new(ids.allocate("PERF"), TestKind::Performance, "Performance")
                    .with_priority("P1")
                    .with_description(format!("Sustain {tps} TPS within {sla}ms"))
                    .with_data("max_allowed_response_time_ms", sla)
                    .with_data("transaction_count", tps),
            );
        }

        Ok(cases)
    }
}

/// `wire_transfer_fraud` → `Wire Transfer Fraud`.
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
