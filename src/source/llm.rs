//! Test cases from a saved LLM reply.
//!
//! The reply is expected to be a JSON array of case objects, optionally
//! wrapped in a markdown code fence. Routing is inferred once here, at the
//! boundary; downstream stages only see [`TestKind`].

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};

use crate::core::errors::{QaError, Result};
use crate::model::{ExpectedResult, Requirements, TestCase, TestKind};
use crate::source::{CaseIdAllocator, TestCaseSource};

const FENCE_PATTERN: &str = r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$";

/// Parses a recorded LLM reply into test cases.
#[derive(Debug, Clone)]
pub struct LlmResponseSource {
    reply: String,
    fence: Regex,
}

impl LlmResponseSource {
    pub fn new(reply: impl Into<String>) -> Result<Self> {
        let fence = Regex::new(FENCE_PATTERN).map_err(|err| QaError::Runtime {
            details: format!("fence pattern failed to compile: {err}"),
        })?;
        Ok(Self {
            reply: reply.into(),
            fence,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let reply = fs::read_to_string(path).map_err(|source| QaError::io(path, source))?;
        Self::new(reply)
    }

    /// Reply body with any surrounding code fence removed.
    #[must_use]
    pub fn body(&self) -> &str {
        self.fence
            .captures(&self.reply)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| self.reply.trim(), |m| m.as_str())
    }

    /// Parse the reply. Entries that cannot become a case are skipped.
    pub fn parse(&self, ids: &mut CaseIdAllocator) -> Result<Vec<TestCase>> {
        let value: Value = serde_json::from_str(self.body()).map_err(|err| QaError::LlmResponse {
            details: format!("reply is not JSON: {err}"),
        })?;
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(mut obj) => match obj.remove("test_cases") {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(QaError::LlmResponse {
                        details: "expected a JSON array of test cases".to_string(),
                    });
                }
            },
            _ => {
                return Err(QaError::LlmResponse {
                    details: "expected a JSON array of test cases".to_string(),
                });
            }
        };

        let total = entries.len();
        let cases: Vec<TestCase> = entries
            .into_iter()
            .filter_map(|entry| case_from_entry(entry, ids))
            .collect();

        if cases.is_empty() {
            return Err(QaError::LlmResponse {
                details: format!("none of {total} entries is a usable test case"),
            });
        }
        if cases.len() < total {
            eprintln!(
                "[FQA-SOURCE] skipped {} malformed LLM entries",
                total - cases.len()
            );
        }
        Ok(cases)
    }
}

impl TestCaseSource for LlmResponseSource {
    fn name(&self) -> &'static str {
        "llm_response"
    }

    fn generate(
        &self,
        _requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<Vec<TestCase>> {
        self.parse(ids)
    }
}

fn case_from_entry(entry: Value, ids: &mut CaseIdAllocator) -> Option<TestCase> {
    let Value::Object(mut obj) = entry else {
        return None;
    };

    let test_data = match obj.remove("test_data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return None,
    };
    let mut raw_expected = match obj.remove("expected_result") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return None,
    };
    let patterns = match obj.remove("fraud_indicators") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(_) => return None,
    };

    let seq = ids.next_seq();
    let id = text(&obj, "test_id").unwrap_or_else(|| format!("TC-GROQ-{seq:03}"));
    let category = text(&obj, "category")
        .or_else(|| text(&obj, "fraud_type"))
        .unwrap_or_else(|| "Unknown".to_string());

    let should_detect = raw_expected
        .remove("should_detect")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let expected = ExpectedResult {
        fraud_alert_triggered: Some(should_detect),
        risk_score: Some(
            raw_expected
                .remove("risk_score_min")
                .and_then(|v| v.as_f64())
                .unwrap_or(75.0),
        ),
        alert_priority: Some(
            take_text(&mut raw_expected, "alert_priority").unwrap_or_else(|| "HIGH".to_string()),
        ),
        action: Some(take_text(&mut raw_expected, "action").unwrap_or_else(|| "review".to_string())),
        extra: raw_expected,
    };

    let kind = TestKind::infer(&id, &category, Some(should_detect));
    let mut case = TestCase::new(id, kind, category)
        .with_priority(text(&obj, "priority").unwrap_or_else(|| "P2".to_string()))
        .with_description(
            text(&obj, "description").unwrap_or_else(|| "Generated by LLM".to_string()),
        )
        .with_expected(expected)
        .with_patterns(patterns);
    case.test_data = test_data;
    if let Some(rationale) = text(&obj, "rationale") {
        case.validation_points.push(rationale);
    }
    Some(case)
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn take_text(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    let value = text(obj, key);
    obj.remove(key);
    value
}
