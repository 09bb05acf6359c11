//! Canned oracle outputs keyed by test case id.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::core::errors::{QaError, Result};
use crate::model::{ActualResult, TestCase};
use crate::oracle::{DetectionOracle, OracleError};

/// Replays recorded results; unknown ids fail with [`OracleError::MissingFixture`].
#[derive(Debug, Clone, Default)]
pub struct FixtureOracle {
    results: HashMap<String, ActualResult>,
    failures: HashMap<String, OracleError>,
}

impl FixtureOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_result(mut self, test_case_id: impl Into<String>, actual: ActualResult) -> Self {
        self.results.insert(test_case_id.into(), actual);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, test_case_id: impl Into<String>, error: OracleError) -> Self {
        self.failures.insert(test_case_id.into(), error);
        self
    }

    /// Load a JSON object mapping case ids to actual-result objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| QaError::io(path, source))?;
        let results: HashMap<String, ActualResult> = serde_json::from_str(&raw)?;
        Ok(Self {
            results,
            failures: HashMap::new(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DetectionOracle for FixtureOracle {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn detect(&self, case: &TestCase) -> std::result::Result<ActualResult, OracleError> {
        if let Some(err) = self.failures.get(&case.id) {
            return Err(err.clone());
        }
        self.results
            .get(&case.id)
            .cloned()
            .ok_or_else(|| OracleError::MissingFixture {
                test_case_id: case.id.clone(),
            })
    }
}
