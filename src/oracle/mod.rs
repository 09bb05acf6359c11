//! Detection oracles: the system under test, real or simulated.

#![allow(missing_docs)]

pub mod executor;
pub mod fixture;
pub mod simulated;

use thiserror::Error;

use crate::model::{ActualResult, TestCase};

pub use executor::{Executor, check_alignment};
pub use fixture::FixtureOracle;
pub use simulated::SimulatedOracle;

/// Why an oracle could not classify a case. Always becomes a BLOCKED result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("detection service unavailable: {details}")]
    Unavailable { details: String },

    #[error("detection call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("invalid detection response: {details}")]
    InvalidResponse { details: String },

    #[error("no fixture recorded for {test_case_id}")]
    MissingFixture { test_case_id: String },
}

/// Classifies one test case. May block; must be callable from several threads.
pub trait DetectionOracle: Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, case: &TestCase) -> Result<ActualResult, OracleError>;
}

impl<O: DetectionOracle + ?Sized> DetectionOracle for &O {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&self, case: &TestCase) -> Result<ActualResult, OracleError> {
        (**self).detect(case)
    }
}

impl<O: DetectionOracle + ?Sized> DetectionOracle for Box<O> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&self, case: &TestCase) -> Result<ActualResult, OracleError> {
        (**self).detect(case)
    }
}
