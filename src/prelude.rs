//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use fraud_qa_pipeline::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{QaError, Result};

// Model
pub use crate::model::{
    ActualResult, ExpectedResult, Finding, FindingKind, FindingSeverity, Requirements, TestCase,
    TestKind, TestResult, TestStatus,
};

// Sources and oracles
pub use crate::oracle::{DetectionOracle, Executor, FixtureOracle, OracleError, SimulatedOracle};
pub use crate::source::{
    CaseIdAllocator, FallbackSource, LlmResponseSource, RuleBasedSource, TestCaseSource,
};

// Analysis
pub use crate::analysis::decision::{DecisionPolicy, DeploymentDecision, decide};
pub use crate::analysis::hallucination::{
    HallucinationCheck, HallucinationChecker, HallucinationSeverity, IndicatorGrounding,
    PatternGrounding,
};
pub use crate::analysis::metrics::{AccuracyMetrics, PerformanceMetrics, aggregate};
pub use crate::analysis::risk::{RiskAnalyzer, RiskAssessment, RiskLevel};
pub use crate::analysis::validator::ResultValidator;

// Reporting and orchestration
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::pipeline::QaPipeline;
pub use crate::report::{QaReport, RiskBreakdown, Summary};
