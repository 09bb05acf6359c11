//! One QA cycle: generate, execute, validate, check, assess, decide, report.
//!
//! A cycle is a function of its inputs. The id allocator is passed in, the
//! oracle is injected, and every stage after execution is a pure reduction
//! over the aligned `(cases, results)` pair.

#![allow(missing_docs)]

use std::time::Instant;

use crate::analysis::decision::decide;
use crate::analysis::hallucination::{HallucinationChecker, PatternGrounding};
use crate::analysis::risk::RiskAnalyzer;
use crate::analysis::validator::ResultValidator;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::model::{Requirements, TestCase, TestResult, TestStatus};
use crate::oracle::{DetectionOracle, Executor, check_alignment};
use crate::report::{QaReport, RiskBreakdown, create_summary};
use crate::source::{CaseIdAllocator, TestCaseSource};

/// Cycle orchestrator bound to one effective configuration.
pub struct QaPipeline {
    config: Config,
    logger: Option<ActivityLoggerHandle>,
}

impl QaPipeline {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            logger: None,
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a full cycle. Source and invariant errors are returned, never swallowed.
    pub fn run_cycle<S, O>(
        &self,
        source: &S,
        oracle: &O,
        requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<QaReport>
    where
        S: TestCaseSource + ?Sized,
        O: DetectionOracle + ?Sized,
    {
        let start = Instant::now();
        let config_hash = self.config.stable_hash()?;
        self.log(ActivityEvent::CycleStarted {
            source: source.name().to_string(),
            oracle: oracle.name().to_string(),
            config_hash,
        });

        let outcome = self.run_stages(source, oracle, requirements, ids);
        match &outcome {
            Ok(report) => self.log(ActivityEvent::CycleCompleted {
                total_tests: report.test_results.len(),
                failed: report.summary.overall_metrics.failed,
                duration_ms: elapsed_ms(start),
            }),
            Err(err) => self.log(ActivityEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
                recoverable: err.is_retryable(),
            }),
        }
        outcome
    }

    fn run_stages<S, O>(
        &self,
        source: &S,
        oracle: &O,
        requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<QaReport>
    where
        S: TestCaseSource + ?Sized,
        O: DetectionOracle + ?Sized,
    {
        let cases = source.generate(requirements, ids)?;
        self.log(ActivityEvent::CasesGenerated {
            source: source.name().to_string(),
            count: cases.len(),
        });

        let results = self.execute(oracle, &cases)?;
        self.evaluate(cases, results)
    }

    /// Execute and validate a suite, logging each result as it lands.
    pub fn execute<O>(&self, oracle: &O, cases: &[TestCase]) -> Result<Vec<TestResult>>
    where
        O: DetectionOracle + ?Sized,
    {
        let validator = ResultValidator::from_config(&self.config.validation);
        Executor::new(oracle, validator)
            .with_workers(self.config.execution.workers)
            .run_with(cases, |result| self.log_result(result))
    }

    /// Every stage after execution: hallucination checks, risk, decision, report.
    pub fn evaluate(&self, cases: Vec<TestCase>, results: Vec<TestResult>) -> Result<QaReport> {
        check_alignment(&cases, &results)?;

        let checker = HallucinationChecker::with_grounding(
            self.config.hallucination.clone(),
            PatternGrounding::from_cases(&cases),
        );
        let checks = checker.verify(&results);
        for check in &checks {
            self.log(ActivityEvent::HallucinationDetected {
                test_case_id: check.test_case_id.clone(),
                severity: check.severity.as_str().to_string(),
                count: check.hallucinations_detected.len(),
                confidence: check.confidence_score,
            });
        }

        let analyzer = RiskAnalyzer::new(self.config.risk.clone());
        let assessment = analyzer.calculate_risk(&results);
        self.log(ActivityEvent::RiskAssessed {
            overall_risk_score: assessment.overall_risk_score,
            risk_level: assessment.risk_level.as_str().to_string(),
        });

        let policy = self.config.decision.policy;
        let decision = decide(policy, &self.config.decision, &assessment, &results);
        self.log(ActivityEvent::DeploymentDecided {
            decision: decision.as_str().to_string(),
            recommendation: decision.recommendation().to_string(),
            blocking: decision.is_blocking(),
        });

        let summary = create_summary(&results, &checks, Some(&assessment));
        let risk_breakdown = RiskBreakdown::from_assessment(&assessment, analyzer.config());

        Ok(QaReport {
            timestamp: QaReport::now(),
            test_cases: cases,
            test_results: results,
            hallucination_checks: checks,
            deployment_recommendation: decision.recommendation().to_string(),
            deployment_decision: decision,
            decision_policy: policy,
            risk_assessment: assessment,
            summary,
            risk_breakdown,
            config_hash: self.config.stable_hash()?,
        })
    }

    /// Persist a report and log the export.
    pub fn export(&self, report: &QaReport, path: &std::path::Path) -> Result<()> {
        report.write(path)?;
        self.log(ActivityEvent::ReportExported {
            path: path.display().to_string(),
        });
        Ok(())
    }

    fn log_result(&self, result: &TestResult) {
        if result.status == TestStatus::Blocked {
            self.log(ActivityEvent::TestBlocked {
                test_case_id: result.test_case_id.clone(),
                reason: result.errors.join("; "),
            });
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let duration_ms = result.execution_time_ms.round() as u64;
            self.log(ActivityEvent::TestExecuted {
                test_case_id: result.test_case_id.clone(),
                kind: result.kind.label().to_string(),
                status: result.status.label().to_string(),
                duration_ms,
            });
        }
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
