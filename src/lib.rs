#![forbid(unsafe_code)]

//! Fraud QA pipeline: quality assurance for fraud-detection systems.
//!
//! One QA cycle generates a test suite, runs it against a detection oracle,
//! validates every output, checks outputs for hallucinated claims, rolls the
//! results up into accuracy and latency metrics, scores deployment risk and
//! makes a go/no-go decision. The persisted artifact is a single JSON report.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use fraud_qa_pipeline::prelude::*;
//!
//! let pipeline = QaPipeline::new(Config::default());
//! let report = pipeline.run_cycle(
//!     &RuleBasedSource::default(),
//!     &SimulatedOracle::default(),
//!     &Requirements::standard(),
//!     &mut CaseIdAllocator::default(),
//! )?;
//! println!("{}", report.deployment_recommendation);
//! # Ok::<(), QaError>(())
//! ```

pub mod prelude;

pub mod analysis;
pub mod core;
pub mod logger;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod source;
