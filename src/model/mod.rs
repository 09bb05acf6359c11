//! Records flowing through a QA cycle.

pub mod case;
pub mod requirements;
pub mod result;

pub use case::{ExpectedResult, TestCase, TestKind};
pub use requirements::Requirements;
pub use result::{ActualResult, Finding, FindingKind, FindingSeverity, TestResult, TestStatus};
