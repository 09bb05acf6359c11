//! Summaries, risk breakdowns and the persisted report document.

pub mod document;
pub mod risk_report;
pub mod summary;

pub use document::QaReport;
pub use risk_report::{RiskBreakdown, RiskContribution, risk_bar};
pub use summary::{Summary, create_summary};
