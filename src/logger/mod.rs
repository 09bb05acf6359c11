//! Activity logging: JSONL writer with graceful degradation plus a background logger thread.

pub mod activity;
pub mod jsonl;
