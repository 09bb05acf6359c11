//! Background activity logger.
//!
//! A dedicated thread owns the [`JsonlWriter`]. Everything else sends
//! [`ActivityEvent`]s over a bounded crossbeam channel with `try_send()`, so a
//! slow disk can never stall test execution.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{QaError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 1024;
/// How often a degraded writer retries the primary log.
const RECOVER_INTERVAL: Duration = Duration::from_secs(30);

/// Events a QA cycle reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    CycleStarted {
        source: String,
        oracle: String,
        config_hash: String,
    },
    CasesGenerated {
        source: String,
        count: usize,
    },
    TestExecuted {
        test_case_id: String,
        kind: String,
        status: String,
        duration_ms: u64,
    },
    TestBlocked {
        test_case_id: String,
        reason: String,
    },
    HallucinationDetected {
        test_case_id: String,
        severity: String,
        count: usize,
        confidence: f64,
    },
    RiskAssessed {
        overall_risk_score: f64,
        risk_level: String,
    },
    DeploymentDecided {
        decision: String,
        recommendation: String,
        blocking: bool,
    },
    ReportExported {
        path: String,
    },
    CycleCompleted {
        total_tests: usize,
        failed: usize,
        duration_ms: u64,
    },
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

/// Cheaply cloneable handle for sending log events. Never blocks.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Send an event; if the channel is full it is dropped and counted.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped due to back-pressure and not yet reported in the log.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Blocks only if the channel is full.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

/// Options for the logger thread.
#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl: JsonlConfig,
    pub channel_capacity: usize,
}

impl ActivityLoggerConfig {
    #[must_use]
    pub fn new(jsonl: JsonlConfig) -> Self {
        Self {
            jsonl,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

impl Default for ActivityLoggerConfig {
    fn default() -> Self {
        Self::new(JsonlConfig::default())
    }
}

/// Spawn the logger thread and return a handle plus its join handle.
///
/// The thread runs until `handle.shutdown()` is called or every handle is dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("fqa-logger".to_string())
        .spawn(move || logger_thread_main(rx, config.jsonl, dropped_clone))
        .map_err(|e| QaError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

#[allow(clippy::needless_pass_by_value)]
fn logger_thread_main(rx: Receiver<ActivityEvent>, jsonl_config: JsonlConfig, dropped: Arc<AtomicU64>) {
    let mut jsonl = JsonlWriter::open(jsonl_config);
    let mut last_recover = Instant::now();

    while let Ok(event) = rx.recv() {
        if jsonl.is_degraded() && last_recover.elapsed() >= RECOVER_INTERVAL {
            jsonl.try_recover();
            last_recover = Instant::now();
        }

        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.count = Some(d);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::CycleStarted {
            source,
            oracle,
            config_hash,
        } => {
            let mut e = LogEntry::new(EventType::CycleStart, Severity::Info);
            e.details = Some(format!(
                "source={source} oracle={oracle} config_hash={config_hash}"
            ));
            e
        }
        ActivityEvent::CasesGenerated { source, count } => {
            let mut e = LogEntry::new(EventType::CasesGenerated, Severity::Info);
            e.count = Some(*count as u64);
            e.details = Some(format!("source={source}"));
            e
        }
        ActivityEvent::TestExecuted {
            test_case_id,
            kind,
            status,
            duration_ms,
        } => {
            let passed = status == "PASSED";
            let mut e = LogEntry::new(
                EventType::TestExecuted,
                if passed { Severity::Info } else { Severity::Warning },
            );
            e.test_case_id = Some(test_case_id.clone());
            e.kind = Some(kind.clone());
            e.status = Some(status.clone());
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(passed);
            e
        }
        ActivityEvent::TestBlocked {
            test_case_id,
            reason,
        } => {
            let mut e = LogEntry::new(EventType::TestBlocked, Severity::Warning);
            e.test_case_id = Some(test_case_id.clone());
            e.status = Some("BLOCKED".to_string());
            e.error_message = Some(reason.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::HallucinationDetected {
            test_case_id,
            severity,
            count,
            confidence,
        } => {
            let level = if severity == "CRITICAL" {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let mut e = LogEntry::new(EventType::HallucinationDetected, level);
            e.test_case_id = Some(test_case_id.clone());
            e.count = Some(*count as u64);
            e.score = Some(*confidence);
            e.details = Some(format!("severity={severity}"));
            e
        }
        ActivityEvent::RiskAssessed {
            overall_risk_score,
            risk_level,
        } => {
            let level = match risk_level.as_str() {
                "CRITICAL" => Severity::Critical,
                "HIGH" => Severity::Warning,
                _ => Severity::Info,
            };
            let mut e = LogEntry::new(EventType::RiskAssessed, level);
            e.score = Some(*overall_risk_score);
            e.risk_level = Some(risk_level.clone());
            e
        }
        ActivityEvent::DeploymentDecided {
            decision,
            recommendation,
            blocking,
        } => {
            let mut e = LogEntry::new(
                EventType::DeploymentDecided,
                if *blocking { Severity::Critical } else { Severity::Info },
            );
            e.decision = Some(decision.clone());
            e.details = Some(recommendation.clone());
            e.ok = Some(!*blocking);
            e
        }
        ActivityEvent::ReportExported { path } => {
            let mut e = LogEntry::new(EventType::ReportExported, Severity::Info);
            e.details = Some(path.clone());
            e.ok = Some(true);
            e
        }
        ActivityEvent::CycleCompleted {
            total_tests,
            failed,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::CycleComplete, Severity::Info);
            e.count = Some(*total_tests as u64);
            e.duration_ms = Some(*duration_ms);
            e.details = Some(format!("failed={failed}"));
            e
        }
        ActivityEvent::Error {
            code,
            message,
            recoverable,
        } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.recoverable = Some(*recoverable);
            e.ok = Some(false);
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::CycleComplete, Severity::Info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> ActivityLoggerConfig {
        ActivityLoggerConfig {
            jsonl: JsonlConfig {
                path: dir.join("test.jsonl"),
                fallback_path: None,
                max_size_bytes: 10 * 1024 * 1024,
                max_rotated_files: 3,
                fsync_interval_secs: 60,
            },
            channel_capacity: 64,
        }
    }

    fn read_lines(dir: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(dir.join("test.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn spawn_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        handle.send(ActivityEvent::CycleStarted {
            source: "rule_based".to_string(),
            oracle: "simulated".to_string(),
            config_hash: "abc".to_string(),
        });
        handle.shutdown();
        join.join().unwrap();

        let lines = read_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "cycle_start");
        assert!(lines[0]["details"].as_str().unwrap().contains("config_hash=abc"));
    }

    #[test]
    fn events_map_to_entries() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();

        handle.send(ActivityEvent::TestExecuted {
            test_case_id: "TC-CARD-001".to_string(),
            kind: "FRAUD_POSITIVE".to_string(),
            status: "FAILED".to_string(),
            duration_ms: 12,
        });
        handle.send(ActivityEvent::RiskAssessed {
            overall_risk_score: 81.25,
            risk_level: "CRITICAL".to_string(),
        });
        handle.send(ActivityEvent::DeploymentDecided {
            decision: "BLOCK_HIGH_RISK".to_string(),
            recommendation: "DO NOT DEPLOY - High risk score".to_string(),
            blocking: true,
        });
        handle.shutdown();
        join.join().unwrap();

        let lines = read_lines(dir.path());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["test_case_id"], "TC-CARD-001");
        assert_eq!(lines[0]["severity"], "warning");
        assert_eq!(lines[0]["ok"], false);
        assert_eq!(lines[1]["score"], 81.25);
        assert_eq!(lines[1]["severity"], "critical");
        assert_eq!(lines[2]["decision"], "BLOCK_HIGH_RISK");
    }

    #[test]
    fn handles_cloneable_and_send() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        let h2 = handle.clone();

        let t = std::thread::spawn(move || {
            h2.send(ActivityEvent::CasesGenerated {
                source: "rule_based".to_string(),
                count: 24,
            });
        });
        t.join().unwrap();
        handle.send(ActivityEvent::Error {
            code: "FQA-2002".to_string(),
            message: "reply is not JSON".to_string(),
            recoverable: false,
        });
        handle.shutdown();
        join.join().unwrap();

        let lines = read_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["count"], 24);
        assert_eq!(lines[1]["error_code"], "FQA-2002");
        assert_eq!(lines[1]["recoverable"], false);
    }

    #[test]
    fn dropping_all_handles_stops_thread() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        handle.send(ActivityEvent::ReportExported {
            path: "/tmp/report.json".to_string(),
        });
        drop(handle);
        join.join().unwrap();
        assert_eq!(read_lines(dir.path()).len(), 1);
    }

    #[test]
    fn full_channel_counts_drops() {
        let (tx, rx) = bounded::<ActivityEvent>(1);
        let handle = ActivityLoggerHandle {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        for _ in 0..3 {
            handle.send(ActivityEvent::ReportExported {
                path: "x".to_string(),
            });
        }
        assert_eq!(handle.dropped_events(), 2);
        drop(rx);
    }
}
