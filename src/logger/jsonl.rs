//! JSONL activity log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all`, so a
//! reader tailing the file never sees a partial line.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. Fallback path (defaults to the system temp dir)
//! 3. stderr with `[FQA-JSONL]` prefix
//! 4. Silent discard (a QA cycle never fails because logging did)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::errors::{QaError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Events emitted over one QA cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CycleStart,
    CasesGenerated,
    TestExecuted,
    TestBlocked,
    HallucinationDetected,
    RiskAssessed,
    DeploymentDecided,
    ReportExported,
    CycleComplete,
    Error,
}

/// A single JSONL log entry. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    /// Test kind label (`FRAUD_POSITIVE`, `PERFORMANCE`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Risk score, or hallucination confidence for `hallucination_detected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    /// Number of items the event covers (cases, findings, results).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// FQA error code if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Whether retrying the failed step might succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            test_case_id: None,
            kind: None,
            status: None,
            score: None,
            risk_level: None,
            decision: None,
            count: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            recoverable: None,
            details: None,
        }
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Optional fallback path, ideally on a different filesystem.
    pub fallback_path: Option<PathBuf>,
    /// Maximum file size before rotation (bytes). Default: 10 MiB.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep. Default: 3.
    pub max_rotated_files: u32,
    /// Seconds between forced fsync calls. Default: 5.
    pub fsync_interval_secs: u64,
}

impl JsonlConfig {
    /// Defaults with the primary log at `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: crate::core::config::PathsConfig::default().jsonl_log,
            fallback_path: Some(std::env::temp_dir().join("fqa-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 5,
        }
    }
}

/// Where lines currently go. Each variant owns what it writes to.
enum Sink {
    Primary(BufWriter<File>),
    Fallback(BufWriter<File>),
    Stderr,
    Discard,
}

impl Sink {
    const fn label(&self) -> &'static str {
        match self {
            Self::Primary(_) => "normal",
            Self::Fallback(_) => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }

    fn file(&mut self) -> Option<&mut BufWriter<File>> {
        match self {
            Self::Primary(w) | Self::Fallback(w) => Some(w),
            Self::Stderr | Self::Discard => None,
        }
    }
}

const WRITE_BUFFER: usize = 64 * 1024;

/// Append-only JSONL writer with size-based rotation and a fallback chain.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    /// Size of the file currently behind `sink`.
    file_len: u64,
    last_sync: Instant,
}

impl JsonlWriter {
    /// Open the primary log, walking down the chain until something accepts writes.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            sink: Sink::Discard,
            file_len: 0,
            last_sync: Instant::now(),
        };
        writer.sink = match writer.open_primary() {
            Some(sink) => sink,
            None => writer.open_fallback(),
        };
        writer
    }

    /// Serialize `entry` and append it as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.append(&line);
            }
            Err(e) => eprintln!("[FQA-JSONL] dropping unserializable entry: {e}"),
        }
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.sink.file() {
            let _ = w.flush();
        }
    }

    /// Flush and `sync_data` the active file.
    pub fn fsync(&mut self) {
        if let Some(w) = self.sink.file() {
            let _ = w.flush();
            let _ = w.get_ref().sync_data();
        }
        self.last_sync = Instant::now();
    }

    /// `normal`, `fallback`, `stderr` or `discard`.
    pub fn state(&self) -> &'static str {
        self.sink.label()
    }

    pub fn bytes_written(&self) -> u64 {
        self.file_len
    }

    /// Whether lines are going anywhere but the primary file.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.sink, Sink::Primary(_))
    }

    /// Reopen the primary path if the writer has degraded.
    pub fn try_recover(&mut self) {
        if !self.is_degraded() {
            return;
        }
        self.flush();
        if let Some(sink) = self.open_primary() {
            self.sink = sink;
            eprintln!(
                "[FQA-JSONL] back on primary log {}",
                self.config.path.display()
            );
        }
    }

    fn append(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.sink.file().is_some() && self.file_len + len > self.config.max_size_bytes {
            self.rotate();
        }

        let written = match &mut self.sink {
            Sink::Primary(w) | Sink::Fallback(w) => w.write_all(line.as_bytes()).is_ok(),
            Sink::Stderr => {
                eprint!("[FQA-JSONL] {line}");
                return;
            }
            Sink::Discard => return,
        };

        if written {
            self.file_len += len;
            if self.last_sync.elapsed() >= Duration::from_secs(self.config.fsync_interval_secs) {
                self.fsync();
            }
        } else {
            self.step_down();
            self.append(line);
        }
    }

    fn open_primary(&mut self) -> Option<Sink> {
        let (file, len) = open_append(&self.config.path).ok()?;
        self.file_len = len;
        Some(Sink::Primary(BufWriter::with_capacity(WRITE_BUFFER, file)))
    }

    fn open_fallback(&mut self) -> Sink {
        let opened = self
            .config
            .fallback_path
            .as_deref()
            .map(|fb| (fb, open_append(fb)));
        match opened {
            Some((fb, Ok((file, len)))) => {
                eprintln!(
                    "[FQA-JSONL] cannot open {}, logging to {}",
                    self.config.path.display(),
                    fb.display()
                );
                self.file_len = len;
                Sink::Fallback(BufWriter::with_capacity(WRITE_BUFFER, file))
            }
            Some((_, Err(_))) | None => {
                eprintln!("[FQA-JSONL] no writable log file, logging to stderr");
                Sink::Stderr
            }
        }
    }

    /// Move one step down the chain after a failed write.
    fn step_down(&mut self) {
        self.sink = match std::mem::replace(&mut self.sink, Sink::Discard) {
            Sink::Primary(_) => self.open_fallback(),
            Sink::Fallback(_) => {
                eprintln!("[FQA-JSONL] fallback log failed, logging to stderr");
                Sink::Stderr
            }
            Sink::Stderr | Sink::Discard => Sink::Discard,
        };
    }

    fn rotate(&mut self) {
        self.flush();
        let base = match &self.sink {
            Sink::Primary(_) => self.config.path.clone(),
            Sink::Fallback(_) => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            Sink::Stderr | Sink::Discard => return,
        };
        let primary = matches!(self.sink, Sink::Primary(_));
        // Close before renaming the file out from under the handle.
        self.sink = Sink::Discard;
        shift_generations(&base, self.config.max_rotated_files);

        match open_append(&base) {
            Ok((file, _)) => {
                let w = BufWriter::with_capacity(WRITE_BUFFER, file);
                self.sink = if primary {
                    Sink::Primary(w)
                } else {
                    Sink::Fallback(w)
                };
                self.file_len = 0;
            }
            Err(_) => {
                self.sink = if primary {
                    self.open_fallback()
                } else {
                    Sink::Stderr
                };
            }
        }
    }
}

/// `log` becomes `log.1`, `log.1` becomes `log.2`, and so on; anything past `keep` is removed.
fn shift_generations(base: &Path, keep: u32) {
    let _ = fs::remove_file(rotated_name(base, keep));
    for i in (1..keep).rev() {
        let _ = fs::rename(rotated_name(base, i), rotated_name(base, i + 1));
    }
    let _ = fs::rename(base, rotated_name(base, 1));
}

/// Create parents, open for append, and report the current length.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| QaError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| QaError::io(path, source))?;
    let len = file.metadata().map_or(0, |m| m.len());
    Ok((file, len))
}

/// `activity.jsonl` -> `activity.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 60,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        let mut entry = LogEntry::new(EventType::RiskAssessed, Severity::Info);
        entry.score = Some(42.5);
        entry.risk_level = Some("MEDIUM".to_string());
        writer.write_entry(&entry);
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "risk_assessed");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["score"], 42.5);
        assert_eq!(parsed["risk_level"], "MEDIUM");
    }

    #[test]
    fn multiple_entries_are_separate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        for _ in 0..5 {
            writer.write_entry(&LogEntry::new(EventType::TestExecuted, Severity::Info));
        }
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);
        for line in contents.lines() {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
        assert_eq!(writer.bytes_written(), contents.len() as u64);
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut cfg = config(path.clone());
        cfg.max_size_bytes = 100;
        let mut writer = JsonlWriter::open(cfg);

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::TestExecuted, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 5).exists());
    }

    #[test]
    fn fallback_when_primary_dir_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut cfg = config(blocker.join("primary.jsonl"));
        cfg.fallback_path = Some(fallback.clone());
        let mut writer = JsonlWriter::open(cfg);

        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::Error, Severity::Warning));
        writer.flush();

        let contents = fs::read_to_string(&fallback).unwrap();
        assert!(contents.contains("\"error\""));
    }

    #[test]
    fn stderr_when_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let writer = JsonlWriter::open(config(blocker.join("primary.jsonl")));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn state_reports_normal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::open(config(dir.path().join("ok.jsonl")));
        assert_eq!(writer.state(), "normal");
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        writer.write_entry(&LogEntry::new(EventType::CycleStart, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"test_case_id\""));
        assert!(!line.contains("\"score\""));
        assert!(!line.contains("\"decision\""));
    }

    #[test]
    fn at_overrides_only_the_path() {
        let cfg = JsonlConfig::at("/tmp/x.jsonl");
        assert_eq!(cfg.path, PathBuf::from("/tmp/x.jsonl"));
        assert_eq!(cfg.max_rotated_files, JsonlConfig::default().max_rotated_files);
    }

    #[test]
    fn try_recover_returns_to_primary_once_writable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, "not a directory").unwrap();
        let primary = blocker.join("activity.jsonl");
        let fallback = dir.path().join("fallback.jsonl");
        let mut cfg = config(primary.clone());
        cfg.fallback_path = Some(fallback.clone());

        let mut writer = JsonlWriter::open(cfg);
        assert_eq!(writer.state(), "fallback");
        assert!(writer.is_degraded());
        writer.write_entry(&LogEntry::new(EventType::CycleStart, Severity::Info));

        writer.try_recover();
        assert_eq!(writer.state(), "fallback");

        fs::remove_file(&blocker).unwrap();
        writer.try_recover();
        assert_eq!(writer.state(), "normal");
        writer.write_entry(&LogEntry::new(EventType::CycleComplete, Severity::Info));
        writer.flush();

        assert_eq!(fs::read_to_string(&fallback).unwrap().lines().count(), 1);
        let recovered = fs::read_to_string(&primary).unwrap();
        assert!(recovered.contains("cycle_complete"));
    }
}
