//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use fraud_qa_pipeline::analysis::decision::{DecisionPolicy, DeploymentDecision, decide};
use fraud_qa_pipeline::analysis::risk::{RiskAnalyzer, RiskLevel};
use fraud_qa_pipeline::core::config::Config;
use fraud_qa_pipeline::core::errors::QaError;
use fraud_qa_pipeline::logger::activity::{ActivityLoggerConfig, spawn_logger};
use fraud_qa_pipeline::logger::jsonl::JsonlConfig;
use fraud_qa_pipeline::model::Requirements;
use fraud_qa_pipeline::oracle::{DetectionOracle, FixtureOracle, SimulatedOracle};
use fraud_qa_pipeline::pipeline::QaPipeline;
use fraud_qa_pipeline::report::{QaReport, RiskBreakdown, Summary, create_summary};
use fraud_qa_pipeline::source::{
    CaseIdAllocator, FallbackSource, LlmResponseSource, RuleBasedSource, TestCaseSource,
};

/// Fraud QA pipeline: validate a fraud-detection system and gate its deployment.
#[derive(Debug, Parser)]
#[command(
    name = "fqa",
    author,
    version,
    about = "Fraud detection QA pipeline",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run a full QA cycle and write the report.
    Run(RunArgs),
    /// Recompute risk and the deployment decision from a saved report.
    Risk(RiskArgs),
    /// Print the summary of a saved report.
    Summary(SummaryArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Build the suite from a saved LLM reply, falling back to rule-based cases.
    #[arg(long, value_name = "FILE")]
    llm_response: Option<PathBuf>,
    /// Requirements JSON (fraud types, compliance, performance). Defaults to the standard set.
    #[arg(long, value_name = "FILE", conflicts_with = "quick")]
    requirements: Option<PathBuf>,
    /// Use the small two-fraud-type requirement set.
    #[arg(long)]
    quick: bool,
    /// Replay oracle outputs from a JSON fixture file instead of simulating.
    #[arg(long, value_name = "FILE")]
    fixtures: Option<PathBuf>,
    /// Seed for case generation and the simulated oracle.
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads for oracle calls (1 = sequential).
    #[arg(long)]
    workers: Option<usize>,
    /// Decision policy override.
    #[arg(long, value_name = "POLICY")]
    policy: Option<DecisionPolicy>,
    /// Report output path (defaults to paths.report_file).
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Do not write the report file.
    #[arg(long, conflicts_with = "output")]
    no_report: bool,
    /// Do not write the JSONL activity log.
    #[arg(long)]
    no_log: bool,
    /// Exit with status 4 when the deployment decision blocks.
    #[arg(long)]
    fail_on_block: bool,
}

#[derive(Debug, Clone, Args)]
struct RiskArgs {
    /// Saved report to re-assess.
    report: PathBuf,
    /// Decision policy override (defaults to the policy recorded in the report).
    #[arg(long, value_name = "POLICY")]
    policy: Option<DecisionPolicy>,
}

#[derive(Debug, Clone, Args)]
struct SummaryArgs {
    /// Saved report to summarize.
    report: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// The cycle completed but the deployment gate blocked.
    #[error("deployment blocked: {0}")]
    Blocked(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Blocked(_) => 4,
        }
    }
}

impl From<QaError> for CliError {
    fn from(err: QaError) -> Self {
        match err {
            QaError::InvalidConfig { .. }
            | QaError::MissingConfig { .. }
            | QaError::ConfigParse { .. }
            | QaError::LlmResponse { .. } => Self::User(err.to_string()),
            QaError::Serialization { .. } | QaError::CycleInvariant { .. } => {
                Self::Internal(err.to_string())
            }
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_cycle(cli, args),
        Command::Risk(args) => run_risk(cli, args),
        Command::Summary(args) => run_summary(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_cycle(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.execution.oracle_seed = seed;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::User("--workers must be at least 1".to_string()));
        }
        config.execution.workers = workers;
    }
    if let Some(policy) = args.policy {
        config.decision.policy = policy;
    }

    let requirements = match (&args.requirements, args.quick) {
        (Some(path), _) => Requirements::load(path).map_err(|e| input_error(path, e))?,
        (None, true) => Requirements::quick(),
        (None, false) => Requirements::standard(),
    };

    let rules = RuleBasedSource::new(config.execution.oracle_seed);
    let source: Box<dyn TestCaseSource> = match &args.llm_response {
        Some(path) => Box::new(FallbackSource::new(
            LlmResponseSource::from_file(path).map_err(|e| input_error(path, e))?,
            rules,
        )),
        None => Box::new(rules),
    };
    let oracle: Box<dyn DetectionOracle> = match &args.fixtures {
        Some(path) => {
            Box::new(FixtureOracle::from_json_file(path).map_err(|e| input_error(path, e))?)
        }
        None => Box::new(SimulatedOracle::from_config(
            &config.execution,
            &config.validation,
        )),
    };

    let logger = if args.no_log {
        None
    } else {
        Some(spawn_logger(ActivityLoggerConfig::new(JsonlConfig::at(
            config.paths.jsonl_log.clone(),
        )))?)
    };

    let report_path = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.report_file.clone());
    let mut pipeline = QaPipeline::new(config);
    if let Some((handle, _)) = &logger {
        pipeline = pipeline.with_logger(handle.clone());
    }

    let outcome = pipeline
        .run_cycle(
            source.as_ref(),
            oracle.as_ref(),
            &requirements,
            &mut CaseIdAllocator::default(),
        )
        .and_then(|report| {
            if !args.no_report {
                pipeline.export(&report, &report_path)?;
            }
            Ok(report)
        });

    drop(pipeline);
    if let Some((handle, join)) = logger {
        handle.shutdown();
        join.join()
            .map_err(|_| CliError::Internal("logger thread panicked".to_string()))?;
    }
    let report = outcome?;

    let written = (!args.no_report).then_some(report_path.as_path());
    match output_mode(cli) {
        OutputMode::Human => print_cycle_human(&report, written),
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "report_path": written.map(|p| p.to_string_lossy()),
                "total_tests": report.test_results.len(),
                "summary": serde_json::to_value(&report.summary)?,
                "risk_assessment": serde_json::to_value(&report.risk_assessment)?,
                "deployment_decision": report.deployment_decision,
                "deployment_recommendation": report.deployment_recommendation,
            });
            write_json_line(&payload)?;
        }
    }

    if args.fail_on_block && report.is_blocking() {
        return Err(CliError::Blocked(report.deployment_recommendation));
    }
    Ok(())
}

fn run_risk(cli: &Cli, args: &RiskArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let report = load_report(&args.report)?;
    let policy = args.policy.unwrap_or(report.decision_policy);

    let analyzer = RiskAnalyzer::new(config.risk.clone());
    let assessment = analyzer.calculate_risk(&report.test_results);
    let decision = decide(policy, &config.decision, &assessment, &report.test_results);
    let breakdown = RiskBreakdown::from_assessment(&assessment, analyzer.config());

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}", "Risk assessment".bold());
            println!("  Report: {}", args.report.display());
            println!("  Policy: {policy}");
            println!();
            print!("{}", indent(&breakdown.render_bars(30)));
            println!();
            println!(
                "  Overall: {:.2} ({})   Top risk: {}",
                breakdown.overall_risk_score,
                paint_level(breakdown.risk_level),
                breakdown.top_risk
            );
            println!();
            println!("  {:<20} {:>7} {:>7} {:>13}", "Component", "Score", "Weight", "Contribution");
            for (name, c) in breakdown.components() {
                println!(
                    "  {name:<20} {:>7.2} {:>7.2} {:>13.2}",
                    c.score, c.weight, c.contribution
                );
            }
            println!();
            println!("{}", "Recommendations".bold());
            for line in &breakdown.recommendations {
                println!("  - {line}");
            }
            println!();
            println!("  {}", paint_decision(decision));
            if decision != report.deployment_decision {
                println!(
                    "  (saved report recorded: {})",
                    report.deployment_decision.recommendation()
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "risk",
                "report": args.report.to_string_lossy(),
                "policy": policy,
                "risk_assessment": serde_json::to_value(&assessment)?,
                "risk_breakdown": serde_json::to_value(&breakdown)?,
                "deployment_decision": decision,
                "deployment_recommendation": decision.recommendation(),
                "saved_decision": report.deployment_decision,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_summary(cli: &Cli, args: &SummaryArgs) -> Result<(), CliError> {
    let report = load_report(&args.report)?;
    let summary = create_summary(
        &report.test_results,
        &report.hallucination_checks,
        Some(&report.risk_assessment),
    );
    match output_mode(cli) {
        OutputMode::Human => {
            print_summary_human(&summary);
            println!();
            println!("  {}", paint_decision(report.deployment_decision));
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "summary",
                "report": args.report.to_string_lossy(),
                "timestamp": report.timestamp,
                "summary": serde_json::to_value(&summary)?,
                "deployment_decision": report.deployment_decision,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("fqa {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "fqa",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn load_report(path: &Path) -> Result<QaReport, CliError> {
    QaReport::load(path).map_err(|e| input_error(path, e))
}

/// Unreadable or malformed user-supplied files are input errors, not bugs.
fn input_error(path: &Path, err: QaError) -> CliError {
    match err {
        QaError::Io { .. } | QaError::Serialization { .. } => {
            CliError::User(format!("cannot read {}: {err}", path.display()))
        }
        other => other.into(),
    }
}

fn print_cycle_human(report: &QaReport, written: Option<&Path>) {
    println!("{}", "Fraud QA cycle complete".bold());
    println!(
        "  Cases: {}   Policy: {}   Config: {}",
        report.test_cases.len(),
        report.decision_policy,
        report.config_hash
    );
    println!();
    print_summary_human(&report.summary);
    println!();
    println!("{}", "Risk".bold());
    print!("{}", indent(&report.risk_breakdown.render_bars(30)));
    for line in &report.risk_assessment.recommendations {
        println!("  - {line}");
    }
    println!();
    println!("  {}", paint_decision(report.deployment_decision));
    if let Some(path) = written {
        println!("  Report: {}", path.display());
    }
}

fn print_summary_human(summary: &Summary) {
    let overall = &summary.overall_metrics;
    let accuracy = &summary.accuracy_metrics;
    let perf = &summary.performance_metrics;
    let halluc = &summary.hallucination_summary;

    println!("{}", "Results".bold());
    println!(
        "  Total: {}   Passed: {}   Failed: {}   Blocked: {}   Skipped: {}",
        overall.total_test_cases, overall.passed, overall.failed, overall.blocked, overall.skipped
    );
    println!(
        "  Pass rate: {:.2}%   Execution: {} (avg {:.2}ms)",
        overall.pass_rate, overall.execution_time_formatted, overall.avg_execution_time_ms
    );
    println!("{}", "Accuracy".bold());
    let cm = &accuracy.confusion_matrix;
    println!(
        "  TP {}  FP {}  TN {}  FN {}",
        cm.true_positives, cm.false_positives, cm.true_negatives, cm.false_negatives
    );
    println!(
        "  Precision {:.2}%   Recall {:.2}%   F1 {:.2}%   FPR {:.2}%   FNR {:.2}%",
        accuracy.precision,
        accuracy.recall,
        accuracy.f1_score,
        accuracy.false_positive_rate,
        accuracy.false_negative_rate
    );
    println!("{}", "Latency".bold());
    println!(
        "  avg {:.2}ms  min {:.2}ms  max {:.2}ms  p95 {:.2}ms  p99 {:.2}ms",
        perf.avg_response_time_ms,
        perf.min_response_time_ms,
        perf.max_response_time_ms,
        perf.p95_response_time_ms,
        perf.p99_response_time_ms
    );
    println!("{}", "Hallucinations".bold());
    println!(
        "  {} flagged result(s), {} finding(s), rate {:.2}%, critical {}",
        halluc.total_checks, halluc.hallucinations_detected, halluc.hallucination_rate, halluc.critical_count
    );
    let failures = &summary.failure_analysis;
    if failures.total_failures > 0 {
        println!("{}", "Failures".bold());
        for (kind, count) in &failures.by_kind {
            println!("  {kind:<16} {count}");
        }
        for critical in &failures.critical_failures {
            println!("  {} {}", "critical:".red(), critical.test_case_id);
        }
    }
    if let Some(risk) = &summary.risk_assessment_summary {
        println!(
            "  Risk {:.2} ({})   Top: {}",
            risk.overall_risk_score,
            paint_level(risk.risk_level),
            risk.top_risk
        );
    }
    println!("{}", "Insights".bold());
    for insight in &summary.insights {
        println!("  {insight}");
    }
}

fn paint_decision(decision: DeploymentDecision) -> String {
    let text = decision.recommendation();
    match decision {
        DeploymentDecision::Approved => text.green().bold().to_string(),
        DeploymentDecision::DeployWithCaution => text.yellow().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}

fn paint_level(level: RiskLevel) -> String {
    let text = level.as_str();
    match level {
        RiskLevel::Low => text.green().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::High | RiskLevel::Critical => text.red().to_string(),
    }
}

fn indent(block: &str) -> String {
    block.lines().map(|l| format!("  {l}\n")).collect()
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FQA_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
