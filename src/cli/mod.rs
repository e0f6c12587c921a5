//! Command-line interface for clinflow.
//!
//! Provides an interactive chat loop, a one-shot `ask` command, an audit
//! summary command, and a config inspection command.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::InferenceClient;
use crate::config;
use crate::core::WorkflowAgent;
use crate::domain::{AgentResponse, AuditEvent, CallOutcome, EventType, RequestStatus};

/// clinflow - clinical workflow agent for administrative tasks
#[derive(Parser, Debug)]
#[command(name = "clinflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session
    Chat {
        /// Start in dry-run mode (no operation executes)
        #[arg(long)]
        dry_run: bool,
    },

    /// Process a single request and print the response as JSON
    Ask {
        /// The request text
        text: String,

        /// Simulate instead of executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the counters of the most recent session's audit log
    Summary,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Chat { dry_run } => chat(dry_run).await,
            Commands::Ask { text, dry_run } => ask(&text, dry_run).await,
            Commands::Summary => show_latest_summary(),
            Commands::Config => show_config(),
        }
    }
}

/// Build an agent from the resolved configuration.
async fn build_agent(dry_run_flag: bool) -> Result<WorkflowAgent> {
    let cfg = config::config()?;
    let api_key = cfg
        .api_key
        .clone()
        .context("No inference API key configured (set CLINFLOW_API_KEY)")?;

    let generator = InferenceClient::new(api_key, cfg.model.clone());
    let dry_run = dry_run_flag || cfg.dry_run;

    WorkflowAgent::new(Box::new(generator), &config::logs_dir()?, dry_run).await
}

/// One-shot request; prints the structured response as JSON.
async fn ask(text: &str, dry_run: bool) -> Result<()> {
    let mut agent = build_agent(dry_run).await?;
    let response = agent.process(text).await;
    agent.close().await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Interactive chat loop.
async fn chat(dry_run: bool) -> Result<()> {
    let mut agent = build_agent(dry_run).await?;

    println!("clinflow - clinical workflow agent (administrative tasks only)");
    println!("Session: {}", agent.session_id());
    if agent.dry_run() {
        println!("Dry-run mode is ON: no operation will execute.");
    }
    println!("Type 'help' for commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "summary" => {
                print_summary(&agent);
                continue;
            }
            "dry-run on" => {
                agent.set_dry_run(true);
                println!("Dry-run mode is ON: no operation will execute.");
                continue;
            }
            "dry-run off" => {
                agent.set_dry_run(false);
                println!("Dry-run mode is OFF: operations will execute.");
                continue;
            }
            _ => {}
        }

        let response = agent.process(input).await;
        render_response(&response);
    }

    print_summary(&agent);
    agent.close().await;
    println!("Session closed.");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  help           show this help");
    println!("  summary        show session counters");
    println!("  dry-run on     simulate operations without executing");
    println!("  dry-run off    execute operations normally");
    println!("  quit / exit    close the session");
    println!();
    println!("Anything else is processed as a workflow request, e.g.:");
    println!("  Find patient Ravi Kumar");
    println!("  Check insurance eligibility for P123456");
    println!("  Book a cardiology appointment for Ravi Kumar next week");
}

fn print_summary(agent: &WorkflowAgent) {
    let summary = agent.summary();
    println!("Session {}", summary.session_id);
    println!("  function calls: {}", summary.total_calls);
    println!("  successful:     {}", summary.successful);
    println!("  failed:         {}", summary.failed);
    println!("  dry-run:        {}", summary.dry_run_count);
    println!("  audit log:      {}", summary.log_file);
}

fn render_response(response: &AgentResponse) {
    match response.status {
        RequestStatus::Refused | RequestStatus::Error => {
            if let Some(error) = &response.error {
                println!("{}", error);
            }
            return;
        }
        _ => {}
    }

    if let Some(message) = &response.message {
        println!("{}", message);
    }

    for result in &response.results {
        let marker = if result.outcome.is_success() { "ok" } else { "failed" };
        let label = if result.dry_run {
            format!("{} (dry-run)", result.function)
        } else {
            result.function.clone()
        };

        match (&result.result, &result.error) {
            (Some(payload), _) => {
                let detail = payload["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string());
                println!("[{}] {}: {}", marker, label, detail);
            }
            (None, Some(error)) => println!("[{}] {}: {}", marker, label, error),
            (None, None) => println!("[{}] {}", marker, label),
        }
    }
}

/// Print the counters of the most recent session, replayed from its
/// audit log.
fn show_latest_summary() -> Result<()> {
    let logs = config::logs_dir()?;
    let path = match latest_log(&logs)? {
        Some(path) => path,
        None => {
            println!("No audit logs found in {}", logs.display());
            return Ok(());
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read audit log: {}", path.display()))?;
    let events = parse_log(&content)?;

    let session = events
        .first()
        .map(|e| e.session_id.clone())
        .unwrap_or_default();
    let closed = events
        .iter()
        .any(|e| e.event_type == EventType::SessionEnd);
    let (total, successful, failed, dry_run) = tally_calls(&events);

    println!(
        "Session {} ({})",
        session,
        if closed { "closed" } else { "open" }
    );
    println!("  function calls: {}", total);
    println!("  successful:     {}", successful);
    println!("  failed:         {}", failed);
    println!("  dry-run:        {}", dry_run);
    println!("  audit log:      {}", path.display());
    Ok(())
}

/// Most recent `audit_*.jsonl` in the log directory. Session ids are
/// time-formatted, so lexical order is chronological order.
fn latest_log(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut logs: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with("audit_") && name.ends_with(".jsonl"))
        })
        .collect();

    logs.sort();
    Ok(logs.pop())
}

fn parse_log(content: &str) -> Result<Vec<AuditEvent>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse audit event: {}", line))
        })
        .collect()
}

/// Tally function-call outcomes from a replayed log. Matches the live
/// session counters, which increment once per function_call record.
fn tally_calls(events: &[AuditEvent]) -> (u64, u64, u64, u64) {
    let (mut total, mut successful, mut failed, mut dry_run) = (0, 0, 0, 0);

    for event in events {
        if event.event_type != EventType::FunctionCall {
            continue;
        }
        total += 1;
        match event.outcome {
            Some(CallOutcome::Success) => successful += 1,
            Some(CallOutcome::ValidationError) | Some(CallOutcome::ExecutionError) => failed += 1,
            Some(CallOutcome::DryRun) => dry_run += 1,
            None => {}
        }
    }

    (total, successful, failed, dry_run)
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("home:        {}", cfg.home.display());
    println!("logs:        {}", config::logs_dir()?.display());
    println!(
        "model:       {}",
        cfg.model.as_deref().unwrap_or("(default)")
    );
    println!(
        "api key:     {}",
        if cfg.api_key.is_some() { "configured" } else { "not set" }
    );
    println!("dry-run:     {}", cfg.dry_run);
    match &cfg.config_file {
        Some(path) => println!("config file: {}", path.display()),
        None => println!("config file: (none found)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tally_counts_only_function_calls() {
        let session = "20260826_101500";
        let events = vec![
            AuditEvent::session_start(session),
            AuditEvent::user_input(session, "find Ravi"),
            AuditEvent::function_call(
                session,
                "search_patient",
                serde_json::json!({"name": "Ravi"}),
                CallOutcome::Success,
                false,
            ),
            AuditEvent::function_call(
                session,
                "search_patient",
                serde_json::json!({}),
                CallOutcome::ValidationError,
                false,
            ),
            AuditEvent::function_call(
                session,
                "book_appointment",
                serde_json::json!({}),
                CallOutcome::DryRun,
                true,
            ),
            AuditEvent::agent_response(session, "{}"),
        ];

        assert_eq!(tally_calls(&events), (3, 1, 1, 1));
    }

    #[test]
    fn test_latest_log_picks_newest_session() {
        let temp = TempDir::new().unwrap();
        for name in [
            "audit_20260825_090000.jsonl",
            "audit_20260826_101500.jsonl",
            "audit_20260826_080000.jsonl",
            "notes.txt",
        ] {
            std::fs::write(temp.path().join(name), "").unwrap();
        }

        let latest = latest_log(temp.path()).unwrap().unwrap();
        assert_eq!(
            latest.file_name().unwrap().to_str().unwrap(),
            "audit_20260826_101500.jsonl"
        );
    }

    #[test]
    fn test_latest_log_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("no-logs-here");
        assert!(latest_log(&missing).unwrap().is_none());
    }

    #[test]
    fn test_parse_log_round_trip() {
        let event = AuditEvent::user_input("s1", "find Ravi");
        let line = serde_json::to_string(&event).unwrap();
        let content = format!("{}\n\n", line);

        let events = parse_log(&content).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input.as_deref(), Some("find Ravi"));
    }
}
