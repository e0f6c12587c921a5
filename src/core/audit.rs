//! Append-only audit logging with session accounting.
//!
//! One logger per session, bound to one JSONL file. Records are written
//! newline-delimited for easy inspection and replay. The append path never
//! fails the caller: a sink failure is counted and logged as a degraded
//! condition, and the in-flight request continues. Clinical workflow
//! correctness must not depend on log durability at request time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::domain::{AuditEvent, CallOutcome};

/// Logger lifecycle: records are accepted only while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoggerState {
    Open,
    Closed,
}

/// Session counter snapshot, queryable at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub log_file: String,
    pub total_calls: u64,
    pub successful: u64,
    pub failed: u64,
    pub dry_run_count: u64,
}

/// Append-only audit sink for one session.
pub struct AuditLogger {
    session_id: String,
    log_path: PathBuf,
    state: LoggerState,

    total_calls: u64,
    successful: u64,
    failed: u64,
    dry_run_count: u64,

    /// Records the sink could not accept; observable so operators can
    /// detect audit gaps.
    degraded_records: u64,
}

impl AuditLogger {
    /// Open a logger for a new session under the given log directory.
    ///
    /// The session id is time-derived and unique per process run; the
    /// first record in every log file is `session_start`.
    pub async fn open(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_path = log_dir.join(format!("audit_{}.jsonl", session_id));

        let mut logger = Self {
            session_id: session_id.clone(),
            log_path,
            state: LoggerState::Open,
            total_calls: 0,
            successful: 0,
            failed: 0,
            dry_run_count: 0,
            degraded_records: 0,
        };

        logger.record(AuditEvent::session_start(&session_id)).await;
        Ok(logger)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one event. Never fails the caller; sink errors degrade
    /// logging instead of aborting the request.
    pub async fn record(&mut self, event: AuditEvent) {
        if self.state == LoggerState::Closed {
            self.degraded_records += 1;
            warn!(
                session = %self.session_id,
                event_type = ?event.event_type,
                "Audit record dropped: session already closed"
            );
            return;
        }

        if let Err(e) = self.append(&event).await {
            self.degraded_records += 1;
            warn!(
                session = %self.session_id,
                error = %e,
                "Audit sink degraded: record not persisted"
            );
        }
    }

    async fn append(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize audit event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write audit event")?;
        file.flush().await.context("Failed to flush audit event")?;

        Ok(())
    }

    /// Update session counters for one call outcome. Never fails.
    pub fn count_outcome(&mut self, outcome: CallOutcome) {
        self.total_calls += 1;
        match outcome {
            CallOutcome::Success => self.successful += 1,
            CallOutcome::ValidationError | CallOutcome::ExecutionError => self.failed += 1,
            CallOutcome::DryRun => self.dry_run_count += 1,
        }
    }

    /// Idempotent, side-effect-free counter snapshot.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            log_file: self.log_path.display().to_string(),
            total_calls: self.total_calls,
            successful: self.successful,
            failed: self.failed,
            dry_run_count: self.dry_run_count,
        }
    }

    /// Number of records the sink failed to accept.
    pub fn degraded_records(&self) -> u64 {
        self.degraded_records
    }

    /// Emit `session_end` with the final summary and stop accepting
    /// records. Transitions open -> closed exactly once.
    pub async fn close(&mut self) {
        if self.state == LoggerState::Closed {
            return;
        }

        let summary = serde_json::to_value(self.summary()).unwrap_or_default();
        self.record(AuditEvent::session_end(&self.session_id, summary))
            .await;
        self.state = LoggerState::Closed;
    }

    /// Read back every event in order. Used by tests and audit review.
    pub async fn replay(&self) -> Result<Vec<AuditEvent>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .await
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse audit event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }
}
