//! Per-call results and the aggregated agent response.
//!
//! A request produces one [`AgentResponse`] containing an ordered ledger of
//! [`CallResult`]s. Individual call failures are captured here, never
//! propagated past the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one planned call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Operation invoked and the backing store satisfied it
    Success,

    /// Parameters failed structural/business validation; never invoked
    ValidationError,

    /// Parameters were valid but the backing store could not satisfy the call
    ExecutionError,

    /// Simulated: dry-run mode, operation never invoked
    DryRun,
}

impl CallOutcome {
    /// Whether this outcome counts as a (possibly simulated) success
    /// when deciding the overall request status.
    pub fn is_success(self) -> bool {
        matches!(self, CallOutcome::Success | CallOutcome::DryRun)
    }
}

/// Record of one executed (or simulated, or rejected) planned call.
///
/// Immutable once created; persisted by the audit logger and aggregated
/// into the final response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    /// Operation name
    pub function: String,

    /// Parameters actually used (after chaining from earlier results)
    pub parameters: serde_json::Value,

    /// How the call ended
    pub outcome: CallOutcome,

    /// Payload returned by the operation on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error detail for validation or execution failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the call was simulated
    pub dry_run: bool,

    /// When the call finished
    pub timestamp: DateTime<Utc>,
}

impl CallResult {
    pub fn success(function: &str, parameters: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            function: function.to_string(),
            parameters,
            outcome: CallOutcome::Success,
            result: Some(result),
            error: None,
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    pub fn validation_error(function: &str, parameters: serde_json::Value, error: String) -> Self {
        Self {
            function: function.to_string(),
            parameters,
            outcome: CallOutcome::ValidationError,
            result: None,
            error: Some(error),
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    pub fn execution_error(function: &str, parameters: serde_json::Value, error: String) -> Self {
        Self {
            function: function.to_string(),
            parameters,
            outcome: CallOutcome::ExecutionError,
            result: None,
            error: Some(error),
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    /// Labeled simulated result; the operation was never invoked.
    pub fn dry_run(function: &str, parameters: serde_json::Value) -> Self {
        Self {
            function: function.to_string(),
            parameters,
            outcome: CallOutcome::DryRun,
            result: Some(serde_json::json!({
                "dry_run": true,
                "message": format!("Dry run: {} would be called", function),
            })),
            error: None,
            dry_run: true,
            timestamp: Utc::now(),
        }
    }
}

/// Overall status of a processed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// At least one call succeeded, or the plan was valid with zero calls
    Ok,

    /// Every planned call failed
    Failed,

    /// The intent gate rejected the request; nothing was planned or executed
    Refused,

    /// Planning failed; no operations executed
    Error,
}

/// Aggregated response for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Overall request status
    pub status: RequestStatus,

    /// Original request text
    pub request: String,

    /// Planner's rationale (empty for refused/error responses)
    #[serde(default)]
    pub reasoning: String,

    /// Direct message for plans with no function calls (greetings, help)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Error detail for refused/error responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Ordered per-call outcomes
    pub results: Vec<CallResult>,

    /// Whether the agent was in dry-run mode
    pub dry_run: bool,

    /// When the response was assembled
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// Terminal refusal from the intent gate.
    pub fn refused(request: &str, detail: &str, dry_run: bool) -> Self {
        Self {
            status: RequestStatus::Refused,
            request: request.to_string(),
            reasoning: String::new(),
            message: None,
            error: Some(detail.to_string()),
            results: Vec::new(),
            dry_run,
            timestamp: Utc::now(),
        }
    }

    /// Terminal planning failure. The caller sees a generic message,
    /// never a raw parsing error.
    pub fn planning_failed(request: &str, dry_run: bool) -> Self {
        Self {
            status: RequestStatus::Error,
            request: request.to_string(),
            reasoning: String::new(),
            message: None,
            error: Some(
                "The request could not be processed. Please rephrase and try again.".to_string(),
            ),
            results: Vec::new(),
            dry_run,
            timestamp: Utc::now(),
        }
    }

    /// Assemble the final response from an executed plan.
    pub fn from_results(
        request: &str,
        reasoning: String,
        message: Option<String>,
        results: Vec<CallResult>,
        dry_run: bool,
    ) -> Self {
        // ok if at least one call succeeded or the plan had no calls;
        // failed only when every call failed
        let status = if results.is_empty() || results.iter().any(|r| r.outcome.is_success()) {
            RequestStatus::Ok
        } else {
            RequestStatus::Failed
        };

        Self {
            status,
            request: request.to_string(),
            reasoning,
            message,
            error: None,
            results,
            dry_run,
            timestamp: Utc::now(),
        }
    }
}
