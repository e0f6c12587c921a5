//! Audit event types for the append-only session log.
//!
//! Every action or decision the agent takes is recorded as one immutable
//! event. Events are never rewritten; the log is the compliance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::response::CallOutcome;

/// A single event in the append-only audit log.
///
/// One JSON line per event. Fields that do not apply to an event type are
/// omitted from the serialized record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Session this event belongs to
    pub session_id: String,

    /// Raw user request (user_input)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Operation name (function_call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Parameters passed to the operation (function_call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,

    /// Outcome of the call (function_call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CallOutcome>,

    /// Operation payload on success (function_call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error detail if the call or planning failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the call was simulated (function_call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    /// Serialized agent response (agent_response)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Rejection reason category (safety_violation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Session counter snapshot (session_end)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

impl AuditEvent {
    fn base(event_type: EventType, session_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            session_id: session_id.to_string(),
            input: None,
            function_name: None,
            parameters: None,
            outcome: None,
            result: None,
            error: None,
            dry_run: None,
            response: None,
            reason: None,
            summary: None,
        }
    }

    /// Session opened; first record in every log file.
    pub fn session_start(session_id: &str) -> Self {
        Self::base(EventType::SessionStart, session_id)
    }

    /// Raw user request, recorded before any validation runs.
    pub fn user_input(session_id: &str, input: &str) -> Self {
        let mut event = Self::base(EventType::UserInput, session_id);
        event.input = Some(input.to_string());
        event
    }

    /// One planned call's execution record, whatever its outcome.
    pub fn function_call(
        session_id: &str,
        function_name: &str,
        parameters: serde_json::Value,
        outcome: CallOutcome,
        dry_run: bool,
    ) -> Self {
        let mut event = Self::base(EventType::FunctionCall, session_id);
        event.function_name = Some(function_name.to_string());
        event.parameters = Some(parameters);
        event.outcome = Some(outcome);
        event.dry_run = Some(dry_run);
        event
    }

    /// Final agent response for a request.
    pub fn agent_response(session_id: &str, response: &str) -> Self {
        let mut event = Self::base(EventType::AgentResponse, session_id);
        event.response = Some(response.to_string());
        event
    }

    /// Request rejected by the intent gate.
    pub fn safety_violation(session_id: &str, reason: &str, detail: &str) -> Self {
        let mut event = Self::base(EventType::SafetyViolation, session_id);
        event.reason = Some(reason.to_string());
        event.error = Some(detail.to_string());
        event
    }

    /// Session closed; carries the final counter snapshot.
    pub fn session_end(session_id: &str, summary: serde_json::Value) -> Self {
        let mut event = Self::base(EventType::SessionEnd, session_id);
        event.summary = Some(summary);
        event
    }

    /// Attach a success payload.
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Attach an error detail.
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of events recorded during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new session has opened
    SessionStart,

    /// A raw user request was received
    UserInput,

    /// One planned operation was validated and executed (or simulated)
    FunctionCall,

    /// The agent produced its final response for a request
    AgentResponse,

    /// A request was rejected by the intent gate
    SafetyViolation,

    /// The session closed and its summary was flushed
    SessionEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_round_trip() {
        let event = AuditEvent::function_call(
            "20260826_101500",
            "search_patient",
            serde_json::json!({"name": "Ravi Kumar"}),
            CallOutcome::Success,
            false,
        )
        .with_result(serde_json::json!({"count": 1}));

        let json = serde_json::to_string(&event).unwrap();
        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_type, EventType::FunctionCall);
        assert_eq!(parsed.session_id, "20260826_101500");
        assert_eq!(parsed.function_name.as_deref(), Some("search_patient"));
        assert_eq!(parsed.outcome, Some(CallOutcome::Success));
        assert_eq!(parsed.dry_run, Some(false));
    }

    #[test]
    fn test_unused_fields_are_omitted() {
        let event = AuditEvent::user_input("s1", "Find patient Ravi Kumar");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"event_type\":\"user_input\""));
        assert!(json.contains("Find patient Ravi Kumar"));
        assert!(!json.contains("function_name"));
        assert!(!json.contains("dry_run"));
    }

    #[test]
    fn test_safety_violation_carries_reason() {
        let event = AuditEvent::safety_violation(
            "s1",
            "PROHIBITED_INTENT",
            "request matched a medical-advice pattern",
        );

        assert_eq!(event.event_type, EventType::SafetyViolation);
        assert_eq!(event.reason.as_deref(), Some("PROHIBITED_INTENT"));
        assert!(event.error.is_some());
    }
}
