//! Request orchestration: intent gate, planning, per-call execution.
//!
//! One agent owns one session: a record store, an audit logger, and a
//! text-generation backend. `process` runs the full pipeline for a single
//! request. Call failures are isolated to the failing call; only an intent
//! violation or a planning failure is terminal for the whole request.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::adapters::TextGenerator;
use crate::core::audit::{AuditLogger, SessionSummary};
use crate::core::planner::{self, PlannedCall};
use crate::core::registry::Operation;
use crate::core::safety;
use crate::domain::{AgentResponse, AuditEvent, CallResult};
use crate::records::RecordStore;

/// Planner placeholder meaning "use the first slot found earlier in this
/// plan".
const AUTO_SELECT_FIRST: &str = "AUTO-SELECT-FIRST";

/// Values produced by earlier calls in the same plan, available for
/// substitution into later calls. Reset on every request.
#[derive(Default)]
struct ChainContext {
    patient_id: Option<String>,
    slot_id: Option<String>,
}

impl ChainContext {
    fn absorb(&mut self, operation: Operation, result: &serde_json::Value) {
        match operation {
            Operation::SearchPatient => {
                let id = result["patient"]["id"]
                    .as_str()
                    .or_else(|| result["patients"][0]["id"].as_str());
                if let Some(id) = id {
                    self.patient_id = Some(id.to_string());
                }
            }
            Operation::FindAvailableSlots => {
                if let Some(id) = result["slots"][0]["slotId"].as_str() {
                    self.slot_id = Some(id.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Clinical workflow agent for one session.
pub struct WorkflowAgent {
    store: RecordStore,
    logger: AuditLogger,
    generator: Box<dyn TextGenerator>,
    dry_run: bool,
}

impl WorkflowAgent {
    /// Open a new session. The audit log lives under `log_dir`.
    pub async fn new(
        generator: Box<dyn TextGenerator>,
        log_dir: &Path,
        dry_run: bool,
    ) -> Result<Self> {
        let logger = AuditLogger::open(log_dir).await?;
        info!(
            session = %logger.session_id(),
            backend = generator.name(),
            dry_run,
            "Session opened"
        );

        Ok(Self {
            store: RecordStore::new(),
            logger,
            generator,
            dry_run,
        })
    }

    pub fn session_id(&self) -> &str {
        self.logger.session_id()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Toggle dry-run between requests; never mid-request.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn summary(&self) -> SessionSummary {
        self.logger.summary()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Process one request through the full pipeline.
    pub async fn process(&mut self, request: &str) -> AgentResponse {
        let session = self.logger.session_id().to_string();
        self.logger
            .record(AuditEvent::user_input(&session, request))
            .await;

        // intent gate runs before any planning; rejection is terminal
        if let Err(violation) = safety::check_intent(request) {
            warn!(category = %violation.category, "Request refused by intent gate");
            let detail = violation.to_string();
            self.logger
                .record(AuditEvent::safety_violation(
                    &session,
                    &violation.category,
                    &detail,
                ))
                .await;

            // the safety_violation record is the only audit entry a
            // refusal produces
            return AgentResponse::refused(request, &detail, self.dry_run);
        }

        let plan = match planner::plan_request(self.generator.as_ref(), request).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Planning failed");
                let response = AgentResponse::planning_failed(request, self.dry_run);
                self.record_response(&session, &response).await;
                return response;
            }
        };

        debug!(calls = plan.calls.len(), reasoning = %plan.reasoning, "Plan accepted");

        let mut chain = ChainContext::default();
        let mut results = Vec::with_capacity(plan.calls.len());
        for call in &plan.calls {
            let result = self.execute_call(&session, call, &mut chain).await;
            results.push(result);
        }

        let response =
            AgentResponse::from_results(request, plan.reasoning, plan.message, results, self.dry_run);
        self.record_response(&session, &response).await;
        response
    }

    /// Run one planned call: chain substitution, validation, then
    /// execution or simulation. Failures never escape this method.
    async fn execute_call(
        &mut self,
        session: &str,
        call: &PlannedCall,
        chain: &mut ChainContext,
    ) -> CallResult {
        let operation = call.operation;
        let name = operation.name();
        let params = resolve_chained(operation, call.parameters.clone(), chain);
        let params_value = serde_json::Value::Object(params.clone());

        if let Err(e) = safety::validate_call_params(operation, &params) {
            let result = CallResult::validation_error(name, params_value.clone(), e.to_string());
            self.record_call(session, &result).await;
            return result;
        }

        // dry-run synthesizes every call, mutating or not; the store is
        // never touched
        if self.dry_run {
            let result = CallResult::dry_run(name, params_value);
            self.record_call(session, &result).await;
            return result;
        }

        let result = match operation.invoke(&mut self.store, &params) {
            Ok(payload) => {
                chain.absorb(operation, &payload);
                CallResult::success(name, params_value, payload)
            }
            Err(e) => CallResult::execution_error(name, params_value, e.to_string()),
        };
        self.record_call(session, &result).await;
        result
    }

    async fn record_call(&mut self, session: &str, result: &CallResult) {
        let mut event = AuditEvent::function_call(
            session,
            &result.function,
            result.parameters.clone(),
            result.outcome,
            result.dry_run,
        );
        if let Some(payload) = &result.result {
            event = event.with_result(payload.clone());
        }
        if let Some(error) = &result.error {
            event = event.with_error(error.clone());
        }

        self.logger.record(event).await;
        self.logger.count_outcome(result.outcome);
    }

    async fn record_response(&mut self, session: &str, response: &AgentResponse) {
        let serialized =
            serde_json::to_string(response).unwrap_or_else(|_| "unserializable response".into());
        self.logger
            .record(AuditEvent::agent_response(session, &serialized))
            .await;
    }

    /// Flush the session summary and close the audit log.
    pub async fn close(&mut self) {
        info!(session = %self.logger.session_id(), "Session closed");
        self.logger.close().await;
    }

    /// Read back this session's audit log in order.
    pub async fn audit_events(&self) -> Result<Vec<AuditEvent>> {
        self.logger.replay().await
    }
}

/// Substitute values produced earlier in the plan into a later call's
/// parameters. Applies to explicit placeholders and to required ids the
/// planner left out.
fn resolve_chained(
    operation: Operation,
    mut params: serde_json::Map<String, serde_json::Value>,
    chain: &ChainContext,
) -> serde_json::Map<String, serde_json::Value> {
    let needs_substitution = |params: &serde_json::Map<String, serde_json::Value>, key: &str| {
        match params.get(key).and_then(|v| v.as_str()) {
            None => true,
            Some(value) => value.trim().is_empty() || value == AUTO_SELECT_FIRST,
        }
    };

    match operation {
        Operation::BookAppointment => {
            if needs_substitution(&params, "slot_id") {
                if let Some(slot_id) = &chain.slot_id {
                    params.insert("slot_id".into(), slot_id.clone().into());
                }
            }
            if needs_substitution(&params, "patient_id") {
                if let Some(patient_id) = &chain.patient_id {
                    params.insert("patient_id".into(), patient_id.clone().into());
                }
            }
        }
        Operation::CheckInsuranceEligibility => {
            if needs_substitution(&params, "patient_id") {
                if let Some(patient_id) = &chain.patient_id {
                    params.insert("patient_id".into(), patient_id.clone().into());
                }
            }
        }
        _ => {}
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_chain_absorbs_search_and_slots() {
        let mut chain = ChainContext::default();

        chain.absorb(
            Operation::SearchPatient,
            &serde_json::json!({"patients": [{"id": "P789012"}], "count": 1}),
        );
        assert_eq!(chain.patient_id.as_deref(), Some("P789012"));

        chain.absorb(
            Operation::SearchPatient,
            &serde_json::json!({"patient": {"id": "P123456"}}),
        );
        assert_eq!(chain.patient_id.as_deref(), Some("P123456"));

        chain.absorb(
            Operation::FindAvailableSlots,
            &serde_json::json!({"slots": [{"slotId": "SLOT-20260907-09-DR001"}]}),
        );
        assert_eq!(chain.slot_id.as_deref(), Some("SLOT-20260907-09-DR001"));
    }

    #[test]
    fn test_resolve_placeholder_slot_id() {
        let chain = ChainContext {
            patient_id: Some("P123456".into()),
            slot_id: Some("SLOT-20260907-09-DR001".into()),
        };

        let params = resolve_chained(
            Operation::BookAppointment,
            obj(serde_json::json!({"patient_id": "P123456", "slot_id": "AUTO-SELECT-FIRST"})),
            &chain,
        );
        assert_eq!(params["slot_id"], "SLOT-20260907-09-DR001");
    }

    #[test]
    fn test_resolve_missing_patient_id() {
        let chain = ChainContext {
            patient_id: Some("P789012".into()),
            slot_id: None,
        };

        let params = resolve_chained(
            Operation::CheckInsuranceEligibility,
            obj(serde_json::json!({})),
            &chain,
        );
        assert_eq!(params["patient_id"], "P789012");
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let chain = ChainContext {
            patient_id: Some("P789012".into()),
            slot_id: Some("SLOT-20260907-09-DR001".into()),
        };

        let params = resolve_chained(
            Operation::BookAppointment,
            obj(serde_json::json!({
                "patient_id": "P111111",
                "slot_id": "SLOT-20260908-11-DR002",
            })),
            &chain,
        );
        assert_eq!(params["patient_id"], "P111111");
        assert_eq!(params["slot_id"], "SLOT-20260908-11-DR002");
    }

    #[test]
    fn test_resolve_without_chain_leaves_params() {
        let chain = ChainContext::default();
        let params = resolve_chained(
            Operation::BookAppointment,
            obj(serde_json::json!({"patient_id": "P123456", "slot_id": "AUTO-SELECT-FIRST"})),
            &chain,
        );
        // nothing to substitute; the store rejects the placeholder at execution
        assert_eq!(params["slot_id"], "AUTO-SELECT-FIRST");
    }
}
