//! Audit log completeness and session accounting through the agent.

use clinflow::adapters::ScriptedGenerator;
use clinflow::core::WorkflowAgent;
use clinflow::domain::{CallOutcome, EventType};
use tempfile::TempDir;

async fn agent_with(responses: Vec<String>, dir: &TempDir, dry_run: bool) -> WorkflowAgent {
    WorkflowAgent::new(
        Box::new(ScriptedGenerator::new(responses)),
        dir.path(),
        dry_run,
    )
    .await
    .unwrap()
}

fn plan(calls: serde_json::Value) -> String {
    serde_json::json!({
        "reasoning": "scripted",
        "function_calls": calls,
    })
    .to_string()
}

#[tokio::test]
async fn test_one_function_call_event_per_planned_call() {
    let temp = TempDir::new().unwrap();
    let scripted = plan(serde_json::json!([
        {"name": "search_patient", "parameters": {"name": "Ravi Kumar"}},
        {"name": "check_insurance_eligibility", "parameters": {"patient_id": "P123456"}},
        {"name": "search_patient", "parameters": {"patient_id": "P999999"}},
    ]));
    let mut agent = agent_with(vec![scripted], &temp, false).await;

    agent.process("look up Ravi and check coverage").await;

    let events = agent.audit_events().await.unwrap();
    let count = |t: EventType| events.iter().filter(|e| e.event_type == t).count();

    assert_eq!(count(EventType::SessionStart), 1);
    assert_eq!(count(EventType::UserInput), 1);
    assert_eq!(count(EventType::FunctionCall), 3);
    assert_eq!(count(EventType::AgentResponse), 1);

    // failed calls are audited with their error, same as successes
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.outcome == Some(CallOutcome::ExecutionError))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.is_some());
}

#[tokio::test]
async fn test_function_call_event_preserves_parameters() {
    let temp = TempDir::new().unwrap();
    let scripted = plan(serde_json::json!([
        {"name": "search_patient", "parameters": {"name": "Priya Sharma"}},
    ]));
    let mut agent = agent_with(vec![scripted], &temp, false).await;

    agent.process("find Priya").await;

    let events = agent.audit_events().await.unwrap();
    let call = events
        .iter()
        .find(|e| e.event_type == EventType::FunctionCall)
        .unwrap();

    assert_eq!(call.function_name.as_deref(), Some("search_patient"));
    assert_eq!(call.parameters.as_ref().unwrap()["name"], "Priya Sharma");
    assert_eq!(call.outcome, Some(CallOutcome::Success));
    assert_eq!(call.dry_run, Some(false));
    assert!(call.result.is_some());
}

#[tokio::test]
async fn test_session_counters_track_outcomes() {
    let temp = TempDir::new().unwrap();
    let scripted = plan(serde_json::json!([
        {"name": "search_patient", "parameters": {"name": "Ravi Kumar"}},
        {"name": "search_patient", "parameters": {}},
        {"name": "search_patient", "parameters": {"patient_id": "P999999"}},
    ]));
    let mut agent = agent_with(vec![scripted], &temp, false).await;

    agent.process("look up some patients").await;

    let summary = agent.summary();
    assert_eq!(summary.total_calls, 3);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.dry_run_count, 0);

    // idempotent: a second read returns identical counters
    assert_eq!(agent.summary(), summary);
}

#[tokio::test]
async fn test_close_writes_session_end_with_summary() {
    let temp = TempDir::new().unwrap();
    let scripted = plan(serde_json::json!([
        {"name": "search_patient", "parameters": {"name": "Ravi Kumar"}},
    ]));
    let mut agent = agent_with(vec![scripted], &temp, false).await;

    agent.process("find Ravi").await;
    agent.close().await;

    let events = agent.audit_events().await.unwrap();
    let last = events.last().unwrap();

    assert_eq!(last.event_type, EventType::SessionEnd);
    let summary = last.summary.as_ref().unwrap();
    assert_eq!(summary["total_calls"], 1);
    assert_eq!(summary["successful"], 1);
}

#[tokio::test]
async fn test_all_events_share_the_session_id() {
    let temp = TempDir::new().unwrap();
    let scripted = plan(serde_json::json!([
        {"name": "search_patient", "parameters": {"name": "Ravi Kumar"}},
    ]));
    let mut agent = agent_with(vec![scripted], &temp, false).await;
    let session = agent.session_id().to_string();

    agent.process("find Ravi").await;
    agent.close().await;

    let events = agent.audit_events().await.unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.session_id == session));
}
