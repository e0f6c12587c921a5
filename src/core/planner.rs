//! Turns a free-text request into a structured call plan.
//!
//! The planner builds a single prompt from the operation descriptors,
//! makes exactly one generation call, and parses the reply strictly. A
//! backend failure or a malformed plan is terminal for the request; there
//! is no retry and no fallback plan. Nothing the planner emits is trusted:
//! every call it proposes is re-validated before execution.

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::TextGenerator;
use crate::core::registry::{self, Operation};

/// Why a request could not be turned into a plan.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Planning backend failed: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("Planner reply is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Planner reply is missing required structure: {0}")]
    MissingShape(String),

    #[error("Planner proposed unknown operation: {0}")]
    UnknownOperation(String),
}

/// One proposed call, not yet validated.
#[derive(Debug, Clone)]
pub struct PlannedCall {
    pub operation: Operation,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// A parsed plan. `calls` may be empty for message-only replies.
#[derive(Debug, Clone)]
pub struct Plan {
    pub reasoning: String,
    pub message: Option<String>,
    pub calls: Vec<PlannedCall>,
}

/// Wire shape the planner is instructed to reply in.
#[derive(Debug, Deserialize)]
struct RawPlan {
    reasoning: Option<String>,
    message: Option<String>,
    #[serde(default)]
    function_calls: Vec<RawCall>,
}

#[derive(Debug, Deserialize)]
struct RawCall {
    name: Option<String>,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
}

/// Build the planning prompt for one request.
///
/// Descriptor order is stable, so identical requests produce identical
/// prompts.
pub fn build_prompt(request: &str) -> String {
    let descriptors = registry::describe_all();
    let schemas = serde_json::to_string_pretty(&descriptors)
        .unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are a clinical workflow assistant that handles ADMINISTRATIVE tasks only.\n\
         \n\
         STRICT SAFETY RULES:\n\
         - You must NEVER provide medical advice, diagnosis, or treatment recommendations.\n\
         - You must NEVER interpret symptoms or suggest medications.\n\
         - You only perform administrative tasks: patient lookup, insurance eligibility,\n\
           slot search, and appointment booking.\n\
         \n\
         AVAILABLE FUNCTIONS:\n\
         {schemas}\n\
         \n\
         Analyze the user request and respond with ONLY a JSON object in this exact shape:\n\
         {{\n\
           \"reasoning\": \"brief explanation of your plan\",\n\
           \"function_calls\": [\n\
             {{\"name\": \"function_name\", \"parameters\": {{...}}}}\n\
           ],\n\
           \"message\": \"optional message to the user when no function call is needed\"\n\
         }}\n\
         \n\
         Chain functions when needed. If a later call needs a value produced by an\n\
         earlier one (such as a slot id), use the placeholder \"AUTO-SELECT-FIRST\".\n\
         \n\
         USER REQUEST: {request}\n"
    )
}

/// Strip a Markdown code fence if the reply is wrapped in one.
fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse a planner reply into a `Plan`, strictly.
pub fn parse_plan(reply: &str) -> Result<Plan, PlanningError> {
    let raw: RawPlan =
        serde_json::from_str(strip_fences(reply)).map_err(PlanningError::MalformedJson)?;

    let reasoning = raw
        .reasoning
        .ok_or_else(|| PlanningError::MissingShape("reasoning".to_string()))?;

    let mut calls = Vec::with_capacity(raw.function_calls.len());
    for call in raw.function_calls {
        let name = call
            .name
            .ok_or_else(|| PlanningError::MissingShape("function_calls[].name".to_string()))?;
        let operation = Operation::from_name(&name)
            .ok_or_else(|| PlanningError::UnknownOperation(name.clone()))?;
        calls.push(PlannedCall {
            operation,
            parameters: call.parameters,
        });
    }

    Ok(Plan {
        reasoning,
        message: raw.message,
        calls,
    })
}

/// Make exactly one generation call and parse the result.
pub async fn plan_request(
    generator: &dyn TextGenerator,
    request: &str,
) -> Result<Plan, PlanningError> {
    let prompt = build_prompt(request);
    let reply = generator
        .generate(&prompt)
        .await
        .map_err(PlanningError::Backend)?;
    parse_plan(&reply)
}
