//! Intent screening and per-call parameter validation.
//!
//! Two gates, both pure:
//! - `check_intent` rejects requests whose intent maps to medical advice
//!   (diagnosis, treatment, prescription, medication guidance) before any
//!   planning happens.
//! - `validate_call_params` checks one planned call's parameters against
//!   structural and business rules immediately before execution.
//!
//! Neither function records anything; auditing is the orchestrator's job.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

use super::registry::Operation;

/// Prohibited-intent patterns with their reason categories.
///
/// Matched against normalized (lowercased, whitespace-collapsed) text.
/// Any single match rejects the request.
const PROHIBITED_PATTERNS: &[(&str, &str)] = &[
    ("diagnosis", r"\bdiagnos(e|is|ed)\b"),
    ("treatment", r"\btreat(ment)?\b"),
    ("prescription", r"\bprescri(be|ption)\b"),
    ("medication_guidance", r"\bmedication\b"),
    ("medication_guidance", r"\bdrug\b"),
    ("symptom_interpretation", r"\bwhat (is|are) (my|the) (symptoms?|condition)"),
    ("medication_guidance", r"\bshould i take\b"),
    ("medical_advice", r"\bis it (safe|dangerous)\b"),
    ("medication_guidance", r"\bcan i (take|use)\b"),
];

/// Specialties the scheduling backend recognizes.
pub const VALID_SPECIALTIES: &[&str] = &[
    "cardiology",
    "neurology",
    "orthopedics",
    "pediatrics",
    "dermatology",
    "psychiatry",
    "oncology",
    "general",
    "internal_medicine",
    "surgery",
    "radiology",
    "pathology",
];

/// Request intent matched a prohibited pattern; terminal for the request.
#[derive(Debug, Clone, Error)]
#[error(
    "This agent cannot provide medical advice, diagnosis, or treatment \
     recommendations ({category}). Please consult a licensed healthcare provider."
)]
pub struct IntentViolation {
    /// Reason category shown to the user and recorded in the audit log
    pub category: String,
}

/// A single call's parameters failed structural or business rules.
#[derive(Debug, Clone, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

fn prohibited() -> &'static Vec<(&'static str, Regex)> {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PROHIBITED_PATTERNS
            .iter()
            .map(|(category, pattern)| {
                (*category, Regex::new(pattern).expect("prohibited pattern must compile"))
            })
            .collect()
    })
}

/// Case-fold and collapse whitespace so patterns see one canonical form.
fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Screen a raw request for prohibited medical-advice intent.
///
/// Runs exactly once per request, before planning. Rejection is terminal:
/// no plan is requested and no operation executes.
pub fn check_intent(raw_text: &str) -> Result<(), IntentViolation> {
    let normalized = normalize(raw_text);

    for (category, pattern) in prohibited() {
        if pattern.is_match(&normalized) {
            return Err(IntentViolation {
                category: category.to_string(),
            });
        }
    }

    Ok(())
}

/// Validate the parameters of one planned call.
///
/// An error here short-circuits that call only; later calls in the same
/// plan still attempt execution.
pub fn validate_call_params(
    operation: Operation,
    params: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), ValidationError> {
    match operation {
        Operation::SearchPatient => {
            if let Some(name) = non_empty_str(params, "name") {
                validate_patient_name(name)
            } else if let Some(id) = non_empty_str(params, "patient_id") {
                validate_patient_id(id)
            } else {
                Err(ValidationError::new(
                    "name",
                    "either name or patient_id must be provided",
                ))
            }
        }
        Operation::CheckInsuranceEligibility => {
            let id = non_empty_str(params, "patient_id")
                .ok_or_else(|| ValidationError::new("patient_id", "patient_id is required"))?;
            validate_patient_id(id)
        }
        Operation::FindAvailableSlots => {
            let specialty = non_empty_str(params, "specialty")
                .ok_or_else(|| ValidationError::new("specialty", "specialty is required"))?;
            validate_specialty(specialty)?;

            let start = parse_optional_date(params, "start_date")?;
            let end = parse_optional_date(params, "end_date")?;
            if let (Some(start), Some(end)) = (start, end) {
                validate_date_range(start, end)?;
            }
            Ok(())
        }
        Operation::BookAppointment => {
            let id = non_empty_str(params, "patient_id")
                .ok_or_else(|| ValidationError::new("patient_id", "patient_id is required"))?;
            validate_patient_id(id)?;

            if non_empty_str(params, "slot_id").is_none() {
                return Err(ValidationError::new("slot_id", "slot_id is required for booking"));
            }

            for field in ["reason", "notes"] {
                if let Some(text) = non_empty_str(params, field) {
                    validate_free_text(field, text)?;
                }
            }
            Ok(())
        }
    }
}

fn non_empty_str<'a>(
    params: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn validate_patient_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < 2 {
        return Err(ValidationError::new(
            "name",
            "patient name must be at least 2 characters",
        ));
    }
    if name.chars().count() > 200 {
        return Err(ValidationError::new("name", "patient name exceeds maximum length"));
    }
    validate_free_text("name", name)
}

fn validate_patient_id(patient_id: &str) -> Result<(), ValidationError> {
    static ID_FORMAT: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_FORMAT.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

    if !pattern.is_match(patient_id) {
        return Err(ValidationError::new(
            "patient_id",
            "patient id contains invalid characters",
        ));
    }
    Ok(())
}

fn validate_specialty(specialty: &str) -> Result<(), ValidationError> {
    let lower = specialty.to_lowercase();
    if !VALID_SPECIALTIES.contains(&lower.as_str()) {
        return Err(ValidationError::new(
            "specialty",
            format!(
                "invalid specialty '{}'; must be one of: {}",
                specialty,
                VALID_SPECIALTIES.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Reject markup fragments and control characters in free-text fields.
fn validate_free_text(field: &str, text: &str) -> Result<(), ValidationError> {
    if text.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new(field, "contains control characters"));
    }
    if text.chars().any(|c| matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '\\')) {
        return Err(ValidationError::new(field, "contains invalid characters"));
    }
    Ok(())
}

fn parse_optional_date(
    params: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<NaiveDateTime>, ValidationError> {
    match non_empty_str(params, key) {
        None => Ok(None),
        Some(raw) => parse_flexible_date(raw)
            .map(Some)
            .ok_or_else(|| ValidationError::new(key, format!("invalid date '{}'", raw))),
    }
}

/// Accept plain ISO dates, naive datetimes, and RFC 3339 timestamps.
fn parse_flexible_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn validate_date_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ValidationError> {
    if start >= end {
        return Err(ValidationError::new(
            "start_date",
            "start date must be before end date",
        ));
    }

    let now = Utc::now().naive_utc();
    // 1 hour grace so "today" requests made mid-morning still pass
    if start < now - Duration::hours(1) {
        return Err(ValidationError::new(
            "start_date",
            "cannot schedule appointments in the past",
        ));
    }
    if start > now + Duration::days(365) {
        return Err(ValidationError::new(
            "start_date",
            "cannot schedule appointments more than 1 year in advance",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_intent_allows_workflow_requests() {
        assert!(check_intent("Find patient Ravi Kumar").is_ok());
        assert!(check_intent("Check insurance eligibility for P123456").is_ok());
        assert!(check_intent("Book a cardiology appointment next week").is_ok());
    }

    #[test]
    fn test_intent_rejects_medical_advice() {
        assert!(check_intent("What medication should I take for my headache?").is_err());
        assert!(check_intent("Can you diagnose my chest pain?").is_err());
        assert!(check_intent("What treatment do you recommend?").is_err());
        assert!(check_intent("Should I take aspirin daily?").is_err());
    }

    #[test]
    fn test_intent_normalizes_case_and_whitespace() {
        let violation = check_intent("  DIAGNOSE   my  condition  ").unwrap_err();
        assert_eq!(violation.category, "diagnosis");
    }

    #[test]
    fn test_search_patient_requires_name_or_id() {
        let err = validate_call_params(Operation::SearchPatient, &params(serde_json::json!({})))
            .unwrap_err();
        assert_eq!(err.field, "name");

        assert!(validate_call_params(
            Operation::SearchPatient,
            &params(serde_json::json!({"name": "Ravi Kumar"}))
        )
        .is_ok());

        assert!(validate_call_params(
            Operation::SearchPatient,
            &params(serde_json::json!({"patient_id": "P123456"}))
        )
        .is_ok());
    }

    #[test]
    fn test_patient_name_rejects_markup() {
        let err = validate_call_params(
            Operation::SearchPatient,
            &params(serde_json::json!({"name": "Ravi <script>"})),
        )
        .unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_patient_id_format() {
        let err = validate_call_params(
            Operation::CheckInsuranceEligibility,
            &params(serde_json::json!({"patient_id": "P12 34; drop"})),
        )
        .unwrap_err();
        assert_eq!(err.field, "patient_id");
    }

    #[test]
    fn test_specialty_whitelist() {
        assert!(validate_call_params(
            Operation::FindAvailableSlots,
            &params(serde_json::json!({"specialty": "Cardiology"}))
        )
        .is_ok());

        let err = validate_call_params(
            Operation::FindAvailableSlots,
            &params(serde_json::json!({"specialty": "astrology"})),
        )
        .unwrap_err();
        assert_eq!(err.field, "specialty");
    }

    #[test]
    fn test_date_range_ordering() {
        let start = (Utc::now() + Duration::days(7)).format("%Y-%m-%d").to_string();
        let end = (Utc::now() + Duration::days(14)).format("%Y-%m-%d").to_string();

        assert!(validate_call_params(
            Operation::FindAvailableSlots,
            &params(serde_json::json!({
                "specialty": "cardiology",
                "start_date": start,
                "end_date": end,
            }))
        )
        .is_ok());

        let err = validate_call_params(
            Operation::FindAvailableSlots,
            &params(serde_json::json!({
                "specialty": "cardiology",
                "start_date": end,
                "end_date": start,
            })),
        )
        .unwrap_err();
        assert_eq!(err.field, "start_date");
    }

    #[test]
    fn test_date_range_rejects_far_future() {
        let start = (Utc::now() + Duration::days(400)).format("%Y-%m-%d").to_string();
        let end = (Utc::now() + Duration::days(407)).format("%Y-%m-%d").to_string();

        let err = validate_call_params(
            Operation::FindAvailableSlots,
            &params(serde_json::json!({
                "specialty": "cardiology",
                "start_date": start,
                "end_date": end,
            })),
        )
        .unwrap_err();
        assert!(err.reason.contains("1 year"));
    }

    #[test]
    fn test_booking_requires_slot_id() {
        let err = validate_call_params(
            Operation::BookAppointment,
            &params(serde_json::json!({"patient_id": "P123456"})),
        )
        .unwrap_err();
        assert_eq!(err.field, "slot_id");
    }

    #[test]
    fn test_booking_free_text_rejects_control_chars() {
        let err = validate_call_params(
            Operation::BookAppointment,
            &params(serde_json::json!({
                "patient_id": "P123456",
                "slot_id": "SLOT-20260901-09-DR001",
                "reason": "follow-up\u{0000}",
            })),
        )
        .unwrap_err();
        assert_eq!(err.field, "reason");
    }
}
