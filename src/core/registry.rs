//! The closed set of administrative operations.
//!
//! The domain is fixed, so the registry is a tagged enum rather than an
//! open plugin table: dispatch, prompt-schema generation, and side-effect
//! classification are all exhaustive matches. Descriptor order follows
//! `Operation::ALL` and never changes, so planning prompts are
//! reproducible for identical inputs.

use serde::Serialize;

use crate::records::{OperationError, RecordStore};

/// One of the four administrative operations the agent may plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SearchPatient,
    CheckInsuranceEligibility,
    FindAvailableSlots,
    BookAppointment,
}

/// Declarative description of one operation, used to build the planning
/// prompt. The parameter schema follows the OpenAI function-calling shape.
#[derive(Debug, Clone, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

impl Operation {
    /// All operations in registration order.
    pub const ALL: [Operation; 4] = [
        Operation::SearchPatient,
        Operation::CheckInsuranceEligibility,
        Operation::FindAvailableSlots,
        Operation::BookAppointment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::SearchPatient => "search_patient",
            Operation::CheckInsuranceEligibility => "check_insurance_eligibility",
            Operation::FindAvailableSlots => "find_available_slots",
            Operation::BookAppointment => "book_appointment",
        }
    }

    /// Resolve a planner-supplied name. Unknown names are rejected at
    /// planning time, never silently substituted.
    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Whether the operation writes to the backing store. Mutating
    /// operations are never invoked in dry-run mode.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Operation::BookAppointment)
    }

    pub fn descriptor(&self) -> OperationDescriptor {
        match self {
            Operation::SearchPatient => OperationDescriptor {
                name: self.name(),
                description: "Search for a patient by name or patient ID. Use this to find \
                              patient records before booking appointments or checking eligibility.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Patient name (supports partial matching, case-insensitive)"
                        },
                        "patient_id": {
                            "type": "string",
                            "description": "Exact patient ID (e.g., P123456)"
                        }
                    },
                    "oneOf": [
                        {"required": ["name"]},
                        {"required": ["patient_id"]}
                    ]
                }),
            },
            Operation::CheckInsuranceEligibility => OperationDescriptor {
                name: self.name(),
                description: "Check insurance eligibility and coverage details for a patient. \
                              Returns insurance status, payer information, and copay amount.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "patient_id": {
                            "type": "string",
                            "description": "Patient identifier (required)"
                        }
                    },
                    "required": ["patient_id"]
                }),
            },
            Operation::FindAvailableSlots => OperationDescriptor {
                name: self.name(),
                description: "Find available appointment time slots for a specific medical \
                              specialty. Returns a list of available slots with provider and \
                              location details.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "specialty": {
                            "type": "string",
                            "description": "Medical specialty (e.g., cardiology, neurology, orthopedics, general)"
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Start date for search (ISO format: YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)"
                        },
                        "end_date": {
                            "type": "string",
                            "description": "End date for search (ISO format)"
                        },
                        "provider_id": {
                            "type": "string",
                            "description": "Specific provider ID (optional)"
                        }
                    },
                    "required": ["specialty"]
                }),
            },
            Operation::BookAppointment => OperationDescriptor {
                name: self.name(),
                description: "Book an appointment for a patient in a specific time slot. This \
                              creates a confirmed appointment in the system.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "patient_id": {
                            "type": "string",
                            "description": "Patient identifier"
                        },
                        "slot_id": {
                            "type": "string",
                            "description": "Selected appointment slot ID from find_available_slots"
                        },
                        "reason": {
                            "type": "string",
                            "description": "Reason for the visit"
                        },
                        "notes": {
                            "type": "string",
                            "description": "Additional notes or special requirements"
                        }
                    },
                    "required": ["patient_id", "slot_id"]
                }),
            },
        }
    }

    /// Execute the operation against the backing store.
    ///
    /// Parameters have already passed validation; failures here are
    /// legitimate backing-store conditions only.
    pub fn invoke(
        &self,
        store: &mut RecordStore,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, OperationError> {
        let get = |key: &str| {
            params
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        match self {
            Operation::SearchPatient => store.search_patient(get("name"), get("patient_id")),
            Operation::CheckInsuranceEligibility => {
                store.check_insurance(get("patient_id").unwrap_or_default())
            }
            Operation::FindAvailableSlots => store.find_slots(
                get("specialty").unwrap_or_default(),
                get("start_date"),
                get("end_date"),
                get("provider_id"),
            ),
            Operation::BookAppointment => store.book_appointment(
                get("patient_id").unwrap_or_default(),
                get("slot_id").unwrap_or_default(),
                get("reason"),
                get("notes"),
            ),
        }
    }
}

/// Descriptors for every operation, in stable registration order.
pub fn describe_all() -> Vec<OperationDescriptor> {
    Operation::ALL.iter().map(Operation::descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_order_is_stable() {
        let first: Vec<_> = describe_all().iter().map(|d| d.name).collect();
        let second: Vec<_> = describe_all().iter().map(|d| d.name).collect();

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "search_patient",
                "check_insurance_eligibility",
                "find_available_slots",
                "book_appointment",
            ]
        );
    }

    #[test]
    fn test_name_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("prescribe_medication"), None);
    }

    #[test]
    fn test_only_booking_mutates() {
        assert!(Operation::BookAppointment.is_mutating());
        assert!(!Operation::SearchPatient.is_mutating());
        assert!(!Operation::CheckInsuranceEligibility.is_mutating());
        assert!(!Operation::FindAvailableSlots.is_mutating());
    }

    #[test]
    fn test_invoke_dispatches_to_store() {
        let mut store = RecordStore::new();
        let params = serde_json::json!({"name": "Priya"});

        let result = Operation::SearchPatient
            .invoke(&mut store, params.as_object().unwrap())
            .unwrap();
        assert_eq!(result["patients"][0]["id"], "P789012");
    }
}
