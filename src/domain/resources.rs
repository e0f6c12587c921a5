//! FHIR-flavored healthcare resources.
//!
//! These are the payloads the backing store returns. Field names serialize
//! in camelCase to match the upstream wire shapes. The orchestrator treats
//! them as opaque validated payloads; construction happens only inside the
//! record store, so every resource leaving that boundary has its required
//! fields populated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// FHIR-compliant administrative gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

/// Insurance eligibility status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceStatus {
    Active,
    Inactive,
    Pending,
    Expired,
}

/// Appointment status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Proposed,
    Pending,
    Booked,
    Arrived,
    Fulfilled,
    Cancelled,
    Noshow,
}

/// Patient demographic record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Insurance coverage record for one patient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceCoverage {
    pub id: String,
    pub patient_id: String,
    pub subscriber_id: String,
    /// Insurance company name
    pub payer: String,
    pub plan_name: String,
    pub status: InsuranceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copay_amount: Option<f64>,
}

/// Available appointment time slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlot {
    pub slot_id: String,
    pub specialty: String,
    pub provider_id: String,
    pub provider_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub available: bool,
}

/// Booked appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub status: AppointmentStatus,
    pub patient_id: String,
    pub patient_name: String,
    pub provider_id: String,
    pub provider_name: String,
    pub specialty: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_serializes_camel_case() {
        let patient = Patient {
            id: "P123456".to_string(),
            name: "Ravi Kumar".to_string(),
            given_name: Some("Ravi".to_string()),
            family_name: Some("Kumar".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 15),
            gender: Some(Gender::Male),
            phone: Some("+91-9876543210".to_string()),
            email: None,
        };

        let json = serde_json::to_string(&patient).unwrap();
        assert!(json.contains("\"givenName\":\"Ravi\""));
        assert!(json.contains("\"familyName\":\"Kumar\""));
        assert!(json.contains("\"birthDate\":\"1985-03-15\""));
        assert!(json.contains("\"gender\":\"male\""));
        assert!(!json.contains("email"));
    }

    #[test]
    fn test_insurance_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&InsuranceStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&InsuranceStatus::Expired).unwrap(),
            "\"expired\""
        );
    }

    #[test]
    fn test_slot_round_trip() {
        let slot = AppointmentSlot {
            slot_id: "SLOT-20260901-09-DR001".to_string(),
            specialty: "cardiology".to_string(),
            provider_id: "DR001".to_string(),
            provider_name: "Dr. Sarah Johnson".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            location: "Clinic Building A, Room 205".to_string(),
            available: true,
        };

        let json = serde_json::to_string(&slot).unwrap();
        assert!(json.contains("\"slotId\""));
        assert!(json.contains("\"providerId\""));

        let parsed: AppointmentSlot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.slot_id, slot.slot_id);
    }
}
