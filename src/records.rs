//! Mock backing store for the administrative operations.
//!
//! In production this would sit in front of an EHR, an eligibility
//! clearinghouse, and a scheduling platform. Here it owns a seeded patient
//! roster, coverage records, deterministic slot generation, and an
//! in-memory appointment book. No component outside the operation registry
//! touches this store.
//!
//! The store fails only on legitimate backing conditions (patient not
//! found, no matches, unusable slot reference); malformed input is the
//! validator's job and never reaches this boundary.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

use crate::domain::{
    Appointment, AppointmentSlot, AppointmentStatus, Gender, InsuranceCoverage, InsuranceStatus,
    Patient,
};

/// The backing store could not satisfy a structurally valid request.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    #[error("patient {patient_id} not found")]
    PatientNotFound { patient_id: String },

    #[error("no patients found matching '{name}'")]
    NoMatches { name: String },

    #[error("invalid date '{value}'")]
    InvalidDate { value: String },

    #[error("slot '{slot_id}' is not a usable slot reference")]
    InvalidSlot { slot_id: String },
}

/// Slot hours offered each weekday (morning and afternoon).
const SLOT_HOURS: [u32; 4] = [9, 11, 14, 16];

/// Appointment slot length.
const SLOT_MINUTES: i64 = 30;

struct Provider {
    id: &'static str,
    name: &'static str,
    specialty: &'static str,
}

const PROVIDERS: &[Provider] = &[
    Provider { id: "DR001", name: "Dr. Sarah Johnson", specialty: "cardiology" },
    Provider { id: "DR002", name: "Dr. Michael Chen", specialty: "cardiology" },
    Provider { id: "DR003", name: "Dr. Emily Williams", specialty: "neurology" },
    Provider { id: "DR004", name: "Dr. David Brown", specialty: "neurology" },
    Provider { id: "DR005", name: "Dr. James Miller", specialty: "orthopedics" },
    Provider { id: "DR006", name: "Dr. Lisa Anderson", specialty: "orthopedics" },
    Provider { id: "DR007", name: "Dr. Robert Taylor", specialty: "general" },
    Provider { id: "DR008", name: "Dr. Jennifer White", specialty: "general" },
];

fn providers_for(specialty: &str) -> Vec<&'static Provider> {
    let matched: Vec<_> = PROVIDERS.iter().filter(|p| p.specialty == specialty).collect();
    if matched.is_empty() {
        // Specialties without a dedicated roster fall back to general practice
        PROVIDERS.iter().filter(|p| p.specialty == "general").collect()
    } else {
        matched
    }
}

fn provider_by_id(provider_id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.id == provider_id)
}

/// In-memory backing store with seeded demo records.
pub struct RecordStore {
    patients: HashMap<String, Patient>,
    coverages: HashMap<String, InsuranceCoverage>,
    appointments: HashMap<String, Appointment>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        let mut store = Self {
            patients: HashMap::new(),
            coverages: HashMap::new(),
            appointments: HashMap::new(),
        };
        store.seed();
        store
    }

    fn seed(&mut self) {
        let roster: &[(&str, &str, &str, &str, &str, Gender, &str)] = &[
            ("P123456", "Ravi Kumar", "Ravi", "Kumar", "1985-03-15", Gender::Male, "+91-9876543210"),
            ("P789012", "Priya Sharma", "Priya", "Sharma", "1990-07-22", Gender::Female, "+91-9988776655"),
            ("P345678", "Amit Patel", "Amit", "Patel", "1978-11-03", Gender::Male, "+91-9123456789"),
            ("P111111", "Sundaram Iyer", "Sundaram", "Iyer", "1992-05-18", Gender::Male, "+91-9876543211"),
            ("P222222", "Lakshmi Menon", "Lakshmi", "Menon", "1987-09-25", Gender::Female, "+91-9876543212"),
            ("P333333", "Meera Devi", "Meera", "Devi", "1995-12-08", Gender::Female, "+91-9876543213"),
            ("P777777", "Anitha Krishnan", "Anitha", "Krishnan", "1993-06-11", Gender::Female, "+91-9876543217"),
            ("P606060", "Saranya Mohan", "Saranya", "Mohan", "1992-12-07", Gender::Female, "+91-9876543225"),
        ];

        for (id, name, given, family, birth, gender, phone) in roster {
            let email = format!(
                "{}.{}@example.com",
                given.to_lowercase(),
                family.to_lowercase()
            );
            self.patients.insert(
                id.to_string(),
                Patient {
                    id: id.to_string(),
                    name: name.to_string(),
                    given_name: Some(given.to_string()),
                    family_name: Some(family.to_string()),
                    birth_date: NaiveDate::parse_from_str(birth, "%Y-%m-%d").ok(),
                    gender: Some(*gender),
                    phone: Some(phone.to_string()),
                    email: Some(email),
                },
            );
        }

        let coverages: &[(&str, &str, &str, &str, InsuranceStatus, i32, f64)] = &[
            ("INS-001", "P123456", "National Health Insurance", "Premium Care Plan", InsuranceStatus::Active, 2026, 500.0),
            ("INS-002", "P789012", "Star Health Insurance", "Family Health Shield", InsuranceStatus::Active, 2026, 1000.0),
            ("INS-003", "P345678", "ICICI Lombard", "Complete Health Insurance", InsuranceStatus::Expired, 2025, 750.0),
            ("INS-004", "P111111", "Blue Cross Blue Shield", "Gold Plan", InsuranceStatus::Active, 2026, 250.0),
            ("INS-005", "P222222", "UnitedHealthcare", "Platinum Plus", InsuranceStatus::Active, 2026, 300.0),
            ("INS-006", "P333333", "Aetna", "Standard Health Plan", InsuranceStatus::Active, 2026, 400.0),
            ("INS-010", "P777777", "Medicaid", "State Health Plan", InsuranceStatus::Active, 2026, 0.0),
            // P606060 has no coverage record on purpose
        ];

        for (id, patient_id, payer, plan, status, year, copay) in coverages {
            self.coverages.insert(
                patient_id.to_string(),
                InsuranceCoverage {
                    id: id.to_string(),
                    patient_id: patient_id.to_string(),
                    subscriber_id: format!("SUB{}", patient_id.trim_start_matches('P')),
                    payer: payer.to_string(),
                    plan_name: plan.to_string(),
                    status: *status,
                    period_start: NaiveDate::from_ymd_opt(*year, 1, 1),
                    period_end: NaiveDate::from_ymd_opt(*year, 12, 31),
                    copay_amount: Some(*copay),
                },
            );
        }
    }

    /// Search by exact id or case-insensitive substring of the name.
    pub fn search_patient(
        &self,
        name: Option<&str>,
        patient_id: Option<&str>,
    ) -> Result<serde_json::Value, OperationError> {
        if let Some(id) = patient_id {
            let patient = self.patients.get(id).ok_or_else(|| OperationError::PatientNotFound {
                patient_id: id.to_string(),
            })?;
            return Ok(serde_json::json!({
                "success": true,
                "patient": patient,
                "message": format!("Found patient: {}", patient.name),
            }));
        }

        let name = name.unwrap_or_default();
        let needle = name.to_lowercase();
        let mut matches: Vec<&Patient> = self
            .patients
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));

        if matches.is_empty() {
            return Err(OperationError::NoMatches { name: name.to_string() });
        }

        Ok(serde_json::json!({
            "success": true,
            "patients": matches,
            "count": matches.len(),
            "message": format!("Found {} patient(s) matching '{}'", matches.len(), name),
        }))
    }

    /// Eligibility check. A missing coverage record is a successful
    /// "not eligible" answer, not an error.
    pub fn check_insurance(&self, patient_id: &str) -> Result<serde_json::Value, OperationError> {
        if !self.patients.contains_key(patient_id) {
            return Err(OperationError::PatientNotFound {
                patient_id: patient_id.to_string(),
            });
        }

        match self.coverages.get(patient_id) {
            Some(coverage) => {
                let eligible = coverage.status == InsuranceStatus::Active;
                let status = match coverage.status {
                    InsuranceStatus::Active => "active",
                    InsuranceStatus::Inactive => "inactive",
                    InsuranceStatus::Pending => "pending",
                    InsuranceStatus::Expired => "expired",
                };
                Ok(serde_json::json!({
                    "success": true,
                    "eligible": eligible,
                    "coverage": coverage,
                    "message": format!("Insurance status: {}", status),
                }))
            }
            None => Ok(serde_json::json!({
                "success": true,
                "eligible": false,
                "message": "No insurance coverage found for this patient",
            })),
        }
    }

    /// Generate available slots for a specialty over a date window.
    ///
    /// Weekday slots at fixed hours, two providers per specialty, capped at
    /// ten slots. Generation is deterministic so identical queries return
    /// identical slot ids.
    pub fn find_slots(
        &self,
        specialty: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        provider_filter: Option<&str>,
    ) -> Result<serde_json::Value, OperationError> {
        let start = match start_date {
            Some(raw) => parse_date(raw)?,
            None => Utc::now().naive_utc(),
        };
        let end = match end_date {
            Some(raw) => parse_date(raw)?,
            None => start + Duration::days(7),
        };

        let specialty_lower = specialty.to_lowercase();
        let providers = providers_for(&specialty_lower);

        let mut slots: Vec<AppointmentSlot> = Vec::new();
        let mut day = start.date();

        while day <= end.date() && slots.len() < 10 {
            // Monday..Friday only
            if day.weekday().num_days_from_monday() < 5 {
                for (idx, hour) in SLOT_HOURS.iter().enumerate() {
                    if slots.len() >= 10 {
                        break;
                    }
                    let provider = providers[(day.day() as usize + idx) % providers.len()];
                    if let Some(filter) = provider_filter {
                        if provider.id != filter {
                            continue;
                        }
                    }

                    let slot_start = match day.and_hms_opt(*hour, 0, 0) {
                        Some(dt) => DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc),
                        None => continue,
                    };
                    if slot_start.naive_utc() < start {
                        continue;
                    }

                    slots.push(AppointmentSlot {
                        slot_id: format!(
                            "SLOT-{}-{:02}-{}",
                            day.format("%Y%m%d"),
                            hour,
                            provider.id
                        ),
                        specialty: specialty_lower.clone(),
                        provider_id: provider.id.to_string(),
                        provider_name: provider.name.to_string(),
                        start_time: slot_start,
                        end_time: slot_start + Duration::minutes(SLOT_MINUTES),
                        location: format!("Clinic Building A, Room {}", room_for(day, *hour)),
                        available: true,
                    });
                }
            }
            day += Duration::days(1);
        }

        Ok(serde_json::json!({
            "success": true,
            "slots": slots,
            "count": slots.len(),
            "message": format!("Found {} available slots for {}", slots.len(), specialty_lower),
        }))
    }

    /// Book an appointment in a previously offered slot.
    pub fn book_appointment(
        &mut self,
        patient_id: &str,
        slot_id: &str,
        reason: Option<&str>,
        notes: Option<&str>,
    ) -> Result<serde_json::Value, OperationError> {
        let patient = self
            .patients
            .get(patient_id)
            .ok_or_else(|| OperationError::PatientNotFound {
                patient_id: patient_id.to_string(),
            })?
            .clone();

        let (start_time, provider) = parse_slot_id(slot_id)?;
        let appointment_id = format!("APT-{}", Utc::now().format("%Y%m%d%H%M%S"));

        let appointment = Appointment {
            id: appointment_id.clone(),
            status: AppointmentStatus::Booked,
            patient_id: patient_id.to_string(),
            patient_name: patient.name.clone(),
            provider_id: provider.id.to_string(),
            provider_name: provider.name.to_string(),
            specialty: provider.specialty.to_string(),
            start_time,
            end_time: start_time + Duration::minutes(SLOT_MINUTES),
            location: format!("Clinic Building A, Room {}", room_for(start_time.date_naive(), start_time.hour())),
            reason: Some(reason.unwrap_or("General consultation").to_string()),
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
        };

        self.appointments.insert(appointment_id, appointment.clone());

        Ok(serde_json::json!({
            "success": true,
            "appointment": appointment,
            "message": format!("Appointment booked successfully for {}", patient.name),
        }))
    }

    /// Number of appointments currently booked. Lets callers observe that
    /// dry-run never mutates the store.
    pub fn appointment_count(&self) -> usize {
        self.appointments.len()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDateTime, OperationError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .map_err(|_| OperationError::InvalidDate { value: raw.to_string() })
}

/// Slot ids encode their schedule: `SLOT-YYYYMMDD-HH-<provider>`.
fn parse_slot_id(slot_id: &str) -> Result<(DateTime<Utc>, &'static Provider), OperationError> {
    let invalid = || OperationError::InvalidSlot { slot_id: slot_id.to_string() };

    let rest = slot_id.strip_prefix("SLOT-").ok_or_else(invalid)?;
    let mut parts = rest.splitn(3, '-');
    let date_str = parts.next().ok_or_else(invalid)?;
    let hour_str = parts.next().ok_or_else(invalid)?;
    let provider_id = parts.next().ok_or_else(invalid)?;

    let date = NaiveDate::parse_from_str(date_str, "%Y%m%d").map_err(|_| invalid())?;
    let hour: u32 = hour_str.parse().map_err(|_| invalid())?;
    let naive = date.and_hms_opt(hour, 0, 0).ok_or_else(invalid)?;
    let provider = provider_by_id(provider_id).ok_or_else(invalid)?;

    Ok((DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc), provider))
}

/// Deterministic room assignment so repeated queries agree.
fn room_for(day: NaiveDate, hour: u32) -> u32 {
    101 + ((day.day() * 7 + hour * 3) % 250)
}
