//! Domain types for the clinflow agent.
//!
//! This module contains the core data structures:
//! - Events: Immutable audit records
//! - Resources: Validated healthcare payloads (Patient, Coverage, Slot, Appointment)
//! - Response: Per-call results and the aggregated agent response

pub mod events;
pub mod resources;
pub mod response;

// Re-export commonly used types
pub use events::{AuditEvent, EventType};
pub use resources::{
    Appointment, AppointmentSlot, AppointmentStatus, Gender, InsuranceCoverage, InsuranceStatus,
    Patient,
};
pub use response::{AgentResponse, CallOutcome, CallResult, RequestStatus};
