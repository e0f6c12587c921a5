//! Core orchestration logic.
//!
//! This module contains:
//! - Safety: intent screening and parameter validation
//! - Registry: the closed set of administrative operations
//! - Planner: free text to structured call plans
//! - Audit: append-only session logging with counters
//! - Agent: the request pipeline tying the above together

pub mod agent;
pub mod audit;
pub mod planner;
pub mod registry;
pub mod safety;

// Re-export commonly used types
pub use agent::WorkflowAgent;
pub use audit::{AuditLogger, SessionSummary};
pub use planner::{Plan, PlannedCall, PlanningError};
pub use registry::{Operation, OperationDescriptor};
pub use safety::{IntentViolation, ValidationError};
