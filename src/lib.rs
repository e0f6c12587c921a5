//! clinflow - clinical workflow agent for administrative tasks
//!
//! An orchestration agent that turns free-text requests into validated
//! administrative operations: patient lookup, insurance eligibility,
//! slot search, and appointment booking. It never gives medical advice.
//!
//! # Architecture
//!
//! Every request runs the same pipeline:
//! - The intent gate screens the raw text for medical-advice intent
//! - A planning backend proposes a structured list of function calls
//! - Each call is validated, then executed (or simulated in dry-run)
//! - Every step is appended to an immutable JSONL audit log
//!
//! # Modules
//!
//! - `adapters`: Text-generation backends (hosted inference, scripted)
//! - `core`: Orchestration logic (safety, registry, planner, audit, agent)
//! - `domain`: Data structures (AuditEvent, AgentResponse, resources)
//! - `records`: Seeded in-memory backing store
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! clinflow chat
//!
//! # One-shot request
//! clinflow ask "Find patient Ravi Kumar"
//!
//! # Simulate without executing
//! clinflow ask --dry-run "Book a cardiology appointment for P123456"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod records;

// Re-export main types at crate root for convenience
pub use crate::core::WorkflowAgent;
pub use domain::{AgentResponse, AuditEvent, CallOutcome, CallResult, EventType, RequestStatus};
pub use records::RecordStore;
