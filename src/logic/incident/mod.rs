//! Incident Module - Incident-response stage and the incident board
//!
//! ## Structure
//! - `types`: Action log and board entry types
//! - `responder`: Containment stage, tool results bound into the log
//! - `manager`: Append-only incident / threat / notification board

pub mod manager;
pub mod responder;
pub mod types;

pub use manager::IncidentBoard;
pub use responder::IncidentResponder;
pub use types::{
    ActionRecord, ActionType, Incident, IncidentResponse, Notification, NotificationLevel, Threat,
    ThreatStatus, NOT_EXECUTED,
};
