//! Threat Module - Reasoning stage
//!
//! ## Structure
//! - `types`: Verdict types
//! - `prompt`: Instruction templates
//! - `reasoner`: Snapshot -> verdict, with tool use
//! - `simulator`: Synthetic snapshots for end-to-end exercises

pub mod prompt;
pub mod reasoner;
pub mod simulator;
pub mod types;

pub use reasoner::ThreatReasoner;
pub use simulator::ThreatSimulator;
pub use types::{AttackerSummary, ReasoningOutcome, ReasoningVerdict, VerdictReply};
