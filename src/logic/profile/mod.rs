//! Profile Module - Attacker-profile stage
//!
//! ## Structure
//! - `types`: Profile, threat level and request types
//! - `ioc`: Literal indicator extraction and merging
//! - `level`: Threat level policies
//! - `generator`: The profiling stage itself

pub mod generator;
pub mod ioc;
pub mod level;
pub mod types;

pub use generator::AttackerProfiler;
pub use ioc::{extract_indicators, merge_indicators, Indicator, IndicatorKind};
pub use level::{EvidenceFloor, ModelAssessed, ProfileEvidence, ThreatLevelPolicy};
pub use types::{AttackerProfile, ProfileRequest, ThreatLevel};
