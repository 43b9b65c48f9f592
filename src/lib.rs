//! Vigil Core - multi-stage threat reasoning and response orchestration
//!
//! A host snapshot goes to a reasoning backend; malicious verdicts trigger
//! containment through a fixed tool catalog, then an attacker profile.
//! Knowledge-graph ingestion and policy suggestions run on demand.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{VigilError, VigilResult};
pub use logic::config::VigilConfig;
pub use logic::pipeline::{Disposition, Pipeline, PipelineError, PipelineOutcome};
