//! Policy Module - Policy-suggestion stage

pub mod advisor;
pub mod types;

pub use advisor::PolicyAdvisor;
pub use types::{Suggestion, SuggestionCategory, SuggestionSet};
