//! Policy suggestion types

use serde::{Deserialize, Serialize};

use crate::logic::agent::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionCategory {
    #[serde(rename = "New Tool")]
    NewTool,
    #[serde(rename = "New Data Source")]
    NewDataSource,
    #[serde(rename = "AI Model Enhancement")]
    AiModelEnhancement,
    #[serde(rename = "UX Improvement")]
    UxImprovement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(deserialize_with = "lenient::text")]
    pub suggestion: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub justification: String,
    pub category: SuggestionCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_wire_names() {
        let s: Suggestion = serde_json::from_value(json!({
            "suggestion": "Add a YARA scanner",
            "justification": "Two incidents involved unsigned binaries",
            "category": "New Tool"
        }))
        .unwrap();
        assert_eq!(s.category, SuggestionCategory::NewTool);
        assert_eq!(
            serde_json::to_value(SuggestionCategory::AiModelEnhancement).unwrap(),
            json!("AI Model Enhancement")
        );
        assert!(serde_json::from_value::<SuggestionCategory>(json!("Hardware")).is_err());
    }

    #[test]
    fn test_suggestions_required() {
        assert!(serde_json::from_value::<SuggestionSet>(json!({ "ideas": [] })).is_err());
    }
}
