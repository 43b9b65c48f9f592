//! Final-payload extraction
//!
//! Models wrap JSON in code fences, prose or an extra layer of string
//! escaping. Recover the object before handing it to serde.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{VigilError, VigilResult};

const MAX_UNWRAP_PASSES: usize = 3;

/// Best-effort recovery of the JSON object inside a model reply
pub fn extract_json_object(text: &str) -> Option<Value> {
    let mut current = strip_code_fence(text.trim()).to_string();

    for _ in 0..MAX_UNWRAP_PASSES {
        match serde_json::from_str::<Value>(&current) {
            Ok(value @ Value::Object(_)) => return Some(value),
            // String-wrapped JSON: unescape once more
            Ok(Value::String(inner)) => {
                current = strip_code_fence(inner.trim()).to_string();
                continue;
            }
            _ => {}
        }

        let start = current.find('{')?;
        let end = current.rfind('}')?;
        if end <= start {
            return None;
        }
        let slice = &current[start..=end];
        match serde_json::from_str::<Value>(slice) {
            Ok(value @ Value::Object(_)) => return Some(value),
            _ => {
                if slice.len() == current.len() {
                    return None;
                }
                current = slice.to_string();
            }
        }
    }

    None
}

/// Extract and deserialize a stage's final payload
pub fn parse_final<T: DeserializeOwned>(stage: &str, text: &str) -> VigilResult<T> {
    let value = extract_json_object(text).ok_or_else(|| {
        VigilError::schema(stage, format!("reply is not a JSON object: {}", preview(text)))
    })?;
    serde_json::from_value(value).map_err(|e| VigilError::schema(stage, e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line (```json)
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(text: &str) -> String {
    let flat: String = text.chars().take(120).collect();
    if text.chars().count() > 120 {
        format!("{}...", flat)
    } else {
        flat
    }
}
