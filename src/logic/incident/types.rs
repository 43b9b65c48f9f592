//! Incident types - response action log and the incident board entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::agent::lenient;
use crate::logic::profile::ThreatLevel;
use crate::logic::tools::ToolKind;

// ============================================================================
// RESPONSE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    QuarantineProcess,
    IsolateFile,
    BlockIp,
    UninstallProgram,
    ChangeSetting,
    NoAction,
}

impl ActionType {
    /// Containment tool backing this action, if any
    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            ActionType::BlockIp => Some(ToolKind::BlockIpAddress),
            ActionType::UninstallProgram => Some(ToolKind::UninstallProgram),
            ActionType::ChangeSetting => Some(ToolKind::ChangeSystemSetting),
            ActionType::QuarantineProcess | ActionType::IsolateFile | ActionType::NoAction => None,
        }
    }

    pub fn for_tool(kind: ToolKind) -> Option<Self> {
        match kind {
            ToolKind::BlockIpAddress => Some(ActionType::BlockIp),
            ToolKind::UninstallProgram => Some(ActionType::UninstallProgram),
            ToolKind::ChangeSystemSetting => Some(ActionType::ChangeSetting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub action_type: ActionType,
    #[serde(default, deserialize_with = "lenient::text")]
    pub target: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub reason: String,
    /// Executor output; whatever the model wrote here is replaced
    #[serde(default, deserialize_with = "lenient::text")]
    pub result: String,
}

impl ActionRecord {
    pub fn no_action(reason: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::NoAction,
            target: String::new(),
            reason: reason.into(),
            result: "No action taken.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponse {
    #[serde(default)]
    pub actions_taken: Vec<ActionRecord>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
}

impl IncidentResponse {
    /// Containment records that actually ran a tool
    pub fn containment_count(&self) -> usize {
        self.actions_taken
            .iter()
            .filter(|a| {
                a.action_type.tool().is_some()
                    && !a.result.starts_with(NOT_EXECUTED)
                    && !a.result.starts_with("Error:")
            })
            .count()
    }

    /// One line per action, for downstream prompts
    pub fn action_log(&self) -> String {
        self.actions_taken
            .iter()
            .map(|a| {
                let action = serde_json::to_value(a.action_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                if a.target.is_empty() {
                    format!("- {}: {}", action, a.result.trim())
                } else {
                    format!("- {} {}: {}", action, a.target, a.result.trim())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Prefix of the result of a record the model reported but never executed
pub const NOT_EXECUTED: &str = "Not executed";

// ============================================================================
// BOARD ENTRIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatStatus {
    ActionRecommended,
    AwaitingConfirmation,
    Contained,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    pub run_id: Uuid,
    pub time: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub details: String,
    pub is_malicious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attacker_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    pub id: String,
    pub run_id: Uuid,
    pub description: String,
    pub severity: ThreatLevel,
    pub status: ThreatStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Critical,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
    pub time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_type_wire_names() {
        let record: ActionRecord = serde_json::from_value(json!({
            "actionType": "blockIp",
            "target": "198.51.100.24",
            "reason": "C2 beacon"
        }))
        .unwrap();
        assert_eq!(record.action_type, ActionType::BlockIp);
        assert!(record.result.is_empty());
        assert_eq!(ActionType::BlockIp.tool(), Some(ToolKind::BlockIpAddress));
        assert_eq!(ActionType::for_tool(ToolKind::RunWhois), None);
    }

    #[test]
    fn test_unknown_action_type_rejected() {
        let result = serde_json::from_value::<ActionRecord>(json!({ "actionType": "wipeDisk" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_action_log() {
        let response = IncidentResponse {
            actions_taken: vec![ActionRecord {
                action_type: ActionType::BlockIp,
                target: "198.51.100.24".into(),
                reason: "C2".into(),
                result: "Rule added\n".into(),
            }],
            summary: "Blocked".into(),
        };
        assert_eq!(response.action_log(), "- blockIp 198.51.100.24: Rule added");
        assert_eq!(response.containment_count(), 1);
    }
}
