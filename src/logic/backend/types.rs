//! Backend Types - conversation, tool-call sub-protocol and stage tags

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::tools::ToolDefinition;

// ============================================================================
// STAGES
// ============================================================================

/// Reasoning call site. Used for routing (scripted replies), logging and
/// schema-violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    ThreatReasoning,
    IncidentResponse,
    AttackerProfile,
    KnowledgeGraph,
    PolicyAdaptation,
    ThreatSimulation,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ThreatReasoning => "threatReasoning",
            Stage::IncidentResponse => "incidentResponse",
            Stage::AttackerProfile => "attackerProfile",
            Stage::KnowledgeGraph => "knowledgeGraph",
            Stage::PolicyAdaptation => "policyAdaptation",
            Stage::ThreatSimulation => "threatSimulation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// CONVERSATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool request issued by the backend. `name` is opaque until matched
/// against the tool table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content.into())
    }

    /// Assistant turn that requested tools
    pub fn tool_requests(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Tool result returned to the backend
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn plain(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

// ============================================================================
// REQUEST / REPLY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub stage: Stage,
    pub messages: Vec<Message>,
    /// Tools the backend may request during this call
    pub tools: Vec<ToolDefinition>,
    /// Structured stage input (the values substituted into the prompt)
    pub input: Value,
}

impl GenerateRequest {
    pub fn new(stage: Stage, system: impl Into<String>, prompt: impl Into<String>, input: Value) -> Self {
        Self {
            stage,
            messages: vec![Message::system(system), Message::user(prompt)],
            tools: Vec::new(),
            input,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Names of the advertised tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// Intermediate turn: execute these in order and report back
    ToolCalls(Vec<ToolCall>),
    /// Final payload (expected to hold the stage's JSON object)
    Final(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_starts_with_system_and_user() {
        let req = GenerateRequest::new(Stage::ThreatReasoning, "sys", "prompt", json!({}));
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].role, Role::User);
        assert!(req.tool_names().is_empty());
    }

    #[test]
    fn test_tool_result_message_links_call() {
        let msg = Message::tool_result("call_7", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::AttackerProfile.to_string(), "attackerProfile");
        assert_eq!(serde_json::to_value(Stage::KnowledgeGraph).unwrap(), json!("knowledgeGraph"));
    }
}
