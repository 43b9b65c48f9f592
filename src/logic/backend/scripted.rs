//! Scripted backend - deterministic replay
//!
//! Replies are queued per stage and handed out in order. Every request is
//! recorded so callers can assert on what each stage was asked.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use super::types::{BackendReply, GenerateRequest, Stage, ToolCall};
use super::ReasoningBackend;
use crate::error::{VigilError, VigilResult};

/// One step of a replay file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ScriptStep {
    ToolCalls(Vec<ToolCall>),
    Final(Value),
}

#[derive(Default)]
pub struct ScriptedBackend {
    queues: Mutex<HashMap<Stage, VecDeque<VigilResult<BackendReply>>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a replay file: `{ "<stage>": [ {"toolCalls": [...]}, {"final": {...}} ] }`
    pub fn from_file(path: &Path) -> VigilResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let script: HashMap<Stage, Vec<ScriptStep>> = serde_json::from_str(&raw)
            .map_err(|e| VigilError::Config(format!("invalid replay file {}: {}", path.display(), e)))?;

        let backend = Self::new();
        for (stage, steps) in script {
            for step in steps {
                match step {
                    ScriptStep::ToolCalls(calls) => backend.push_tool_calls(stage, calls),
                    ScriptStep::Final(value) => backend.push_final(stage, value),
                }
            }
        }
        Ok(backend)
    }

    pub fn push(&self, stage: Stage, reply: VigilResult<BackendReply>) {
        self.queues.lock().entry(stage).or_default().push_back(reply);
    }

    /// Queue a final payload. Strings are sent verbatim, anything else as JSON.
    pub fn push_final(&self, stage: Stage, payload: Value) {
        let text = match payload {
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.push(stage, Ok(BackendReply::Final(text)));
    }

    pub fn push_tool_calls(&self, stage: Stage, calls: Vec<ToolCall>) {
        self.push(stage, Ok(BackendReply::ToolCalls(calls)));
    }

    pub fn push_error(&self, stage: Stage, error: VigilError) {
        self.push(stage, Err(error));
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }

    /// Stage of every request received, in order
    pub fn stages_called(&self) -> Vec<Stage> {
        self.requests.lock().iter().map(|r| r.stage).collect()
    }

    /// First request made for a stage
    pub fn first_request(&self, stage: Stage) -> Option<GenerateRequest> {
        self.requests.lock().iter().find(|r| r.stage == stage).cloned()
    }

    pub fn remaining(&self, stage: Stage) -> usize {
        self.queues.lock().get(&stage).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerateRequest) -> VigilResult<BackendReply> {
        self.requests.lock().push(request.clone());

        let next = self
            .queues
            .lock()
            .get_mut(&request.stage)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| {
            Err(VigilError::Backend(format!(
                "no scripted reply left for stage {}",
                request.stage
            )))
        })
    }

    fn describe(&self) -> String {
        "scripted replay".to_string()
    }
}
