//! Reasoning Backend - the external model service
//!
//! A backend receives a stage request (instructions, conversation so far and
//! the advertised tools) and either asks for tool calls or finalizes.

pub mod openai;
pub mod scripted;
pub mod types;

use async_trait::async_trait;

use crate::error::VigilResult;

pub use openai::OpenAiCompatBackend;
pub use scripted::ScriptedBackend;
pub use types::{BackendReply, GenerateRequest, Message, Role, Stage, ToolCall};

#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// One round trip. Transport and status failures are `VigilError::Backend`.
    async fn generate(&self, request: &GenerateRequest) -> VigilResult<BackendReply>;

    /// Human-readable identity for logs
    fn describe(&self) -> String;
}
