//! Error handling

use thiserror::Error;

pub type VigilResult<T> = Result<T, VigilError>;

#[derive(Debug, Clone, Error)]
pub enum VigilError {
    /// Malformed input to a tool executor or stage
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend payload does not match the stage's output contract
    #[error("schema violation in {stage}: {message}")]
    SchemaViolation { stage: String, message: String },

    /// Command exited with an error and produced nothing on stdout/stderr
    #[error("command `{command}` failed (exit code {exit_code:?}) without output")]
    ExternalCommand {
        command: String,
        exit_code: Option<i32>,
    },

    /// Transport / status failure talking to the reasoning backend
    #[error("reasoning backend failure: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VigilError {
    pub fn schema(stage: &str, message: impl Into<String>) -> Self {
        VigilError::SchemaViolation {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Stable short name used in logs and notifications
    pub fn kind(&self) -> &'static str {
        match self {
            VigilError::Validation(_) => "validation_error",
            VigilError::SchemaViolation { .. } => "schema_violation",
            VigilError::ExternalCommand { .. } => "external_command_failure",
            VigilError::Backend(_) => "backend_communication_failure",
            VigilError::Config(_) => "config_error",
        }
    }

    /// Whether the error ends the current pipeline run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VigilError::SchemaViolation { .. } | VigilError::Backend(_) | VigilError::Config(_)
        )
    }
}

impl From<validator::ValidationErrors> for VigilError {
    fn from(err: validator::ValidationErrors) -> Self {
        VigilError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for VigilError {
    fn from(err: reqwest::Error) -> Self {
        VigilError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(VigilError::schema("threatReasoning", "bad json").is_fatal());
        assert!(VigilError::Backend("timeout".into()).is_fatal());
        assert!(!VigilError::Validation("missing ip".into()).is_fatal());
        assert!(!VigilError::ExternalCommand { command: "nmap".into(), exit_code: Some(1) }.is_fatal());
    }

    #[test]
    fn test_display_mentions_stage() {
        let err = VigilError::schema("attackerProfile", "missing field `summary`");
        let text = err.to_string();
        assert!(text.contains("attackerProfile"));
        assert!(text.contains("summary"));
        assert_eq!(err.kind(), "schema_violation");
    }
}
