//! Runtime configuration
//!
//! Load order: built-in defaults <- JSON config file <- environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{VigilError, VigilResult};

// ============================================================================
// REASONING POLICY
// ============================================================================

/// How the reasoning stage handles a malicious verdict.
///
/// - `autonomous = true`: the stage may invoke containment tools itself and
///   the orchestrator chains incident response immediately.
/// - `autonomous = false`: analysis-only; the stage produces a `userQuery`
///   and containment waits for an operator confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningPolicy {
    pub autonomous: bool,
}

impl Default for ReasoningPolicy {
    fn default() -> Self {
        Self { autonomous: true }
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Tool executors either touch the live host or only log what they would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Live,
    Simulated,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        if cfg!(feature = "simulation") {
            ExecutionMode::Simulated
        } else {
            ExecutionMode::Live
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(ExecutionMode::Live),
            "simulated" | "simulation" => Ok(ExecutionMode::Simulated),
            other => Err(VigilError::Config(format!("unknown execution mode '{}'", other))),
        }
    }
}

/// Command template family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub platform: Platform,
    pub command_timeout_secs: u64,
    /// Program name -> absolute path
    pub binary_overrides: HashMap<String, String>,
    /// Tool names (e.g. `uninstallProgram`) never offered to the backend
    pub disabled_tools: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            platform: Platform::default(),
            command_timeout_secs: constants::DEFAULT_COMMAND_TIMEOUT,
            binary_overrides: HashMap::new(),
            disabled_tools: Vec::new(),
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// ============================================================================
// BACKEND
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_BACKEND_URL.to_string(),
            model: constants::DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: constants::DEFAULT_BACKEND_TIMEOUT,
            max_retries: constants::DEFAULT_BACKEND_RETRIES,
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scan_interval_secs: u64,
    pub max_tool_turns: usize,
    pub approval_timeout_secs: u64,
    pub discovery_window_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: constants::DEFAULT_SCAN_INTERVAL,
            max_tool_turns: constants::DEFAULT_MAX_TOOL_TURNS,
            approval_timeout_secs: constants::DEFAULT_APPROVAL_TIMEOUT,
            discovery_window_secs: constants::DEFAULT_DISCOVERY_WINDOW,
        }
    }
}

// ============================================================================
// ROOT CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub backend: BackendConfig,
    pub policy: ReasoningPolicy,
    pub execution: ExecutionConfig,
    pub pipeline: PipelineConfig,
}

impl VigilConfig {
    /// Load configuration: explicit path, `VIGIL_CONFIG`, then the user
    /// config dir. A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> VigilResult<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| constants::get_config_path().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file (unset fields keep their defaults)
    pub fn from_file(path: &Path) -> VigilResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| VigilError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Environment overrides
    pub fn apply_env(&mut self) -> VigilResult<()> {
        if std::env::var("VIGIL_BACKEND_URL").is_ok() {
            self.backend.url = constants::get_backend_url();
        }
        if std::env::var("VIGIL_MODEL").is_ok() {
            self.backend.model = constants::get_model();
        }
        if let Some(key) = constants::get_api_key() {
            self.backend.api_key = Some(key);
        }
        if std::env::var("VIGIL_BACKEND_TIMEOUT").is_ok() {
            self.backend.timeout_secs = constants::get_backend_timeout();
        }
        if std::env::var("VIGIL_BACKEND_RETRIES").is_ok() {
            self.backend.max_retries = constants::get_backend_retries();
        }
        if let Some(autonomous) = constants::get_autonomous() {
            self.policy.autonomous = autonomous;
        }
        if let Some(mode) = constants::get_execution_mode() {
            self.execution.mode = mode.parse()?;
        }
        if std::env::var("VIGIL_COMMAND_TIMEOUT").is_ok() {
            self.execution.command_timeout_secs = constants::get_command_timeout();
        }
        if std::env::var("VIGIL_SCAN_INTERVAL").is_ok() {
            self.pipeline.scan_interval_secs = constants::get_scan_interval();
        }
        if std::env::var("VIGIL_MAX_TOOL_TURNS").is_ok() {
            self.pipeline.max_tool_turns = constants::get_max_tool_turns();
        }
        Ok(())
    }

    pub fn validate(&self) -> VigilResult<()> {
        if self.pipeline.scan_interval_secs == 0 {
            return Err(VigilError::Config("scan interval must be > 0".into()));
        }
        if self.pipeline.max_tool_turns == 0 {
            return Err(VigilError::Config("max tool turns must be > 0".into()));
        }
        if self.execution.command_timeout_secs == 0 || self.backend.timeout_secs == 0 {
            return Err(VigilError::Config("timeouts must be > 0".into()));
        }
        if self.backend.url.trim().is_empty() {
            return Err(VigilError::Config("backend url is empty".into()));
        }
        if cfg!(feature = "simulation") && self.execution.mode == ExecutionMode::Live {
            return Err(VigilError::Config("live execution is not available in a simulation build".into()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.pipeline.scan_interval_secs)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vigil").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VigilConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.scan_interval_secs, 30);
        assert!(config.policy.autonomous);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "policy": { "autonomous": false }, "execution": { "mode": "simulated" } }"#,
        )
        .unwrap();

        let config = VigilConfig::from_file(&path).unwrap();
        assert!(!config.policy.autonomous);
        assert_eq!(config.execution.mode, ExecutionMode::Simulated);
        assert_eq!(config.backend.model, constants::DEFAULT_MODEL);
        assert_eq!(config.pipeline.max_tool_turns, constants::DEFAULT_MAX_TOOL_TURNS);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        match VigilConfig::from_file(&path) {
            Err(VigilError::Config(msg)) => assert!(msg.contains("invalid config")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = VigilConfig::default();
        config.pipeline.scan_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "simulation")]
    #[test]
    fn test_simulation_build_rejects_live_mode() {
        let mut config = VigilConfig::default();
        assert_eq!(config.execution.mode, ExecutionMode::Simulated);

        config.execution.mode = ExecutionMode::Live;
        match config.validate() {
            Err(VigilError::Config(msg)) => assert!(msg.contains("simulation build")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_execution_mode_parse() {
        assert_eq!("LIVE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert_eq!("simulation".parse::<ExecutionMode>().unwrap(), ExecutionMode::Simulated);
        assert!("dry".parse::<ExecutionMode>().is_err());
    }
}
