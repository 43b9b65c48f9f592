//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment (or a `.env` file).

/// Default reasoning backend (OpenAI-compatible chat completions endpoint)
pub const DEFAULT_BACKEND_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default model name
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default scan interval (seconds) - matches the dashboard re-trigger
pub const DEFAULT_SCAN_INTERVAL: u64 = 30;

/// Default timeout for a single external command (seconds)
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 20;

/// Default timeout for a single backend round trip (seconds)
pub const DEFAULT_BACKEND_TIMEOUT: u64 = 60;

/// Default number of retries for transient backend failures
pub const DEFAULT_BACKEND_RETRIES: u32 = 2;

/// Default cap on backend turns inside one reasoning call
pub const DEFAULT_MAX_TOOL_TURNS: usize = 8;

/// Window the service-discovery collector is allowed to browse (seconds)
pub const DEFAULT_DISCOVERY_WINDOW: u64 = 3;

/// Default lifetime of a pending confirmation (seconds)
pub const DEFAULT_APPROVAL_TIMEOUT: u64 = 600;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Vigil";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get backend URL from environment or use default
pub fn get_backend_url() -> String {
    std::env::var("VIGIL_BACKEND_URL")
        .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
}

/// Get model name from environment or use default
pub fn get_model() -> String {
    std::env::var("VIGIL_MODEL")
        .unwrap_or_else(|_| DEFAULT_MODEL.to_string())
}

/// Get API key (`VIGIL_API_KEY`, then `GEMINI_API_KEY`)
pub fn get_api_key() -> Option<String> {
    std::env::var("VIGIL_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Get scan interval from environment or use default
pub fn get_scan_interval() -> u64 {
    env_u64("VIGIL_SCAN_INTERVAL").unwrap_or(DEFAULT_SCAN_INTERVAL)
}

/// Get command timeout from environment or use default
pub fn get_command_timeout() -> u64 {
    env_u64("VIGIL_COMMAND_TIMEOUT").unwrap_or(DEFAULT_COMMAND_TIMEOUT)
}

/// Get backend timeout from environment or use default
pub fn get_backend_timeout() -> u64 {
    env_u64("VIGIL_BACKEND_TIMEOUT").unwrap_or(DEFAULT_BACKEND_TIMEOUT)
}

/// Get backend retry count from environment or use default
pub fn get_backend_retries() -> u32 {
    std::env::var("VIGIL_BACKEND_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_BACKEND_RETRIES)
}

/// Get max tool turns from environment or use default
pub fn get_max_tool_turns() -> usize {
    std::env::var("VIGIL_MAX_TOOL_TURNS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_TOOL_TURNS)
}

/// Autonomous mode flag (`None` when not set in the environment)
pub fn get_autonomous() -> Option<bool> {
    std::env::var("VIGIL_AUTONOMOUS")
        .ok()
        .map(|s| s.to_lowercase() != "false" && s != "0")
}

/// Execution mode name (`live` / `simulated`), if set
pub fn get_execution_mode() -> Option<String> {
    std::env::var("VIGIL_EXECUTION_MODE").ok()
}

/// Explicit config file path, if set
pub fn get_config_path() -> Option<String> {
    std::env::var("VIGIL_CONFIG").ok()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
