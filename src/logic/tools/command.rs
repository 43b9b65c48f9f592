//! Command Runners
//!
//! Every tool boils down to one external command. Two mutually exclusive
//! runners exist: `LiveRunner` executes against the host, `SimulatedRunner`
//! only logs and records what would have been executed.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{VigilError, VigilResult};
use crate::logic::config::ExecutionMode;

// ============================================================================
// SHELL COMMAND
// ============================================================================

/// Program + argv. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program the user actually cares about (`timeout 3 avahi-browse` -> `avahi-browse`)
    pub fn subject(&self) -> &str {
        if self.program == "timeout" {
            if let Some(inner) = self.args.iter().skip(1).find(|a| !a.starts_with('-')) {
                return inner;
            }
        }
        &self.program
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// RUNNER CONTRACT
// ============================================================================

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command. Operational failures come back as `Ok(text)`;
    /// only a failure with no output at all is an `Err`.
    async fn run(&self, command: &ShellCommand) -> VigilResult<String>;

    fn mode(&self) -> ExecutionMode;
}

/// Descriptive result for a missing CLI dependency
pub fn missing_dependency_message(program: &str) -> String {
    format!(
        "Error: '{}' command not found. Please install {} to enable this capability.",
        program,
        package_hint(program)
    )
}

fn package_hint(program: &str) -> &str {
    match program {
        "dig" | "nslookup" => "dnsutils (bind-utils)",
        "avahi-browse" => "avahi-utils",
        "traceroute" => "traceroute",
        "whois" => "whois",
        "nmap" => "nmap",
        "ufw" => "ufw",
        "journalctl" => "systemd",
        "netstat" => "net-tools",
        other => other,
    }
}

/// Map a finished process onto the tool result contract
pub fn interpret_output(
    command: &ShellCommand,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> VigilResult<String> {
    let success = exit_code == Some(0);

    if success {
        if !stderr.trim().is_empty() {
            log::warn!("Command \"{}\" produced stderr: {}", command, stderr.trim());
            if stdout.trim().is_empty() {
                return Ok(stderr.to_string());
            }
        }
        return Ok(stdout.to_string());
    }

    // Shell-style "not found" (e.g. wrapped by `timeout`)
    if exit_code == Some(127) || stderr.contains("command not found") {
        return Ok(missing_dependency_message(command.subject()));
    }

    let merged: Vec<&str> = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    if merged.is_empty() {
        log::error!("Command \"{}\" failed with exit code {:?} and no output", command, exit_code);
        return Err(VigilError::ExternalCommand {
            command: command.to_string(),
            exit_code,
        });
    }

    log::warn!("Command \"{}\" exited with {:?}", command, exit_code);
    Ok(merged.join("\n"))
}

// ============================================================================
// LIVE RUNNER
// ============================================================================

pub struct LiveRunner {
    timeout: Duration,
    overrides: HashMap<String, String>,
}

impl LiveRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    fn resolve<'a>(&'a self, program: &'a str) -> &'a str {
        self.overrides.get(program).map(String::as_str).unwrap_or(program)
    }
}

#[async_trait]
impl CommandRunner for LiveRunner {
    async fn run(&self, command: &ShellCommand) -> VigilResult<String> {
        let program = self.resolve(&command.program);
        log::debug!("Executing command: {}", command);

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                log::warn!("Command \"{}\" timed out after {:?}", command, self.timeout);
                return Ok(format!(
                    "No data: `{}` timed out after {} seconds.",
                    command,
                    self.timeout.as_secs()
                ));
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("Command \"{}\" not available: {}", command, e);
                return Ok(missing_dependency_message(&command.program));
            }
            Ok(Err(e)) => {
                log::error!("Execution error for command \"{}\": {}", command, e);
                return Ok(format!("Error: failed to start `{}`: {}", command, e));
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        interpret_output(command, output.status.code(), &stdout, &stderr)
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Live
    }
}

// ============================================================================
// SIMULATED RUNNER
// ============================================================================

#[derive(Default)]
pub struct SimulatedRunner {
    executed: Mutex<Vec<String>>,
}

impl SimulatedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands that would have been executed, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for SimulatedRunner {
    async fn run(&self, command: &ShellCommand) -> VigilResult<String> {
        let rendered = command.to_string();
        log::info!("[SIMULATION] Would execute: {}", rendered);
        self.executed.lock().push(rendered.clone());
        Ok(format!("Simulated execution of: {}", rendered))
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulated
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd() -> ShellCommand {
        ShellCommand::new("nmap", ["-F", "198.51.100.24"])
    }

    #[test]
    fn test_display_quotes_spaced_args() {
        let c = ShellCommand::new("netsh", ["advfirewall", "name=Block 1.2.3.4"]);
        assert_eq!(c.to_string(), "netsh advfirewall \"name=Block 1.2.3.4\"");
    }

    #[test]
    fn test_subject_unwraps_timeout() {
        let c = ShellCommand::new("timeout", ["3", "avahi-browse", "-a"]);
        assert_eq!(c.subject(), "avahi-browse");
        assert_eq!(cmd().subject(), "nmap");
    }

    #[test]
    fn test_success_returns_stdout() {
        let out = interpret_output(&cmd(), Some(0), "22/tcp open ssh\n", "").unwrap();
        assert!(out.contains("22/tcp"));
    }

    #[test]
    fn test_success_with_only_stderr_returns_stderr() {
        let out = interpret_output(&cmd(), Some(0), "", "warning: slow host").unwrap();
        assert_eq!(out, "warning: slow host");
    }

    #[test]
    fn test_failure_returns_merged_streams() {
        let out = interpret_output(&cmd(), Some(1), "partial", "Failed to resolve").unwrap();
        assert!(out.contains("partial"));
        assert!(out.contains("Failed to resolve"));
    }

    #[test]
    fn test_failure_without_output_is_hard_error() {
        match interpret_output(&cmd(), Some(2), "  ", "") {
            Err(VigilError::ExternalCommand { exit_code, command }) => {
                assert_eq!(exit_code, Some(2));
                assert!(command.starts_with("nmap"));
            }
            other => panic!("Expected ExternalCommand error, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_127_is_missing_dependency() {
        let wrapped = ShellCommand::new("timeout", ["3", "avahi-browse", "-a", "-r", "-t"]);
        let out = interpret_output(&wrapped, Some(127), "", "timeout: failed to run command").unwrap();
        assert!(out.contains("'avahi-browse' command not found"));
        assert!(out.contains("avahi-utils"));
    }

    #[tokio::test]
    async fn test_live_runner_missing_binary_is_descriptive() {
        let runner = LiveRunner::new(Duration::from_secs(5));
        let missing = ShellCommand::new("vigil-no-such-binary-8c1f", ["--version"]);
        let out = runner.run(&missing).await.unwrap();
        assert!(out.contains("not found"));
    }

    #[tokio::test]
    async fn test_simulated_runner_records() {
        let runner = SimulatedRunner::new();
        let out = runner.run(&cmd()).await.unwrap();
        assert_eq!(out, "Simulated execution of: nmap -F 198.51.100.24");
        assert_eq!(runner.executed(), vec!["nmap -F 198.51.100.24".to_string()]);
        assert_eq!(runner.mode(), ExecutionMode::Simulated);
    }
}
