//! Tool Executor + per-stage Toolbox
//!
//! `ToolExecutor` turns a validated tool input into exactly one external
//! command (or a honeypot store operation). `Toolbox` is the subset a stage
//! advertises; it converts every local failure into text for the backend.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::command::{CommandRunner, LiveRunner, SimulatedRunner};
use super::templates::build_command;
use super::types::{InvocationStatus, ToolDefinition, ToolInput, ToolInvocation, ToolKind};
use crate::error::{VigilError, VigilResult};
use crate::logic::backend::ToolCall;
use crate::logic::config::{ExecutionConfig, ExecutionMode, Platform};
use crate::logic::honeypot::HoneypotStore;

// ============================================================================
// EXECUTOR
// ============================================================================

pub struct ToolExecutor {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    honeypots: Arc<HoneypotStore>,
    disabled: HashSet<ToolKind>,
}

impl ToolExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform, honeypots: Arc<HoneypotStore>) -> Self {
        Self {
            runner,
            platform,
            honeypots,
            disabled: HashSet::new(),
        }
    }

    /// Select the runner once, from the configured execution mode.
    /// Simulation builds never get a live runner.
    pub fn from_config(config: &ExecutionConfig, honeypots: Arc<HoneypotStore>) -> Self {
        let mode = if cfg!(feature = "simulation") {
            if config.mode == ExecutionMode::Live {
                log::warn!("Live execution requested in a simulation build; using simulated runner");
            }
            ExecutionMode::Simulated
        } else {
            config.mode
        };

        let runner: Arc<dyn CommandRunner> = match mode {
            ExecutionMode::Live => Arc::new(
                LiveRunner::new(config.command_timeout()).with_overrides(config.binary_overrides.clone()),
            ),
            ExecutionMode::Simulated => Arc::new(SimulatedRunner::new()),
        };

        let mut disabled = HashSet::new();
        for name in &config.disabled_tools {
            match ToolKind::from_name(name) {
                Some(kind) => {
                    disabled.insert(kind);
                }
                None => log::warn!("Ignoring unknown disabled tool '{}'", name),
            }
        }

        log::info!(
            "Tool executor ready: mode={:?}, platform={:?}, disabled={}",
            mode,
            config.platform,
            disabled.len()
        );

        Self {
            runner,
            platform: config.platform,
            honeypots,
            disabled,
        }
    }

    pub fn with_disabled(mut self, kinds: &[ToolKind]) -> Self {
        self.disabled.extend(kinds.iter().copied());
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.runner.mode()
    }

    pub fn honeypots(&self) -> &Arc<HoneypotStore> {
        &self.honeypots
    }

    pub fn is_enabled(&self, kind: ToolKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Validate, build, execute. Validation happens before any command exists.
    pub async fn invoke(&self, kind: ToolKind, args: &Value) -> VigilResult<String> {
        let input = ToolInput::parse(kind, args)?;

        match input {
            ToolInput::DeployHoneypot(i) => {
                let deployment = self.honeypots.deploy(&i.port, &i.service);
                to_json(&deployment)
            }
            ToolInput::CheckHoneypot(i) => {
                let entries = self.honeypots.check(&i.honeypot_id);
                if entries.is_empty() {
                    log::warn!("Honeypot log requested for unknown id {}", i.honeypot_id);
                }
                to_json(&entries)
            }
            other => {
                let command = build_command(&other, self.platform)?;
                if kind.is_mutating() {
                    log::warn!("Executing containment action {}: {}", kind, command);
                } else {
                    log::info!("Running {}: {}", kind, command);
                }
                self.runner.run(&command).await
            }
        }
    }

    /// Tool catalog rendered as text (capabilities input for policy suggestions)
    pub fn inventory(&self) -> String {
        ToolKind::ALL
            .iter()
            .filter(|k| self.is_enabled(**k))
            .map(|k| {
                let class = if k.is_mutating() {
                    "containment"
                } else if ToolKind::HONEYPOT.contains(k) {
                    "deception"
                } else {
                    "investigation"
                };
                format!("- {} ({}): {}", k.name(), class, k.description())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> VigilResult<String> {
    serde_json::to_string(value).map_err(|e| VigilError::Validation(format!("unserializable tool output: {}", e)))
}

// ============================================================================
// TOOLBOX
// ============================================================================

/// Tools one stage may call
#[derive(Clone)]
pub struct Toolbox {
    executor: Arc<ToolExecutor>,
    allowed: Vec<ToolKind>,
}

impl Toolbox {
    /// Disabled kinds are dropped up front so they are never advertised
    pub fn new(executor: Arc<ToolExecutor>, kinds: &[ToolKind]) -> Self {
        let allowed = kinds.iter().copied().filter(|k| executor.is_enabled(*k)).collect();
        Self { executor, allowed }
    }

    pub fn allowed(&self) -> &[ToolKind] {
        &self.allowed
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.allowed.iter().map(ToolKind::definition).collect()
    }

    /// Execute one backend tool call. Never fails: every local error is
    /// rendered into the invocation's result text.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolInvocation {
        let kind = ToolKind::from_name(&call.name);

        let (result, status) = match kind {
            None => (
                format!(
                    "Error: unknown tool '{}'. Available tools: {}.",
                    call.name,
                    self.names().join(", ")
                ),
                InvocationStatus::Rejected,
            ),
            Some(k) if !self.allowed.contains(&k) => (
                format!("Error: tool '{}' is not available at this stage.", k),
                InvocationStatus::Rejected,
            ),
            Some(k) => match self.executor.invoke(k, &call.arguments).await {
                Ok(output) => (output, InvocationStatus::Completed),
                Err(VigilError::Validation(msg)) => {
                    log::warn!("Rejected {} call: {}", k, msg);
                    (format!("Error: invalid arguments: {}", msg), InvocationStatus::Rejected)
                }
                Err(e) => {
                    log::warn!("Tool {} failed: {}", k, e);
                    (format!("Error: {}", e), InvocationStatus::Failed)
                }
            },
        };

        ToolInvocation {
            call_id: call.id.clone(),
            name: call.name.clone(),
            kind,
            arguments: call.arguments.clone(),
            result,
            status,
        }
    }

    fn names(&self) -> Vec<&'static str> {
        self.allowed.iter().map(ToolKind::name).collect()
    }
}
