//! Host Collector - reads the local machine
//!
//! Processes come from sysinfo, everything else from the usual OS tools.
//! Every read returns text; failures are described, never raised.

use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::System;

use super::SnapshotSource;
use crate::logic::config::{Platform, VigilConfig};
use crate::logic::tools::{CommandRunner, LiveRunner, ShellCommand};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Keep the prompt bounded on busy hosts
const MAX_PROCESS_ROWS: usize = 300;

const LOG_LINES: &str = "200";

const WINDOWS_DISCOVERY_NOTE: &str = "Service discovery (mDNS/Zeroconf) is not monitored on Windows. \
    No devices detected via this method.";

// ============================================================================
// COLLECTOR
// ============================================================================

pub struct HostCollector {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    discovery_window_secs: u64,
}

impl HostCollector {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform, discovery_window_secs: u64) -> Self {
        Self {
            runner,
            platform,
            discovery_window_secs: discovery_window_secs.max(1),
        }
    }

    /// Reads are harmless, so the collector always runs live
    pub fn from_config(config: &VigilConfig) -> Self {
        let runner = LiveRunner::new(config.execution.command_timeout())
            .with_overrides(config.execution.binary_overrides.clone());
        Self::new(
            Arc::new(runner),
            config.execution.platform,
            config.pipeline.discovery_window_secs,
        )
    }

    async fn run_text(&self, command: ShellCommand) -> String {
        match self.runner.run(&command).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Collector command failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for HostCollector {
    async fn processes(&self) -> String {
        match tokio::task::spawn_blocking(list_processes).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("Process enumeration panicked: {}", e);
                format!("Error: process enumeration failed: {}", e)
            }
        }
    }

    async fn network_connections(&self) -> String {
        let text = self.run_text(ShellCommand::new("netstat", ["-an"])).await;
        if self.platform == Platform::Unix && text.contains("command not found") {
            // Newer distributions ship iproute2 only
            return self.run_text(ShellCommand::new("ss", ["-tuna"])).await;
        }
        text
    }

    async fn discovered_services(&self) -> String {
        match self.platform {
            Platform::Windows => WINDOWS_DISCOVERY_NOTE.to_string(),
            Platform::Unix => {
                let window = self.discovery_window_secs.to_string();
                let command = ShellCommand::new("timeout", [window.as_str(), "avahi-browse", "-a", "-r", "-t"]);
                match self.runner.run(&command).await {
                    Ok(text) if text.trim().is_empty() => no_services(self.discovery_window_secs),
                    Ok(text) => text,
                    // `timeout` exits 124 with nothing on either stream when nothing answered
                    Err(_) => no_services(self.discovery_window_secs),
                }
            }
        }
    }

    async fn logs(&self) -> String {
        let command = match self.platform {
            Platform::Unix => ShellCommand::new("journalctl", ["-p", "warning", "-n", LOG_LINES, "--no-pager"]),
            Platform::Windows => ShellCommand::new(
                "wevtutil",
                [
                    "qe",
                    "System",
                    "/c:100",
                    "/rd:true",
                    "/f:text",
                    "/q:*[System[(Level=2 or Level=3)]]",
                ],
            ),
        };
        self.run_text(command).await
    }
}

fn no_services(window: u64) -> String {
    format!("No network services discovered within the {} second window.", window)
}

fn list_processes() -> String {
    let mut sys = System::new();
    sys.refresh_processes();

    let mut rows: Vec<(u32, String, f32, u64, String)> = sys
        .processes()
        .iter()
        .map(|(pid, process)| {
            (
                pid.as_u32(),
                process.name().to_string(),
                process.cpu_usage(),
                process.memory(),
                process.cmd().join(" "),
            )
        })
        .collect();

    // Largest first so the truncated tail is the least interesting
    rows.sort_by(|a, b| b.3.cmp(&a.3));
    let total = rows.len();
    rows.truncate(MAX_PROCESS_ROWS);

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push("PID\tNAME\tCPU%\tMEM_MB\tCOMMAND".to_string());
    for (pid, name, cpu, memory, cmd) in rows {
        lines.push(format!(
            "{}\t{}\t{:.1}\t{:.1}\t{}",
            pid,
            name,
            cpu,
            memory as f64 / 1024.0 / 1024.0,
            cmd
        ));
    }
    if total > MAX_PROCESS_ROWS {
        lines.push(format!("... {} more processes not shown", total - MAX_PROCESS_ROWS));
    }
    lines.join("\n")
}
