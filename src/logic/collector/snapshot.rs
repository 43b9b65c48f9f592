//! System Snapshot - one scan cycle's textual view of the host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::agent::lenient;

/// Placeholder for the binaries inventory (not collected per scan)
pub const BINARIES_NOT_COLLECTED: &str = "N/A for this scan";

/// Immutable once built. The core never parses these blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    #[serde(alias = "systemProcesses", deserialize_with = "lenient::text")]
    pub processes: String,
    #[serde(deserialize_with = "lenient::text")]
    pub logs: String,
    #[serde(default = "default_binaries", deserialize_with = "lenient::text")]
    pub binaries: String,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub network_connections: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub connected_devices: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub system_drivers: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub discovered_services: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub known_vulnerabilities: Option<String>,
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

fn default_binaries() -> String {
    BINARIES_NOT_COLLECTED.to_string()
}

impl SystemSnapshot {
    pub fn new(processes: impl Into<String>, logs: impl Into<String>) -> Self {
        Self {
            processes: processes.into(),
            logs: logs.into(),
            binaries: default_binaries(),
            network_connections: None,
            connected_devices: None,
            system_drivers: None,
            discovered_services: None,
            known_vulnerabilities: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_binaries(mut self, binaries: impl Into<String>) -> Self {
        self.binaries = binaries.into();
        self
    }

    pub fn with_network_connections(mut self, text: impl Into<String>) -> Self {
        self.network_connections = non_blank(text.into());
        self
    }

    pub fn with_connected_devices(mut self, text: impl Into<String>) -> Self {
        self.connected_devices = non_blank(text.into());
        self
    }

    pub fn with_system_drivers(mut self, text: impl Into<String>) -> Self {
        self.system_drivers = non_blank(text.into());
        self
    }

    pub fn with_discovered_services(mut self, text: impl Into<String>) -> Self {
        self.discovered_services = non_blank(text.into());
        self
    }

    pub fn with_known_vulnerabilities(mut self, text: impl Into<String>) -> Self {
        self.known_vulnerabilities = non_blank(text.into());
        self
    }

    /// (placeholder, value) pairs for instruction templates; absent fields are ""
    pub fn template_values(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("processes", self.processes.as_str()),
            ("logs", self.logs.as_str()),
            ("binaries", self.binaries.as_str()),
            ("networkConnections", opt(&self.network_connections)),
            ("connectedDevices", opt(&self.connected_devices)),
            ("systemDrivers", opt(&self.system_drivers)),
            ("discoveredServices", opt(&self.discovered_services)),
            ("knownVulnerabilities", opt(&self.known_vulnerabilities)),
        ]
    }

    /// Textual system-state description handed to later stages
    pub fn render_state(&self) -> String {
        const TITLES: [(&str, &str); 8] = [
            ("processes", "Processes"),
            ("networkConnections", "Network Connections"),
            ("discoveredServices", "Discovered Services"),
            ("connectedDevices", "Connected Devices"),
            ("systemDrivers", "System Drivers"),
            ("knownVulnerabilities", "Known Vulnerabilities"),
            ("binaries", "Binaries"),
            ("logs", "Logs"),
        ];

        let values = self.template_values();
        let mut sections = Vec::new();
        for (key, title) in TITLES {
            let value = values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.trim())
                .unwrap_or_default();
            if !value.is_empty() {
                sections.push(format!("{}:\n{}", title, value));
            }
        }
        sections.join("\n\n")
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_state_skips_absent_sections() {
        let snap = SystemSnapshot::new("1234 evil.exe", "")
            .with_network_connections("TCP 10.0.0.5:51234 198.51.100.24:4444 ESTABLISHED");

        let state = snap.render_state();
        assert!(state.starts_with("Processes:\n1234 evil.exe"));
        assert!(state.contains("Network Connections:\nTCP 10.0.0.5:51234 198.51.100.24:4444"));
        assert!(!state.contains("Logs:"));
        assert!(state.contains("Binaries:\nN/A for this scan"));
    }

    #[test]
    fn test_blank_optionals_become_none() {
        let snap = SystemSnapshot::new("p", "l").with_discovered_services("   ");
        assert!(snap.discovered_services.is_none());
    }

    #[test]
    fn test_deserializes_generated_scenario() {
        let snap: SystemSnapshot = serde_json::from_value(json!({
            "systemProcesses": "4242 cryptominer --pool stratum+tcp://pool.evil",
            "logs": ["Failed password for root from 45.148.10.134", "sudo: session opened"],
            "networkConnections": "",
        }))
        .unwrap();

        assert!(snap.processes.contains("cryptominer"));
        assert!(snap.logs.contains("45.148.10.134; sudo"));
        assert_eq!(snap.binaries, BINARIES_NOT_COLLECTED);
        assert!(snap.network_connections.is_none());
    }
}
