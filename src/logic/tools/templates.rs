//! Command Templates
//!
//! Fixed templates per tool and platform. Validated input is substituted
//! into argv slots only.

use crate::error::{VigilError, VigilResult};
use crate::logic::config::Platform;

use super::command::ShellCommand;
use super::types::ToolInput;

// ============================================================================
// CONSTANTS
// ============================================================================

const RULE_PREFIX: &str = "Vigil_Block_";

// ============================================================================
// BUILDERS
// ============================================================================

/// Build the external command for a command-backed tool
pub fn build_command(input: &ToolInput, platform: Platform) -> VigilResult<ShellCommand> {
    let command = match input {
        ToolInput::BlockIp(i) => block_ip(&i.ip, platform),
        ToolInput::Uninstall(i) => uninstall(&i.program_name, platform),
        ToolInput::ChangeSetting(i) => change_setting(&i.setting, &i.value, platform),
        ToolInput::Traceroute(i) => match platform {
            Platform::Windows => ShellCommand::new("tracert", ["-d", "-h", "20", i.host.as_str()]),
            Platform::Unix => ShellCommand::new("traceroute", ["-n", "-m", "20", i.host.as_str()]),
        },
        ToolInput::PortScan(i) => ShellCommand::new("nmap", ["-F", i.host.as_str()]),
        ToolInput::DnsInfo(i) => ShellCommand::new("nslookup", [i.domain.as_str()]),
        ToolInput::Whois(i) => ShellCommand::new("whois", [i.target.as_str()]),
        ToolInput::Dig(i) => {
            let mut args = vec![i.domain.clone()];
            if let Some(record) = i.record_type.as_deref().filter(|r| !r.trim().is_empty()) {
                args.push(record.trim().to_uppercase());
            }
            args.push("+short".to_string());
            ShellCommand::new("dig", args)
        }
        ToolInput::ReverseDns(i) => match platform {
            Platform::Windows => ShellCommand::new("nslookup", [i.ip.as_str()]),
            Platform::Unix => ShellCommand::new("dig", ["-x", i.ip.as_str(), "+short"]),
        },
        ToolInput::DeployHoneypot(_) | ToolInput::CheckHoneypot(_) => {
            return Err(VigilError::Validation(
                "honeypot tools are not backed by an external command".to_string(),
            ))
        }
    };
    Ok(command)
}

fn block_ip(ip: &str, platform: Platform) -> ShellCommand {
    match platform {
        Platform::Windows => ShellCommand::new(
            "netsh",
            [
                "advfirewall".to_string(),
                "firewall".to_string(),
                "add".to_string(),
                "rule".to_string(),
                format!("name={}{}", RULE_PREFIX, ip),
                "dir=in".to_string(),
                "action=block".to_string(),
                format!("remoteip={}", ip),
            ],
        ),
        Platform::Unix => ShellCommand::new("ufw", ["insert", "1", "deny", "from", ip]),
    }
}

fn uninstall(program: &str, platform: Platform) -> ShellCommand {
    match platform {
        Platform::Windows => ShellCommand::new(
            "wmic",
            [
                "product".to_string(),
                "where".to_string(),
                format!("name='{}'", program.replace('\'', "")),
                "call".to_string(),
                "uninstall".to_string(),
                "/nointeractive".to_string(),
            ],
        ),
        Platform::Unix => ShellCommand::new("apt-get", ["remove", "-y", program]),
    }
}

fn change_setting(setting: &str, value: &str, platform: Platform) -> ShellCommand {
    match platform {
        Platform::Windows => {
            let (key, name) = split_registry_setting(setting);
            let mut args = vec!["add".to_string(), key.to_string()];
            match name {
                Some(name) => {
                    args.push("/v".to_string());
                    args.push(name.to_string());
                }
                None => args.push("/ve".to_string()),
            }
            args.push("/d".to_string());
            args.push(value.to_string());
            args.push("/f".to_string());
            ShellCommand::new("reg", args)
        }
        Platform::Unix => ShellCommand::new("sysctl", ["-w".to_string(), format!("{}={}", setting, value)]),
    }
}

/// `HKLM\Path\To\Key\ValueName` -> (`HKLM\Path\To\Key`, Some(`ValueName`))
pub fn split_registry_setting(setting: &str) -> (&str, Option<&str>) {
    let trimmed = setting.trim_end_matches('\\');
    match trimmed.rfind('\\') {
        Some(idx) if idx > 0 && idx + 1 < trimmed.len() => {
            (&trimmed[..idx], Some(&trimmed[idx + 1..]))
        }
        _ => (trimmed, None),
    }
}
