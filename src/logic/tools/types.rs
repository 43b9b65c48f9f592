//! Tool Types
//!
//! Closed set of tools the reasoning backend may request, their declared
//! input schemas, and the typed/validated inputs they are parsed into.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use crate::error::{VigilError, VigilResult};

// ============================================================================
// TOOL KIND (dispatch table)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    // Containment (host-mutating)
    BlockIpAddress,
    UninstallProgram,
    ChangeSystemSetting,

    // Investigation (read-only)
    RunTraceroute,
    RunPortScan,
    GetDnsInfo,
    RunWhois,
    RunDig,
    ReverseDnsLookup,

    // Decoys (simulated)
    DeployHoneypot,
    CheckHoneypotLogs,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::BlockIpAddress,
        ToolKind::UninstallProgram,
        ToolKind::ChangeSystemSetting,
        ToolKind::RunTraceroute,
        ToolKind::RunPortScan,
        ToolKind::GetDnsInfo,
        ToolKind::RunWhois,
        ToolKind::RunDig,
        ToolKind::ReverseDnsLookup,
        ToolKind::DeployHoneypot,
        ToolKind::CheckHoneypotLogs,
    ];

    pub const CONTAINMENT: [ToolKind; 3] = [
        ToolKind::BlockIpAddress,
        ToolKind::UninstallProgram,
        ToolKind::ChangeSystemSetting,
    ];

    pub const INVESTIGATIVE: [ToolKind; 6] = [
        ToolKind::RunTraceroute,
        ToolKind::RunPortScan,
        ToolKind::GetDnsInfo,
        ToolKind::RunWhois,
        ToolKind::RunDig,
        ToolKind::ReverseDnsLookup,
    ];

    pub const HONEYPOT: [ToolKind; 2] = [ToolKind::DeployHoneypot, ToolKind::CheckHoneypotLogs];

    /// Name advertised to (and matched against) the backend
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::BlockIpAddress => "blockIpAddress",
            ToolKind::UninstallProgram => "uninstallProgram",
            ToolKind::ChangeSystemSetting => "changeSystemSetting",
            ToolKind::RunTraceroute => "runTraceroute",
            ToolKind::RunPortScan => "runPortScan",
            ToolKind::GetDnsInfo => "getDnsInfo",
            ToolKind::RunWhois => "runWhois",
            ToolKind::RunDig => "runDig",
            ToolKind::ReverseDnsLookup => "reverseDnsLookup",
            ToolKind::DeployHoneypot => "deployHoneypot",
            ToolKind::CheckHoneypotLogs => "checkHoneypotLogs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name.trim())
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::BlockIpAddress => {
                "Blocks an IP address in the host firewall (inbound). Requires admin privileges."
            }
            ToolKind::UninstallProgram => {
                "Uninstalls a program or package from the host using its exact name."
            }
            ToolKind::ChangeSystemSetting => {
                "Changes (or reverts) a system setting to the given value. High-risk operation."
            }
            ToolKind::RunTraceroute => "Traces the network route to a host or IP address.",
            ToolKind::RunPortScan => {
                "Runs a fast nmap scan of the most common ports on a host or IP address."
            }
            ToolKind::GetDnsInfo => "Looks up DNS records for a domain with nslookup.",
            ToolKind::RunWhois => {
                "Retrieves WHOIS registration data for a domain or IP address."
            }
            ToolKind::RunDig => "Queries DNS for a domain with dig (optionally a record type).",
            ToolKind::ReverseDnsLookup => "Resolves the host name behind an IP address.",
            ToolKind::DeployHoneypot => {
                "Deploys a simulated decoy service on a port and returns its honeypot id. \
                 The decoy may misdirect attacker tooling."
            }
            ToolKind::CheckHoneypotLogs => {
                "Returns the interaction log of a deployed honeypot, including new activity."
            }
        }
    }

    /// Host-mutating containment action
    pub fn is_mutating(&self) -> bool {
        Self::CONTAINMENT.contains(self)
    }

    pub fn input_schema(&self) -> Value {
        match self {
            ToolKind::BlockIpAddress => object_schema(&[("ip", "The IP address to block.")], &[]),
            ToolKind::UninstallProgram => object_schema(
                &[("programName", "The exact name of the program to uninstall.")],
                &[],
            ),
            ToolKind::ChangeSystemSetting => object_schema(
                &[
                    ("setting", "The setting to change (sysctl key or registry path).",),
                    ("value", "The new value for the setting."),
                ],
                &[],
            ),
            ToolKind::RunTraceroute | ToolKind::RunPortScan => {
                object_schema(&[("host", "Host name or IP address to investigate.")], &[])
            }
            ToolKind::GetDnsInfo => object_schema(&[("domain", "The domain to resolve.")], &[]),
            ToolKind::RunWhois => {
                object_schema(&[("target", "Domain or IP address to look up.")], &[])
            }
            ToolKind::RunDig => object_schema(
                &[("domain", "The domain to query.")],
                &[("recordType", "Optional DNS record type (A, MX, TXT, ...).")],
            ),
            ToolKind::ReverseDnsLookup => {
                object_schema(&[("ip", "The IP address to resolve.")], &[])
            }
            ToolKind::DeployHoneypot => object_schema(
                &[
                    ("port", "The network port to listen on (e.g. \"2222\")."),
                    ("service", "The service to mimic (e.g. \"SSH\", \"HTTP\", \"FTP\")."),
                ],
                &[],
            ),
            ToolKind::CheckHoneypotLogs => {
                object_schema(&[("honeypotId", "The id of the honeypot to check.")], &[])
            }
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn object_schema(required: &[(&str, &str)], optional: &[(&str, &str)]) -> Value {
    let mut properties = serde_json::Map::new();
    for (name, description) in required.iter().chain(optional.iter()) {
        properties.insert(
            name.to_string(),
            json!({ "type": "string", "description": description }),
        );
    }
    let required: Vec<&str> = required.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Tool as advertised to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

// ============================================================================
// INVOCATION RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationStatus {
    /// Tool ran; result holds its output (possibly a failure description)
    Completed,
    /// Unknown/disallowed tool or invalid arguments - nothing was executed
    Rejected,
    /// Command failed without any output
    Failed,
}

/// One tool call executed on behalf of the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub kind: Option<ToolKind>,
    pub arguments: Value,
    pub result: String,
    pub status: InvocationStatus,
}

impl ToolInvocation {
    pub fn is_containment(&self) -> bool {
        self.kind.map_or(false, |k| k.is_mutating())
    }

    /// Primary target argument (ip / program / setting / host ...)
    pub fn target(&self) -> String {
        const KEYS: [&str; 7] = ["ip", "programName", "setting", "host", "domain", "target", "honeypotId"];
        KEYS.iter()
            .find_map(|key| self.arguments.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================================================
// TYPED INPUTS
// ============================================================================

/// Arguments must not be read as command-line options
fn not_an_option(value: &str) -> Result<(), ValidationError> {
    if value.trim_start().starts_with('-') {
        return Err(ValidationError::new("option_like_argument"));
    }
    Ok(())
}

fn is_port(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(()),
        _ => Err(ValidationError::new("invalid_port")),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BlockIpInput {
    #[validate(ip)]
    pub ip: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UninstallInput {
    #[validate(length(min = 1), custom(function = "not_an_option"))]
    pub program_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangeSettingInput {
    #[validate(length(min = 1), custom(function = "not_an_option"))]
    pub setting: String,
    #[validate(length(min = 1))]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HostInput {
    #[validate(length(min = 1, max = 253), custom(function = "not_an_option"))]
    pub host: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DomainInput {
    #[validate(length(min = 1, max = 253), custom(function = "not_an_option"))]
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WhoisInput {
    #[validate(length(min = 1, max = 253), custom(function = "not_an_option"))]
    pub target: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DigInput {
    #[validate(length(min = 1, max = 253), custom(function = "not_an_option"))]
    pub domain: String,
    #[serde(default)]
    #[validate(length(max = 10), custom(function = "not_an_option"))]
    pub record_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReverseDnsInput {
    #[validate(ip)]
    pub ip: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeployHoneypotInput {
    #[validate(custom(function = "is_port"))]
    pub port: String,
    #[validate(length(min = 1, max = 32))]
    pub service: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckHoneypotInput {
    #[validate(length(min = 1))]
    pub honeypot_id: String,
}

/// Validated arguments for one tool call
#[derive(Debug, Clone)]
pub enum ToolInput {
    BlockIp(BlockIpInput),
    Uninstall(UninstallInput),
    ChangeSetting(ChangeSettingInput),
    Traceroute(HostInput),
    PortScan(HostInput),
    DnsInfo(DomainInput),
    Whois(WhoisInput),
    Dig(DigInput),
    ReverseDns(ReverseDnsInput),
    DeployHoneypot(DeployHoneypotInput),
    CheckHoneypot(CheckHoneypotInput),
}

impl ToolInput {
    /// Deserialize + validate. Fails before any command is built.
    pub fn parse(kind: ToolKind, args: &Value) -> VigilResult<Self> {
        Ok(match kind {
            ToolKind::BlockIpAddress => ToolInput::BlockIp(parse_args(kind, args)?),
            ToolKind::UninstallProgram => ToolInput::Uninstall(parse_args(kind, args)?),
            ToolKind::ChangeSystemSetting => ToolInput::ChangeSetting(parse_args(kind, args)?),
            ToolKind::RunTraceroute => ToolInput::Traceroute(parse_args(kind, args)?),
            ToolKind::RunPortScan => ToolInput::PortScan(parse_args(kind, args)?),
            ToolKind::GetDnsInfo => ToolInput::DnsInfo(parse_args(kind, args)?),
            ToolKind::RunWhois => ToolInput::Whois(parse_args(kind, args)?),
            ToolKind::RunDig => ToolInput::Dig(parse_args(kind, args)?),
            ToolKind::ReverseDnsLookup => ToolInput::ReverseDns(parse_args(kind, args)?),
            ToolKind::DeployHoneypot => ToolInput::DeployHoneypot(parse_args(kind, args)?),
            ToolKind::CheckHoneypotLogs => ToolInput::CheckHoneypot(parse_args(kind, args)?),
        })
    }
}

fn parse_args<T>(kind: ToolKind, args: &Value) -> VigilResult<T>
where
    T: DeserializeOwned + Validate,
{
    let input: T = serde_json::from_value(args.clone())
        .map_err(|e| VigilError::Validation(format!("{}: {}", kind.name(), e)))?;
    input
        .validate()
        .map_err(|e| VigilError::Validation(format!("{}: {}", kind.name(), e)))?;
    Ok(input)
}
