//! Tools Module - Closed set of tools the reasoning backend may request
//!
//! Containment tools mutate the host (firewall, packages, settings),
//! investigative tools only read, honeypot tools drive the simulated
//! decoy store.

pub mod command;
pub mod executor;
pub mod templates;
pub mod types;


pub use command::{CommandRunner, LiveRunner, ShellCommand, SimulatedRunner};
pub use executor::{ToolExecutor, Toolbox};
pub use types::{InvocationStatus, ToolDefinition, ToolInput, ToolInvocation, ToolKind};
