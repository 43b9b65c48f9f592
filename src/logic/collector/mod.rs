//! Collector Module - System snapshot acquisition
//!
//! Four independent reads (processes, network, discovered services, logs)
//! gathered concurrently, each under its own timeout.

pub mod host;
pub mod snapshot;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

pub use host::HostCollector;
pub use snapshot::{SystemSnapshot, BINARIES_NOT_COLLECTED};

/// Opaque text producers. Implementations report failures as text.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn processes(&self) -> String;
    async fn network_connections(&self) -> String;
    async fn discovered_services(&self) -> String;
    async fn logs(&self) -> String;
}

/// Gather one snapshot. A read that overruns `timeout` becomes a "no data" line.
pub async fn collect_snapshot(source: &dyn SnapshotSource, timeout: Duration) -> SystemSnapshot {
    let (processes, network, services, logs) = tokio::join!(
        bounded("process list", timeout, source.processes()),
        bounded("network connections", timeout, source.network_connections()),
        bounded("discovered services", timeout, source.discovered_services()),
        bounded("system logs", timeout, source.logs()),
    );

    log::debug!(
        "Snapshot collected: {} process bytes, {} network bytes, {} service bytes, {} log bytes",
        processes.len(),
        network.len(),
        services.len(),
        logs.len()
    );

    SystemSnapshot::new(processes, logs)
        .with_network_connections(network)
        .with_discovered_services(services)
}

async fn bounded<F>(what: &str, timeout: Duration, read: F) -> String
where
    F: Future<Output = String>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(text) => text,
        Err(_) => {
            log::warn!("Collector read '{}' timed out after {:?}", what, timeout);
            format!("No data: {} collection timed out after {} seconds.", what, timeout.as_secs())
        }
    }
}
