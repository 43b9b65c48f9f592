//! Honeypot Store - Simulated decoy services
//!
//! Explicitly owned, append-only interaction logs keyed by honeypot id.
//! Injected (as `Arc<HoneypotStore>`) into the tool executor.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

const ATTACKER_POOL: [&str; 3] = ["91.241.19.140", "103.77.108.212", "45.148.10.134"];

const INTERACTION_POOL: [&str; 5] = [
    "ls -la",
    "cat /etc/passwd",
    "uname -a",
    "whoami",
    "nmap -sV localhost",
];

const MISDIRECTION_DETAILS: &str = "Deployed a perturbed network response designed to make the \
    attacker's scanner misclassify this benign server as a critical industrial control system (ICS).";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyAction {
    AllowAndLog,
    DivertToDecoy,
    Block,
    MisdirectWithAdversarialPayload,
}

impl DecoyAction {
    const ALL: [DecoyAction; 4] = [
        DecoyAction::AllowAndLog,
        DecoyAction::DivertToDecoy,
        DecoyAction::Block,
        DecoyAction::MisdirectWithAdversarialPayload,
    ];

    /// Credential probing is diverted, scanning is misdirected
    fn for_interaction(interaction: &str, fallback: DecoyAction) -> DecoyAction {
        if interaction.contains("passwd") || interaction.contains("shadow") {
            DecoyAction::DivertToDecoy
        } else if interaction.contains("nmap") {
            DecoyAction::MisdirectWithAdversarialPayload
        } else {
            fallback
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoneypotLogEntry {
    pub honeypot_id: String,
    pub attacker_ip: String,
    pub interaction: String,
    pub action_taken: DecoyAction,
    pub service: String,
    pub port: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotDeployment {
    pub honeypot_id: String,
    pub status: String,
}

// ============================================================================
// STORE
// ============================================================================

struct StoreInner {
    logs: HashMap<String, Vec<HoneypotLogEntry>>,
    /// Ids are never reused, even across services
    next_id: u64,
    rng: StdRng,
}

pub struct HoneypotStore {
    inner: Mutex<StoreInner>,
}

impl Default for HoneypotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HoneypotStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic simulation (tests, replays)
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                logs: HashMap::new(),
                next_id: 1,
                rng,
            }),
        }
    }

    /// Create a decoy and record its first interaction
    pub fn deploy(&self, port: &str, service: &str) -> HoneypotDeployment {
        let mut inner = self.inner.lock();

        let honeypot_id = format!("honeypot-{}-{}-{}", service.to_lowercase(), port, inner.next_id);
        inner.next_id += 1;

        let entry = simulate_entry(&mut inner.rng, &honeypot_id, port, service);
        inner.logs.insert(honeypot_id.clone(), vec![entry]);

        log::info!("Deployed {} honeypot on port {} ({})", service, port, honeypot_id);

        HoneypotDeployment {
            status: format!(
                "Successfully deployed {} honeypot on port {}. ID: {}",
                service, port, honeypot_id
            ),
            honeypot_id,
        }
    }

    /// Append the activity seen since the last check, then return the full log.
    /// Unknown ids yield an empty log.
    pub fn check(&self, honeypot_id: &str) -> Vec<HoneypotLogEntry> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(log) = inner.logs.get_mut(honeypot_id) else {
            return Vec::new();
        };

        if let Some(first) = log.first() {
            let (port, service) = (first.port.clone(), first.service.clone());
            let entry = simulate_entry(&mut inner.rng, honeypot_id, &port, &service);
            log.push(entry);
        }

        log.clone()
    }

    /// Read the log without simulating new activity
    pub fn get(&self, honeypot_id: &str) -> Option<Vec<HoneypotLogEntry>> {
        self.inner.lock().logs.get(honeypot_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock().logs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn simulate_entry(rng: &mut StdRng, honeypot_id: &str, port: &str, service: &str) -> HoneypotLogEntry {
    let attacker_ip = ATTACKER_POOL.choose(rng).copied().unwrap_or(ATTACKER_POOL[0]);
    let interaction = INTERACTION_POOL.choose(rng).copied().unwrap_or(INTERACTION_POOL[0]);
    let fallback = DecoyAction::ALL.choose(rng).copied().unwrap_or(DecoyAction::AllowAndLog);
    let action_taken = DecoyAction::for_interaction(interaction, fallback);

    HoneypotLogEntry {
        honeypot_id: honeypot_id.to_string(),
        attacker_ip: attacker_ip.to_string(),
        interaction: interaction.to_string(),
        action_taken,
        service: service.to_string(),
        port: port.to_string(),
        timestamp: Utc::now(),
        details: (action_taken == DecoyAction::MisdirectWithAdversarialPayload)
            .then(|| MISDIRECTION_DETAILS.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_creates_initial_entry() {
        let store = HoneypotStore::with_seed(7);
        let deployment = store.deploy("2222", "SSH");

        assert!(deployment.honeypot_id.starts_with("honeypot-ssh-2222-"));
        assert!(deployment.status.contains("Successfully deployed SSH honeypot"));

        let log = store.get(&deployment.honeypot_id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].port, "2222");
    }

    #[test]
    fn test_check_is_append_only_and_prefix_stable() {
        let store = HoneypotStore::with_seed(42);
        let id = store.deploy("8080", "HTTP").honeypot_id;

        let first = store.check(&id);
        let second = store.check(&id);

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert_eq!(&second[..first.len()], &first[..]);
    }

    #[test]
    fn test_repeated_deploys_get_distinct_ids() {
        let store = HoneypotStore::with_seed(3);
        let ids: std::collections::HashSet<String> =
            (0..1500).map(|_| store.deploy("22", "ssh").honeypot_id).collect();

        assert_eq!(ids.len(), 1500);
        assert_eq!(store.ids().len(), 1500);
        assert_eq!(store.check("honeypot-ssh-22-1500").len(), 2);
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let store = HoneypotStore::with_seed(1);
        assert!(store.check("honeypot-none-0-0").is_empty());
        assert!(store.get("honeypot-none-0-0").is_none());
    }

    #[test]
    fn test_interaction_rules() {
        assert_eq!(
            DecoyAction::for_interaction("cat /etc/passwd", DecoyAction::Block),
            DecoyAction::DivertToDecoy
        );
        assert_eq!(
            DecoyAction::for_interaction("nmap -sV localhost", DecoyAction::Block),
            DecoyAction::MisdirectWithAdversarialPayload
        );
        assert_eq!(DecoyAction::for_interaction("whoami", DecoyAction::Block), DecoyAction::Block);
    }

    #[test]
    fn test_misdirection_carries_details() {
        let store = HoneypotStore::with_seed(3);
        let id = store.deploy("21", "FTP").honeypot_id;
        for _ in 0..20 {
            store.check(&id);
        }
        for entry in store.get(&id).unwrap() {
            let misdirected = entry.action_taken == DecoyAction::MisdirectWithAdversarialPayload;
            assert_eq!(misdirected, entry.details.is_some());
        }
    }
}
