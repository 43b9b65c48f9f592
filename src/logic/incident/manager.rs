//! Incident Board - append-only record of what the pipeline found and did
//!
//! Owned by the scan loop. Benign runs leave no trace; malicious runs add
//! one incident, one threat and a critical notification.

use chrono::Utc;
use uuid::Uuid;

use super::types::{Incident, Notification, NotificationLevel, Threat, ThreatStatus};
use crate::logic::pipeline::{Disposition, PipelineError, PipelineOutcome, INCIDENT_TITLE};
use crate::logic::profile::ThreatLevel;

/// Characters of the rationale kept in incident descriptions
const DESCRIPTION_CHARS: usize = 100;

#[derive(Debug, Default)]
pub struct IncidentBoard {
    incidents: Vec<Incident>,
    threats: Vec<Threat>,
    notifications: Vec<Notification>,
}

impl IncidentBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the incident raised, if any
    pub fn record_outcome(&mut self, outcome: &PipelineOutcome) -> Option<&Incident> {
        let verdict = &outcome.verdict;
        let (details, attacker_summary, severity, status) = match &outcome.disposition {
            Disposition::Benign => return None,
            Disposition::Handled { response, profile } => {
                let recommended = if verdict.recommended_actions.trim().is_empty() {
                    response.summary.as_str()
                } else {
                    verdict.recommended_actions.as_str()
                };
                let status = if response.containment_count() > 0 {
                    ThreatStatus::Contained
                } else {
                    ThreatStatus::ActionRecommended
                };
                (
                    format!("Recommended Action: {}", recommended),
                    Some(profile.summary.clone()),
                    profile.threat_level,
                    status,
                )
            }
            Disposition::AwaitingConfirmation { user_query, .. } => (
                format!("Awaiting confirmation: {}", user_query),
                verdict.attacker_profile_summary().map(str::to_string),
                ThreatLevel::High,
                ThreatStatus::AwaitingConfirmation,
            ),
        };

        let now = Utc::now();
        let description = excerpt(&verdict.reasoning);

        self.threats.push(Threat {
            id: threat_id(outcome.run_id),
            run_id: outcome.run_id,
            description: description.clone(),
            severity,
            status,
            timestamp: now,
        });
        self.notifications.push(Notification {
            level: NotificationLevel::Critical,
            title: "Anomaly Detected!".to_string(),
            description: description.clone(),
            time: now,
        });
        self.incidents.push(Incident {
            id: Uuid::new_v4(),
            run_id: outcome.run_id,
            time: now,
            title: INCIDENT_TITLE.to_string(),
            description,
            details,
            is_malicious: true,
            attacker_summary,
        });

        log::info!("Incident recorded for run {} ({:?}, {})", outcome.run_id, status, severity);
        self.incidents.last()
    }

    /// A confirmed approval: the run's threat moves to its new state and an
    /// info notification is added
    pub fn record_confirmation(&mut self, outcome: &PipelineOutcome) {
        let Disposition::Handled { response, profile } = &outcome.disposition else {
            return;
        };
        let now = Utc::now();
        let status = if response.containment_count() > 0 {
            ThreatStatus::Contained
        } else {
            ThreatStatus::ActionRecommended
        };

        match self.threats.iter_mut().find(|t| t.run_id == outcome.run_id) {
            Some(threat) => {
                threat.severity = profile.threat_level;
                threat.status = status;
                threat.timestamp = now;
            }
            None => self.threats.push(Threat {
                id: threat_id(outcome.run_id),
                run_id: outcome.run_id,
                description: excerpt(&outcome.verdict.reasoning),
                severity: profile.threat_level,
                status,
                timestamp: now,
            }),
        }
        self.notifications.push(Notification {
            level: NotificationLevel::Info,
            title: "Response Executed".to_string(),
            description: response.summary.clone(),
            time: now,
        });
    }

    pub fn record_failure(&mut self, error: &PipelineError) {
        self.notifications.push(Notification {
            level: NotificationLevel::Error,
            title: "Scan Failed".to_string(),
            description: format!("{} stage failed ({}): {}", error.stage, error.error.kind(), error.error),
            time: Utc::now(),
        });
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Newest first
    pub fn recent_incidents(&self, n: usize) -> Vec<&Incident> {
        self.incidents.iter().rev().take(n).collect()
    }

    /// Newest first
    pub fn recent_threats(&self, n: usize) -> Vec<&Threat> {
        self.threats.iter().rev().take(n).collect()
    }

    /// Recent incidents as text for the policy stage
    pub fn digest(&self, n: usize) -> String {
        self.recent_incidents(n)
            .iter()
            .map(|i| {
                let mut line = format!(
                    "- [{}] {}: {} | {}",
                    i.time.format("%Y-%m-%d %H:%M:%S"),
                    i.title,
                    i.description,
                    i.details
                );
                if let Some(attacker) = &i.attacker_summary {
                    line.push_str(&format!(" | Attacker: {}", attacker));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn threat_id(run_id: Uuid) -> String {
    let simple = run_id.simple().to_string();
    format!("THREAT-{}", &simple[..8])
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_CHARS).collect();
    format!("{}...", cut)
}
