//! Attacker profile types

use serde::{Deserialize, Serialize};

use crate::logic::agent::lenient;

/// Ordinal threat level; `Ord` follows severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThreatLevel::Low => "Low",
            ThreatLevel::Medium => "Medium",
            ThreatLevel::High => "High",
            ThreatLevel::Critical => "Critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackerProfile {
    pub threat_level: ThreatLevel,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub techniques: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub motives: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub indicators_of_compromise: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
}

/// Backend payload: `{"attackerProfile": {...}}` or the bare profile
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileEnvelope {
    Wrapped {
        #[serde(rename = "attackerProfile")]
        attacker_profile: AttackerProfile,
    },
    Bare(AttackerProfile),
}

impl ProfileEnvelope {
    pub fn into_profile(self) -> AttackerProfile {
        match self {
            ProfileEnvelope::Wrapped { attacker_profile } => attacker_profile,
            ProfileEnvelope::Bare(profile) => profile,
        }
    }
}

/// Inputs of the profile stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    /// Verdict rationale, passed through unchanged
    pub incident_data: String,
    pub logs: String,
    pub descriptors: String,
    pub system_states: String,
    /// Containment actions executed for this incident; weighs on the level
    #[serde(skip)]
    pub containment_actions: usize,
}

impl ProfileRequest {
    pub(crate) fn corpus(&self) -> String {
        [
            self.incident_data.as_str(),
            self.logs.as_str(),
            self.descriptors.as_str(),
            self.system_states.as_str(),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_threat_level_order() {
        assert!(ThreatLevel::Critical > ThreatLevel::High);
        assert!(ThreatLevel::Medium > ThreatLevel::Low);
        assert_eq!(ThreatLevel::High.to_string(), "High");
    }

    #[test]
    fn test_wrapped_and_bare_payloads() {
        let body = json!({
            "threatLevel": "high",
            "techniques": "T1071 Application Layer Protocol",
            "motives": ["financial"],
            "indicatorsOfCompromise": ["198.51.100.24"],
            "summary": "Commodity RAT operator"
        });

        let bare: ProfileEnvelope = serde_json::from_value(body.clone()).unwrap();
        let wrapped: ProfileEnvelope = serde_json::from_value(json!({ "attackerProfile": body })).unwrap();

        let a = bare.into_profile();
        let b = wrapped.into_profile();
        assert_eq!(a, b);
        assert_eq!(a.threat_level, ThreatLevel::High);
        assert_eq!(a.techniques, vec!["T1071 Application Layer Protocol".to_string()]);
    }

    #[test]
    fn test_unknown_threat_level_rejected() {
        let result = serde_json::from_value::<ProfileEnvelope>(json!({
            "threatLevel": "Apocalyptic",
            "summary": "x"
        }));
        assert!(result.is_err());
    }
}
