//! Threat level policy - how the final `threat_level` is decided

use super::types::ThreatLevel;

/// Evidence the policy may weigh against the model's assessment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileEvidence {
    pub indicator_count: usize,
    pub containment_actions: usize,
}

pub trait ThreatLevelPolicy: Send + Sync {
    fn assess(&self, model_level: ThreatLevel, evidence: &ProfileEvidence) -> ThreatLevel;

    fn name(&self) -> &'static str;
}

/// Opaque pass-through of the model's level
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelAssessed;

impl ThreatLevelPolicy for ModelAssessed {
    fn assess(&self, model_level: ThreatLevel, _evidence: &ProfileEvidence) -> ThreatLevel {
        model_level
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Never below what the evidence volume implies
#[derive(Debug, Clone, Copy)]
pub struct EvidenceFloor {
    pub high_at: usize,
    pub critical_at: usize,
}

impl Default for EvidenceFloor {
    fn default() -> Self {
        Self {
            high_at: 5,
            critical_at: 10,
        }
    }
}

impl ThreatLevelPolicy for EvidenceFloor {
    fn assess(&self, model_level: ThreatLevel, evidence: &ProfileEvidence) -> ThreatLevel {
        let floor = if evidence.indicator_count >= self.critical_at && evidence.containment_actions > 0 {
            ThreatLevel::Critical
        } else if evidence.indicator_count >= self.high_at {
            ThreatLevel::High
        } else {
            ThreatLevel::Low
        };
        model_level.max(floor)
    }

    fn name(&self) -> &'static str {
        "evidence-floor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(indicator_count: usize, containment_actions: usize) -> ProfileEvidence {
        ProfileEvidence {
            indicator_count,
            containment_actions,
        }
    }

    #[test]
    fn test_model_assessed_passes_through() {
        assert_eq!(ModelAssessed.assess(ThreatLevel::Low, &evidence(50, 3)), ThreatLevel::Low);
    }

    #[test]
    fn test_evidence_floor() {
        let policy = EvidenceFloor::default();
        assert_eq!(policy.assess(ThreatLevel::Low, &evidence(2, 0)), ThreatLevel::Low);
        assert_eq!(policy.assess(ThreatLevel::Medium, &evidence(5, 0)), ThreatLevel::High);
        assert_eq!(policy.assess(ThreatLevel::Low, &evidence(12, 0)), ThreatLevel::High);
        assert_eq!(policy.assess(ThreatLevel::Low, &evidence(12, 1)), ThreatLevel::Critical);
        // Never lowers the model's level
        assert_eq!(policy.assess(ThreatLevel::Critical, &evidence(0, 0)), ThreatLevel::Critical);
    }
}
