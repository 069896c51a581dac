use std::fmt;

use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::class_label::ClassLabel;

/// Phase of class consciousness, from economic awareness to the struggle for hegemony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConsciousnessPhase {
    None,
    Economic,
    Corporative,
    Political,
    Hegemonic,
}

tagged_enum!(ConsciousnessPhase {
    None => "NONE",
    Economic => "ECONOMIC",
    Corporative => "CORPORATIVE",
    Political => "POLITICAL",
    Hegemonic => "HEGEMONIC",
});

/// `(display name, lower bound)`; each band runs up to the next phase's lower bound.
const PHASE_TABLE: [(&str, f64); 5] = [
    ("absent", 0.0),
    ("economic", 0.1),
    ("corporative", 0.3),
    ("political", 0.5),
    ("hegemonic", 0.8),
];

impl ConsciousnessPhase {
    pub fn from_level(level: f64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|p| level >= p.min_level())
            .unwrap_or(ConsciousnessPhase::None)
    }

    pub fn min_level(self) -> f64 {
        PHASE_TABLE[self as usize].1
    }

    /// Exclusive upper bound, except `Hegemonic` which includes 1.0.
    pub fn max_level(self) -> f64 {
        PHASE_TABLE.get(self as usize + 1).map(|p| p.1).unwrap_or(1.0)
    }

    pub fn display_name(self) -> &'static str {
        PHASE_TABLE[self as usize].0
    }
}

impl fmt::Display for ConsciousnessPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One diffusion step from `from_agent` to `to_agent`. Kept for logging, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessSpreadEvent {
    pub from_agent: AgentId,
    pub to_agent: AgentId,
    pub class_label: ClassLabel,
    pub amount: f64,
    pub year: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_level() {
        assert_eq!(ConsciousnessPhase::from_level(0.0), ConsciousnessPhase::None);
        assert_eq!(ConsciousnessPhase::from_level(0.15), ConsciousnessPhase::Economic);
        assert_eq!(ConsciousnessPhase::from_level(0.4), ConsciousnessPhase::Corporative);
        assert_eq!(ConsciousnessPhase::from_level(0.6), ConsciousnessPhase::Political);
        assert_eq!(ConsciousnessPhase::from_level(0.79), ConsciousnessPhase::Political);
        assert_eq!(ConsciousnessPhase::from_level(0.85), ConsciousnessPhase::Hegemonic);
        assert_eq!(ConsciousnessPhase::from_level(1.0), ConsciousnessPhase::Hegemonic);
    }

    #[test]
    fn bands_are_contiguous() {
        for pair in ConsciousnessPhase::ALL.windows(2) {
            assert!((pair[0].max_level() - pair[1].min_level()).abs() < f64::EPSILON);
        }
        assert!((ConsciousnessPhase::Hegemonic.max_level() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_level_is_none() {
        assert_eq!(ConsciousnessPhase::from_level(-0.2), ConsciousnessPhase::None);
    }
}
