use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type AgentId = u64;

const DEFAULT_INTELLIGENCE: u8 = 10;

/// Economic and social facts about one living agent, supplied each year by the
/// ownership, demography, NPC and culture collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFacts {
    pub owns_land: bool,
    pub owns_tools: bool,
    pub owns_livestock: bool,
    pub works_for_others: bool,
    pub is_elder: bool,
    pub is_chief: bool,
    pub wealth: f64,
    /// Value of the means of production the agent owns.
    pub property: f64,
    pub intelligence: u8,
    /// Social ties keyed by the other agent, with relationship strength 0.0–1.0.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ties: BTreeMap<AgentId, f64>,
    /// Belief ids held by the agent (from the culture collaborator).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub beliefs: Vec<String>,
}

impl Default for AgentFacts {
    fn default() -> Self {
        Self {
            owns_land: false,
            owns_tools: false,
            owns_livestock: false,
            works_for_others: false,
            is_elder: false,
            is_chief: false,
            wealth: 0.0,
            property: 0.0,
            intelligence: DEFAULT_INTELLIGENCE,
            ties: BTreeMap::new(),
            beliefs: Vec::new(),
        }
    }
}

impl AgentFacts {
    pub fn landowner(wealth: f64) -> Self {
        Self {
            owns_land: true,
            wealth,
            property: wealth,
            ..Self::default()
        }
    }

    pub fn craftsman(wealth: f64) -> Self {
        Self {
            owns_tools: true,
            wealth,
            property: wealth * 0.5,
            ..Self::default()
        }
    }

    pub fn laborer(wealth: f64) -> Self {
        Self {
            works_for_others: true,
            wealth,
            ..Self::default()
        }
    }

    pub fn landless(wealth: f64) -> Self {
        Self {
            wealth,
            ..Self::default()
        }
    }

    pub fn owns_means_of_production(&self) -> bool {
        self.owns_land || self.owns_tools || self.owns_livestock
    }

    pub fn social_connections(&self) -> u32 {
        self.ties.len() as u32
    }

    pub fn tie_strength(&self, other: AgentId) -> Option<f64> {
        self.ties.get(&other).copied()
    }
}
