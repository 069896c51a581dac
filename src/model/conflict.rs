use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::class_label::ClassLabel;

// --- Constants ---

const GRIEVANCE_INTENSITY: f64 = 0.05;
const LEADER_ORGANIZATION: f64 = 0.1;
const VIOLENCE_ESCALATION_RATE: f64 = 0.5;
const VIOLENCE_DECAY_RATE: f64 = 0.3;
/// Below this intensity a de-escalating conflict winds down into `Resolving`.
const RESOLVING_INTENSITY: f64 = 0.3;
const REBELLION_INTENSITY: f64 = 0.9;
const REBELLION_ORGANIZATION: f64 = 0.7;
const UPRISING_INTENSITY: f64 = 0.7;
const RIOT_INTENSITY: f64 = 0.5;
const MAX_PRODUCTION_LOSS: f64 = 0.5;

// --- ConflictType ---

/// Form the struggle takes, ordered from peaceful to revolutionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConflictType {
    Strike,
    Riot,
    Uprising,
    Rebellion,
}

tagged_enum!(ConflictType {
    Strike => "STRIKE",
    Riot => "RIOT",
    Uprising => "UPRISING",
    Rebellion => "REBELLION",
});

/// `(display name, violence level, description)`, indexed by variant.
const CONFLICT_TYPE_TABLE: [(&str, f64, &str); 4] = [
    ("strike", 0.2, "refusal to work"),
    ("riot", 0.5, "spontaneous revolt"),
    ("uprising", 0.7, "organized revolt"),
    ("rebellion", 0.9, "attempt to overturn the social order"),
];

impl ConflictType {
    pub fn display_name(self) -> &'static str {
        CONFLICT_TYPE_TABLE[self as usize].0
    }

    pub fn violence_level(self) -> f64 {
        CONFLICT_TYPE_TABLE[self as usize].1
    }

    pub fn description(self) -> &'static str {
        CONFLICT_TYPE_TABLE[self as usize].2
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// --- ConflictStage ---

/// Stage of a conflict. The first five are derived from intensity bands; `Resolving` and
/// `Resolved` are only ever entered explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConflictStage {
    Brewing,
    Latent,
    Active,
    Escalating,
    Crisis,
    Resolving,
    Resolved,
}

tagged_enum!(ConflictStage {
    Brewing => "BREWING",
    Latent => "LATENT",
    Active => "ACTIVE",
    Escalating => "ESCALATING",
    Crisis => "CRISIS",
    Resolving => "RESOLVING",
    Resolved => "RESOLVED",
});

/// `(display name, intensity band)`. Explicit stages have no band.
const STAGE_TABLE: [(&str, Option<(f64, f64)>); 7] = [
    ("brewing", Some((0.0, 0.3))),
    ("latent", Some((0.3, 0.5))),
    ("active", Some((0.5, 0.7))),
    ("escalating", Some((0.7, 0.9))),
    ("crisis", Some((0.9, 1.0))),
    ("resolving", None),
    ("resolved", None),
];

impl ConflictStage {
    /// Derive the banded stage for an intensity. Never returns an explicit stage.
    pub fn from_intensity(intensity: f64) -> Self {
        [
            ConflictStage::Crisis,
            ConflictStage::Escalating,
            ConflictStage::Active,
            ConflictStage::Latent,
        ]
        .into_iter()
        .find(|s| s.band().is_some_and(|(min, _)| intensity >= min))
        .unwrap_or(ConflictStage::Brewing)
    }

    /// `[min, max)` intensity band (`Crisis` includes 1.0), or `None` for explicit stages.
    pub fn band(self) -> Option<(f64, f64)> {
        STAGE_TABLE[self as usize].1
    }

    pub fn is_explicit(self) -> bool {
        self.band().is_none()
    }

    pub fn display_name(self) -> &'static str {
        STAGE_TABLE[self as usize].0
    }
}

impl fmt::Display for ConflictStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// --- ConflictOutcome ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConflictOutcome {
    Revolution,
    SubordinateVictory,
    DominantVictory,
    Suppressed,
    Compromise,
    Transformation,
}

tagged_enum!(ConflictOutcome {
    Revolution => "REVOLUTION",
    SubordinateVictory => "SUBORDINATE_VICTORY",
    DominantVictory => "DOMINANT_VICTORY",
    Suppressed => "SUPPRESSED",
    Compromise => "COMPROMISE",
    Transformation => "TRANSFORMATION",
});

/// `(display name, consciousness change, property redistribution fraction)`.
const OUTCOME_TABLE: [(&str, f64, f64); 6] = [
    ("revolution", 0.5, 0.5),
    ("victory of the oppressed", 0.3, 0.3),
    ("victory of the rulers", -0.1, 0.0),
    ("suppressed", -0.3, 0.0),
    ("compromise", 0.1, 0.1),
    ("transformation", 0.2, 0.2),
];

impl ConflictOutcome {
    pub fn display_name(self) -> &'static str {
        OUTCOME_TABLE[self as usize].0
    }

    /// Change applied to the oppressed class's consciousness.
    pub fn consciousness_change(self) -> f64 {
        OUTCOME_TABLE[self as usize].1
    }

    /// Fraction of ruling-class property handed to the oppressed side.
    pub fn property_redistribution(self) -> f64 {
        OUTCOME_TABLE[self as usize].2
    }

    /// Whether the oppressed side came out ahead.
    pub fn favors_oppressed(self) -> bool {
        matches!(
            self,
            ConflictOutcome::Revolution
                | ConflictOutcome::SubordinateVictory
                | ConflictOutcome::Transformation
        )
    }
}

impl fmt::Display for ConflictOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// --- ClassConflict ---

/// A conflict between an oppressed and a ruling class.
///
/// Created by `ClassSystem` when tension crosses its threshold, ticked every day while
/// active, and retained after resolution for history and saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConflict {
    pub id: String,
    pub conflict_type: ConflictType,
    pub oppressed_class: ClassLabel,
    pub ruling_class: ClassLabel,
    pub stage: ConflictStage,
    pub intensity: f64,
    pub violence_level: f64,
    pub organization_level: f64,
    pub participants: BTreeMap<AgentId, ClassLabel>,
    pub leaders: BTreeSet<AgentId>,
    /// Agents mobilized by the ruling class to put the conflict down.
    pub suppression_forces: BTreeSet<AgentId>,
    pub primary_cause: String,
    pub grievances: Vec<String>,
    pub demands: Vec<String>,
    pub year_started: u32,
    pub days_active: u32,
    pub year_resolved: Option<u32>,
    /// Share of production lost to the conflict, 0.0–0.5.
    pub production_loss: f64,
    pub resolved: bool,
    pub outcome: Option<ConflictOutcome>,
}

impl ClassConflict {
    pub fn new(
        id: String,
        conflict_type: ConflictType,
        oppressed_class: ClassLabel,
        ruling_class: ClassLabel,
        intensity: f64,
        year_started: u32,
    ) -> Self {
        let intensity = intensity.clamp(0.0, 1.0);
        Self {
            id,
            conflict_type,
            oppressed_class,
            ruling_class,
            stage: ConflictStage::from_intensity(intensity),
            intensity,
            violence_level: 0.0,
            organization_level: 0.0,
            participants: BTreeMap::new(),
            leaders: BTreeSet::new(),
            suppression_forces: BTreeSet::new(),
            primary_cause: String::new(),
            grievances: Vec::new(),
            demands: Vec::new(),
            year_started,
            days_active: 0,
            year_resolved: None,
            production_loss: 0.0,
            resolved: false,
            outcome: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.resolved
    }

    /// Stage implied by the current intensity, unless an explicit stage is already set.
    pub fn derived_stage(&self) -> ConflictStage {
        if self.resolved {
            ConflictStage::Resolved
        } else if self.stage.is_explicit() {
            self.stage
        } else {
            ConflictStage::from_intensity(self.intensity)
        }
    }

    /// Re-derive the stage from intensity. Returns true if it changed.
    fn refresh_stage(&mut self) -> bool {
        let new_stage = self.derived_stage();
        let changed = new_stage != self.stage;
        self.stage = new_stage;
        changed
    }

    pub fn add_participant(&mut self, agent: AgentId, label: ClassLabel) {
        self.participants.insert(agent, label);
    }

    pub fn add_leader(&mut self, agent: AgentId) -> bool {
        if !self.leaders.insert(agent) {
            return false;
        }
        self.organization_level = (self.organization_level + LEADER_ORGANIZATION).min(1.0);
        true
    }

    pub fn add_suppression_force(&mut self, agent: AgentId) -> bool {
        self.suppression_forces.insert(agent)
    }

    /// Grievances accumulate tension: each new one raises intensity.
    pub fn add_grievance(&mut self, grievance: &str) -> bool {
        if self.grievances.iter().any(|g| g == grievance) {
            return false;
        }
        self.grievances.push(grievance.to_string());
        self.intensity = (self.intensity + GRIEVANCE_INTENSITY).min(1.0);
        self.refresh_stage();
        true
    }

    pub fn add_demand(&mut self, demand: &str) -> bool {
        if self.demands.iter().any(|d| d == demand) {
            return false;
        }
        self.demands.push(demand.to_string());
        true
    }

    /// Raise intensity by `delta`. Violence follows toward the conflict type's level.
    /// Returns true if the stage changed.
    pub fn escalate(&mut self, delta: f64) -> bool {
        self.intensity = (self.intensity + delta).clamp(0.0, 1.0);
        let target = self.conflict_type.violence_level();
        if self.violence_level < target {
            self.violence_level =
                (self.violence_level + delta * VIOLENCE_ESCALATION_RATE).min(target);
        }
        self.refresh_stage()
    }

    /// Lower intensity by `delta`. Once intensity falls below the resolving threshold the
    /// conflict winds down into `Resolving`. Returns true if the stage changed.
    pub fn de_escalate(&mut self, delta: f64) -> bool {
        self.intensity = (self.intensity - delta).clamp(0.0, 1.0);
        self.violence_level = (self.violence_level - delta * VIOLENCE_DECAY_RATE).max(0.0);

        if self.intensity < RESOLVING_INTENSITY && !self.stage.is_explicit() {
            self.stage = ConflictStage::Resolving;
            return true;
        }
        self.refresh_stage()
    }

    /// Upgrade the conflict type from intensity and organization. Never downgrades.
    pub fn update_conflict_type(&mut self) -> bool {
        let candidate = if self.intensity >= REBELLION_INTENSITY
            && self.organization_level >= REBELLION_ORGANIZATION
        {
            ConflictType::Rebellion
        } else if self.intensity >= UPRISING_INTENSITY {
            ConflictType::Uprising
        } else if self.intensity >= RIOT_INTENSITY {
            ConflictType::Riot
        } else {
            ConflictType::Strike
        };

        if candidate > self.conflict_type {
            self.conflict_type = candidate;
            true
        } else {
            false
        }
    }

    pub fn add_production_loss(&mut self, delta: f64) {
        self.production_loss = (self.production_loss + delta).clamp(0.0, MAX_PRODUCTION_LOSS);
    }

    /// Number of participants on the oppressed side.
    pub fn get_oppressed_strength(&self) -> f64 {
        self.count_side(self.oppressed_class) as f64
    }

    /// Number of participants on the ruling side.
    pub fn get_ruling_strength(&self) -> f64 {
        self.count_side(self.ruling_class) as f64
    }

    fn count_side(&self, label: ClassLabel) -> usize {
        self.participants.values().filter(|&&l| l == label).count()
    }

    /// Mark the conflict resolved. A second call is a no-op and returns false.
    pub fn resolve(&mut self, outcome: ConflictOutcome, year: u32) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.outcome = Some(outcome);
        self.year_resolved = Some(year);
        self.stage = ConflictStage::Resolved;
        true
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} vs {} ({}, intensity {:.0}%)",
            self.conflict_type,
            self.oppressed_class,
            self.ruling_class,
            self.stage,
            self.intensity * 100.0
        )
    }
}
