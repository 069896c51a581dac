use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::model::{ClassConflict, ClassLabel, ConflictOutcome, ConflictStage};

use super::class_system::ClassSystem;

// --- Force ratio ---
const LEADER_STRENGTH_BONUS: f64 = 0.2;
const SUPPRESSION_STRENGTH_BONUS: f64 = 0.3;
const WEALTH_NORMALIZATION: f64 = 1000.0;
const MIN_SIDE_STRENGTH: f64 = 0.1;

// --- Outcome selection ---
const MIN_DAYS_BEFORE_RESOLUTION: u32 = 30;
const RATIO_JITTER_MIN: f64 = 0.8;
const RATIO_JITTER_MAX: f64 = 1.2;
/// Descending `(exclusive lower bound on adjusted ratio, outcome)`; below the last is suppression.
const OUTCOME_THRESHOLDS: [(f64, ConflictOutcome); 5] = [
    (3.0, ConflictOutcome::Revolution),
    (2.0, ConflictOutcome::SubordinateVictory),
    (1.5, ConflictOutcome::Transformation),
    (0.8, ConflictOutcome::Compromise),
    (0.5, ConflictOutcome::DominantVictory),
];

// --- Outcome effects ---
const REVOLUTION_RULING_POWER_FACTOR: f64 = 0.1;
const VICTORY_OPPRESSED_POWER: f64 = 0.3;
const VICTORY_RULING_POWER: f64 = -0.2;
const TRANSFORMATION_OPPRESSED_POWER: f64 = 0.15;
const TRANSFORMATION_RULING_POWER: f64 = -0.1;
const TRANSFORMATION_RELATIONS: f64 = 0.2;
const COMPROMISE_RELATIONS: f64 = 0.1;
const DOMINANT_RULING_POWER: f64 = 0.1;
const SUPPRESSION_CONSCIOUSNESS_FACTOR: f64 = 0.5;
const SUPPRESSION_RULING_POWER: f64 = 0.2;

/// One resolution decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub conflict_id: String,
    pub outcome: ConflictOutcome,
    pub year: u32,
    pub force_ratio: f64,
}

/// Decides how mature conflicts end and applies the consequences to the classes involved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictResolver {
    pub resolution_history: Vec<ResolutionRecord>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oppressed strength over ruling strength. Above 1.0 favors the oppressed.
    pub fn calculate_force_ratio(conflict: &ClassConflict, class_system: &ClassSystem) -> f64 {
        let oppressed = class_system.class(conflict.oppressed_class);
        let ruling = class_system.class(conflict.ruling_class);

        let consciousness = oppressed.map_or(0.0, |c| c.class_consciousness);
        let oppressed_strength = conflict.get_oppressed_strength()
            * (1.0 + consciousness)
            * (1.0 + conflict.organization_level)
            * (1.0 + LEADER_STRENGTH_BONUS * conflict.leaders.len() as f64);

        let power = ruling.map_or(0.0, |c| c.political_power);
        let wealth = ruling.map_or(0.0, |c| (c.avg_wealth / WEALTH_NORMALIZATION).clamp(0.0, 1.0));
        let ruling_strength = conflict.get_ruling_strength()
            * (1.0 + power)
            * (1.0 + wealth)
            * (1.0 + SUPPRESSION_STRENGTH_BONUS * conflict.suppression_forces.len() as f64);

        oppressed_strength.max(MIN_SIDE_STRENGTH) / ruling_strength.max(MIN_SIDE_STRENGTH)
    }

    /// Pick an outcome for a mature conflict, or `None` if it is not ready.
    pub fn attempt_resolution(
        &mut self,
        conflict: &ClassConflict,
        class_system: &ClassSystem,
        year: u32,
        rng: &mut dyn RngCore,
    ) -> Option<ConflictOutcome> {
        if conflict.resolved
            || conflict.days_active < MIN_DAYS_BEFORE_RESOLUTION
            || conflict.stage < ConflictStage::Active
        {
            return None;
        }

        let force_ratio = Self::calculate_force_ratio(conflict, class_system);
        let adjusted = force_ratio * rng.random_range(RATIO_JITTER_MIN..RATIO_JITTER_MAX);
        let outcome = OUTCOME_THRESHOLDS
            .iter()
            .find(|(threshold, _)| adjusted > *threshold)
            .map_or(ConflictOutcome::Suppressed, |&(_, outcome)| outcome);

        self.resolution_history.push(ResolutionRecord {
            conflict_id: conflict.id.clone(),
            outcome,
            year,
            force_ratio,
        });
        Some(outcome)
    }

    /// Resolve `conflict` with `outcome` and apply its consequences. Returns log lines, or
    /// nothing if the conflict was already resolved.
    pub fn apply_outcome(
        &self,
        conflict: &mut ClassConflict,
        outcome: ConflictOutcome,
        class_system: &mut ClassSystem,
        year: u32,
    ) -> Vec<String> {
        if !conflict.resolve(outcome, year) {
            return Vec::new();
        }

        let oppressed = conflict.oppressed_class;
        let ruling = conflict.ruling_class;
        let mut lines = Vec::new();

        class_system.increase_class_consciousness(oppressed, outcome.consciousness_change());

        match outcome {
            ConflictOutcome::Revolution => {
                if let Some(class) = class_system.class_mut(oppressed) {
                    class.political_power = 1.0;
                    class.class_consciousness = 1.0;
                }
                if let Some(class) = class_system.class_mut(ruling) {
                    class.political_power *= REVOLUTION_RULING_POWER_FACTOR;
                }
                lines.push("a revolution has taken place".to_string());
                lines.push(format!("political power passed to the {oppressed}"));
            }
            ConflictOutcome::SubordinateVictory => {
                adjust_power(class_system, oppressed, VICTORY_OPPRESSED_POWER);
                adjust_power(class_system, ruling, VICTORY_RULING_POWER);
                lines.push(format!("the {oppressed} won their struggle"));
            }
            ConflictOutcome::Transformation => {
                adjust_power(class_system, oppressed, TRANSFORMATION_OPPRESSED_POWER);
                adjust_power(class_system, ruling, TRANSFORMATION_RULING_POWER);
                adjust_mutual_relations(class_system, oppressed, ruling, TRANSFORMATION_RELATIONS);
                lines.push("relations between the classes were transformed".to_string());
            }
            ConflictOutcome::Compromise => {
                adjust_mutual_relations(class_system, oppressed, ruling, COMPROMISE_RELATIONS);
                lines.push("a compromise was reached".to_string());
                if let Some(demand) = conflict.demands.first() {
                    lines.push(format!("demand partially met: {demand}"));
                }
            }
            ConflictOutcome::DominantVictory => {
                adjust_power(class_system, ruling, DOMINANT_RULING_POWER);
                lines.push(format!("the {ruling} prevailed"));
                let rejected = conflict.demands.len() / 2;
                for demand in &conflict.demands[..rejected] {
                    lines.push(format!("demand rejected: {demand}"));
                }
            }
            ConflictOutcome::Suppressed => {
                if let Some(class) = class_system.class_mut(oppressed) {
                    class.class_consciousness *= SUPPRESSION_CONSCIOUSNESS_FACTOR;
                }
                adjust_power(class_system, ruling, SUPPRESSION_RULING_POWER);
                lines.push("the uprising was suppressed".to_string());
                lines.push("class consciousness temporarily reduced".to_string());
            }
        }

        let fraction = outcome.property_redistribution();
        if fraction > 0.0 {
            lines.push(format!(
                "{:.0}% of {ruling} property redistributed",
                fraction * 100.0
            ));
        }
        lines.push(format!(
            "{} ended: {}",
            conflict.conflict_type.display_name(),
            outcome.display_name()
        ));

        tracing::info!(
            id = %conflict.id,
            year,
            outcome = outcome.tag(),
            "class conflict resolved"
        );
        lines
    }
}

fn adjust_power(class_system: &mut ClassSystem, label: ClassLabel, delta: f64) {
    if let Some(class) = class_system.class_mut(label) {
        class.adjust_political_power(delta);
    }
}

fn adjust_mutual_relations(
    class_system: &mut ClassSystem,
    a: ClassLabel,
    b: ClassLabel,
    delta: f64,
) {
    if let Some(class) = class_system.class_mut(a) {
        class.adjust_relation(b, delta);
    }
    if let Some(class) = class_system.class_mut(b) {
        class.adjust_relation(a, delta);
    }
}
