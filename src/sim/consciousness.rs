use std::collections::{BTreeSet, VecDeque};

use rand::{Rng, RngCore};

use crate::model::{AgentId, ConsciousnessSpreadEvent};

use super::class_system::ClassSystem;

// --- Spread amount ---
const BASE_SPREAD: f64 = 0.005;
const CONSCIOUSNESS_SPREAD_RATE: f64 = 0.05;
const RELATIONSHIP_FLOOR: f64 = 0.5;
const INTELLECTUAL_MULTIPLIER: f64 = 2.0;
const SPREAD_JITTER_MIN: f64 = 0.9;
const SPREAD_JITTER_MAX: f64 = 1.1;
const MIN_SPREAD: f64 = 0.001;
const MAX_SPREAD: f64 = 0.15;

// --- Beliefs ---
const FALSE_CONSCIOUSNESS_BELIEFS: [&str; 3] =
    ["hierarchy_divine", "property_sacred", "natural_inequality"];
const TRUE_CONSCIOUSNESS_BELIEFS: [&str; 3] = ["equality", "collective_good", "labor_value"];
const FALSE_BELIEF_FACTOR: f64 = 0.5;
const TRUE_BELIEF_FACTOR: f64 = 1.5;
const MIN_RECEPTIVITY: f64 = 0.1;
const MAX_RECEPTIVITY: f64 = 2.0;

// --- Organic intellectuals ---
const INTELLECTUAL_MIN_INTELLIGENCE: u8 = 12;
const INTELLECTUAL_MIN_CONSCIOUSNESS: f64 = 0.5;
const INTELLECTUAL_MIN_CONNECTIONS: u32 = 5;

const CRISIS_CONSCIOUSNESS_BOOST: f64 = 0.2;
const SPREAD_HISTORY_LIMIT: usize = 1000;

/// Peer-to-peer diffusion of class consciousness among the exploited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassConsciousnessSystem {
    organic_intellectuals: BTreeSet<AgentId>,
    spread_history: VecDeque<ConsciousnessSpreadEvent>,
}

impl ClassConsciousnessSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore(organic_intellectuals: BTreeSet<AgentId>) -> Self {
        Self {
            organic_intellectuals,
            spread_history: VecDeque::new(),
        }
    }

    pub fn organic_intellectuals(&self) -> &BTreeSet<AgentId> {
        &self.organic_intellectuals
    }

    pub fn is_organic_intellectual(&self, agent: AgentId) -> bool {
        self.organic_intellectuals.contains(&agent)
    }

    /// Most recent spread events, oldest first.
    pub fn spread_history(&self) -> impl Iterator<Item = &ConsciousnessSpreadEvent> {
        self.spread_history.iter()
    }

    /// Drop a departed agent from the intellectual roster.
    pub fn forget(&mut self, agent: AgentId) -> bool {
        self.organic_intellectuals.remove(&agent)
    }

    /// Spread with neutral belief receptivity.
    pub fn spread_consciousness(
        &mut self,
        from: AgentId,
        to: AgentId,
        class_system: &mut ClassSystem,
        relationship_strength: f64,
        year: u32,
        rng: &mut dyn RngCore,
    ) -> Option<ConsciousnessSpreadEvent> {
        self.spread_with_receptivity(from, to, class_system, relationship_strength, 1.0, year, rng)
    }

    /// One diffusion step from `from` to `to`. Both must hold the same exploited label;
    /// otherwise nothing changes and `None` is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn spread_with_receptivity(
        &mut self,
        from: AgentId,
        to: AgentId,
        class_system: &mut ClassSystem,
        relationship_strength: f64,
        receptivity: f64,
        year: u32,
        rng: &mut dyn RngCore,
    ) -> Option<ConsciousnessSpreadEvent> {
        let label = class_system.npc_class(from)?;
        if class_system.npc_class(to)? != label || !label.is_exploited() {
            return None;
        }

        let consciousness = class_system.class(label)?.class_consciousness;
        let relationship = relationship_strength.clamp(0.0, 1.0);
        let intellectual = if self.is_organic_intellectual(from) {
            INTELLECTUAL_MULTIPLIER
        } else {
            1.0
        };
        let jitter = rng.random_range(SPREAD_JITTER_MIN..SPREAD_JITTER_MAX);
        let amount = ((BASE_SPREAD + CONSCIOUSNESS_SPREAD_RATE * consciousness)
            * (RELATIONSHIP_FLOOR + (1.0 - RELATIONSHIP_FLOOR) * relationship)
            * intellectual
            * receptivity.clamp(MIN_RECEPTIVITY, MAX_RECEPTIVITY)
            * jitter)
            .clamp(MIN_SPREAD, MAX_SPREAD);

        class_system.increase_class_consciousness(label, amount);

        let event = ConsciousnessSpreadEvent {
            from_agent: from,
            to_agent: to,
            class_label: label,
            amount,
            year,
        };
        tracing::debug!(from, to, label = label.tag(), amount, "consciousness spread");

        if self.spread_history.len() == SPREAD_HISTORY_LIMIT {
            self.spread_history.pop_front();
        }
        self.spread_history.push_back(event.clone());
        Some(event)
    }

    /// Receptivity multiplier from held beliefs.
    pub fn belief_receptivity<S: AsRef<str>>(beliefs: &[S]) -> f64 {
        let mut modifier = 1.0;
        for belief in beliefs.iter().map(AsRef::as_ref) {
            if FALSE_CONSCIOUSNESS_BELIEFS.contains(&belief) {
                modifier *= FALSE_BELIEF_FACTOR;
            } else if TRUE_CONSCIOUSNESS_BELIEFS.contains(&belief) {
                modifier *= TRUE_BELIEF_FACTOR;
            }
        }
        modifier.clamp(MIN_RECEPTIVITY, MAX_RECEPTIVITY)
    }

    /// Promote `agent` if it clears every threshold. Already registered agents return false.
    pub fn register_organic_intellectual(
        &mut self,
        agent: AgentId,
        intelligence: u8,
        class_consciousness: f64,
        social_connections: u32,
    ) -> bool {
        if intelligence <= INTELLECTUAL_MIN_INTELLIGENCE
            || class_consciousness <= INTELLECTUAL_MIN_CONSCIOUSNESS
            || social_connections <= INTELLECTUAL_MIN_CONNECTIONS
        {
            return false;
        }
        self.organic_intellectuals.insert(agent)
    }

    /// Raise every exploited class's consciousness after a crisis. Returns the largest
    /// change actually applied.
    pub fn crisis_effect(&self, class_system: &mut ClassSystem, severity: f64) -> f64 {
        let boost = CRISIS_CONSCIOUSNESS_BOOST * severity.clamp(0.0, 1.0);
        let labels: Vec<_> = class_system
            .classes()
            .keys()
            .copied()
            .filter(|l| l.is_exploited())
            .collect();
        labels
            .into_iter()
            .map(|l| class_system.increase_class_consciousness(l, boost))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::model::ClassLabel;

    fn system_with(pairs: &[(AgentId, ClassLabel)]) -> ClassSystem {
        let mut cs = ClassSystem::new();
        for &(agent, label) in pairs {
            cs.update_npc_class(agent, label, 1);
        }
        cs
    }

    #[test]
    fn spread_between_same_exploited_class() {
        let mut cs = system_with(&[(1, ClassLabel::Landless), (2, ClassLabel::Landless)]);
        let mut ccs = ClassConsciousnessSystem::new();
        let mut rng = SmallRng::seed_from_u64(1);

        let event = ccs
            .spread_consciousness(1, 2, &mut cs, 0.5, 10, &mut rng)
            .unwrap();
        assert_eq!(event.class_label, ClassLabel::Landless);
        assert!(event.amount >= MIN_SPREAD && event.amount <= MAX_SPREAD);
        let level = cs.class(ClassLabel::Landless).unwrap().class_consciousness;
        assert!((level - event.amount).abs() < 1e-12);
        assert_eq!(ccs.spread_history().count(), 1);
    }

    #[test]
    fn spread_across_classes_is_rejected() {
        let mut cs = system_with(&[(1, ClassLabel::Landless), (2, ClassLabel::Laborer)]);
        let before = cs.clone();
        let mut ccs = ClassConsciousnessSystem::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(ccs.spread_consciousness(1, 2, &mut cs, 1.0, 10, &mut rng).is_none());
        assert_eq!(cs, before);
        assert_eq!(ccs.spread_history().count(), 0);
    }

    #[test]
    fn spread_among_exploiters_is_rejected() {
        let mut cs = system_with(&[(1, ClassLabel::Landowner), (2, ClassLabel::Landowner)]);
        let before = cs.clone();
        let mut ccs = ClassConsciousnessSystem::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(ccs.spread_consciousness(1, 2, &mut cs, 1.0, 10, &mut rng).is_none());
        assert_eq!(cs, before);
    }

    #[test]
    fn spread_to_unclassified_agent_is_rejected() {
        let mut cs = system_with(&[(1, ClassLabel::Laborer)]);
        let mut ccs = ClassConsciousnessSystem::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(ccs.spread_consciousness(1, 99, &mut cs, 1.0, 10, &mut rng).is_none());
        assert!(ccs.spread_consciousness(99, 1, &mut cs, 1.0, 10, &mut rng).is_none());
    }

    #[test]
    fn intellectuals_spread_more() {
        let pairs = [(1, ClassLabel::Laborer), (2, ClassLabel::Laborer)];
        let mut plain_cs = system_with(&pairs);
        let mut plain = ClassConsciousnessSystem::new();
        let plain_event = plain
            .spread_consciousness(1, 2, &mut plain_cs, 0.5, 1, &mut SmallRng::seed_from_u64(5))
            .unwrap();

        let mut cs = system_with(&pairs);
        let mut ccs = ClassConsciousnessSystem::new();
        assert!(ccs.register_organic_intellectual(1, 15, 0.8, 10));
        let event = ccs
            .spread_consciousness(1, 2, &mut cs, 0.5, 1, &mut SmallRng::seed_from_u64(5))
            .unwrap();
        assert!((event.amount - 2.0 * plain_event.amount).abs() < 1e-12);
    }

    #[test]
    fn history_is_bounded() {
        let mut cs = system_with(&[(1, ClassLabel::Landless), (2, ClassLabel::Landless)]);
        let mut ccs = ClassConsciousnessSystem::new();
        let mut rng = SmallRng::seed_from_u64(1);
        for year in 0..1100 {
            ccs.spread_consciousness(1, 2, &mut cs, 0.5, year, &mut rng);
        }
        assert_eq!(ccs.spread_history().count(), SPREAD_HISTORY_LIMIT);
        assert_eq!(ccs.spread_history().next().unwrap().year, 100);
        assert!((cs.class(ClassLabel::Landless).unwrap().class_consciousness - 1.0).abs() < 1e-12);
    }

    #[test]
    fn belief_receptivity_modifiers() {
        let none: [&str; 0] = [];
        assert!((ClassConsciousnessSystem::belief_receptivity(&none) - 1.0).abs() < f64::EPSILON);
        assert!(
            (ClassConsciousnessSystem::belief_receptivity(&["property_sacred"]) - 0.5).abs()
                < f64::EPSILON
        );
        assert!(
            (ClassConsciousnessSystem::belief_receptivity(&["equality", "labor_value"]) - 2.0)
                .abs()
                < f64::EPSILON
        );
        let all_false = ["hierarchy_divine", "property_sacred", "natural_inequality"];
        assert!(
            (ClassConsciousnessSystem::belief_receptivity(&all_false) - 0.125).abs()
                < f64::EPSILON
        );
        let owned = vec!["ancestor_worship".to_string()];
        assert!((ClassConsciousnessSystem::belief_receptivity(&owned) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn intellectual_thresholds_and_idempotence() {
        let mut ccs = ClassConsciousnessSystem::new();
        assert!(!ccs.register_organic_intellectual(1, 12, 0.9, 10));
        assert!(!ccs.register_organic_intellectual(1, 15, 0.5, 10));
        assert!(!ccs.register_organic_intellectual(1, 15, 0.9, 5));
        assert!(ccs.register_organic_intellectual(1, 13, 0.51, 6));
        assert!(!ccs.register_organic_intellectual(1, 13, 0.51, 6));
        assert!(ccs.is_organic_intellectual(1));
        assert!(ccs.forget(1));
        assert!(!ccs.is_organic_intellectual(1));
    }

    #[test]
    fn crisis_boosts_exploited_classes_only() {
        let mut cs = system_with(&[
            (1, ClassLabel::Landless),
            (2, ClassLabel::Laborer),
            (3, ClassLabel::Landowner),
        ]);
        cs.increase_class_consciousness(ClassLabel::Laborer, 0.95);
        let ccs = ClassConsciousnessSystem::new();

        let boost = ccs.crisis_effect(&mut cs, 0.5);
        assert!((boost - 0.1).abs() < 1e-12);
        assert!((cs.class(ClassLabel::Landless).unwrap().class_consciousness - 0.1).abs() < 1e-12);
        assert!((cs.class(ClassLabel::Laborer).unwrap().class_consciousness - 1.0).abs() < 1e-12);
        assert!(cs.class(ClassLabel::Landowner).unwrap().class_consciousness.abs() < f64::EPSILON);

        // Severity is clamped.
        let boost = ccs.crisis_effect(&mut cs, 5.0);
        assert!((boost - 0.2).abs() < 1e-12);
    }
}
