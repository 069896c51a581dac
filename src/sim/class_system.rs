use std::collections::BTreeMap;

use rand::{Rng, RngCore};

use crate::id::IdGenerator;
use crate::model::{
    AgentFacts, AgentId, ClassConflict, ClassLabel, ConflictOutcome, ConflictStage, ConflictType,
    ConsciousnessPhase, SimDate, SocialClass,
};

use super::resolver::ConflictResolver;

// --- Tension ---
const TENSION_RATIO_SCALE: f64 = 10.0;
const TENSION_CONSCIOUSNESS_WEIGHT: f64 = 0.3;

// --- Conflict spawning ---
const MIN_CONFLICT_TENSION: f64 = 0.5;
const HIGH_CONFLICT_TENSION: f64 = 0.8;
const RIOT_TENSION: f64 = 0.6;
const SPAWN_TENSION_WEIGHT: f64 = 0.5;
const SPAWN_CONSCIOUSNESS_WEIGHT: f64 = 0.3;
const SPAWN_FIRST_CONFLICT_BONUS: f64 = 0.2;

// --- Daily conflict ticking ---
const DAILY_ESCALATION: f64 = 0.02;
const DAILY_DE_ESCALATION: f64 = 0.01;
const DAILY_PRODUCTION_LOSS: f64 = 0.01;
const PROTRACTED_CONFLICT_DAYS: u32 = 360;
/// Days without new conflicts after one is resolved.
pub const CONFLICT_COOLDOWN_DAYS: u32 = 30;

// --- Relations ---
const ANTAGONISTIC_PAIRS: [(ClassLabel, ClassLabel); 4] = [
    (ClassLabel::Landowner, ClassLabel::Landless),
    (ClassLabel::Landowner, ClassLabel::Laborer),
    (ClassLabel::Craftsman, ClassLabel::Laborer),
    (ClassLabel::Chief, ClassLabel::CommunalMember),
];
const RELATION_BASE_HOSTILITY: f64 = 0.25;
const RELATION_TENSION_HOSTILITY: f64 = 0.5;

const FALLBACK_CAUSE: &str = "class antagonism";

/// Something that happened to a conflict during a daily update.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictReport {
    StageChanged {
        conflict_id: String,
        from: ConflictStage,
        to: ConflictStage,
    },
    TypeChanged {
        conflict_id: String,
        from: ConflictType,
        to: ConflictType,
    },
    Resolved {
        conflict_id: String,
        outcome: ConflictOutcome,
        consequences: Vec<String>,
    },
}

/// Classification, membership bookkeeping, tension metrics and the conflict lifecycle.
///
/// The agent index is authoritative. Class member sets are a derived view that only
/// `update_npc_class`, `remove_agent` and `reclassify_all` touch, so the two always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSystem {
    classes: BTreeMap<ClassLabel, SocialClass>,
    npc_class: BTreeMap<AgentId, ClassLabel>,
    conflicts: Vec<ClassConflict>,
    classes_emerged: bool,
    first_class_year: Option<u32>,
    /// Days remaining before another conflict may start.
    pub conflict_cooldown: u32,
    emergence_history: Vec<(ClassLabel, u32)>,
    conflict_ids: IdGenerator,
}

impl Default for ClassSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassSystem {
    pub fn new() -> Self {
        Self {
            classes: BTreeMap::new(),
            npc_class: BTreeMap::new(),
            conflicts: Vec::new(),
            classes_emerged: false,
            first_class_year: None,
            conflict_cooldown: 0,
            emergence_history: Vec::new(),
            conflict_ids: IdGenerator::new(),
        }
    }

    /// Rebuild a system from saved parts. Class member sets are regenerated from the index.
    pub(crate) fn restore(
        mut classes: BTreeMap<ClassLabel, SocialClass>,
        npc_class: BTreeMap<AgentId, ClassLabel>,
        conflicts: Vec<ClassConflict>,
        classes_emerged: bool,
        first_class_year: Option<u32>,
        conflict_cooldown: u32,
        emergence_history: Vec<(ClassLabel, u32)>,
    ) -> Self {
        for class in classes.values_mut() {
            class.clear_members();
        }
        for (&agent, &label) in &npc_class {
            classes
                .entry(label)
                .or_insert_with(|| SocialClass::new(label))
                .insert_member(agent);
        }

        // Saves without a history get every class stamped at the first emergence year.
        let emergence_history = if emergence_history.is_empty() {
            let emergence_year = first_class_year.unwrap_or(0);
            classes
                .keys()
                .copied()
                .filter(|l| l.marks_class_society())
                .map(|l| (l, emergence_year))
                .collect()
        } else {
            emergence_history
        };

        // Dropped records can leave gaps, so continue after the highest id still in use.
        let next_id = conflicts
            .iter()
            .filter_map(|c| conflict_sequence(&c.id))
            .max()
            .map_or(conflicts.len() as u64 + 1, |max| max + 1);
        Self {
            classes,
            npc_class,
            conflicts,
            classes_emerged: classes_emerged || first_class_year.is_some(),
            first_class_year,
            conflict_cooldown,
            emergence_history,
            conflict_ids: IdGenerator::starting_from(next_id),
        }
    }

    // -- Accessors --

    pub fn classes(&self) -> &BTreeMap<ClassLabel, SocialClass> {
        &self.classes
    }

    pub fn class(&self, label: ClassLabel) -> Option<&SocialClass> {
        self.classes.get(&label)
    }

    /// Mutable access to a class's scalar state. Membership stays read-only.
    pub fn class_mut(&mut self, label: ClassLabel) -> Option<&mut SocialClass> {
        self.classes.get_mut(&label)
    }

    pub fn class_size(&self, label: ClassLabel) -> usize {
        self.classes.get(&label).map_or(0, SocialClass::size)
    }

    pub fn npc_class(&self, agent: AgentId) -> Option<ClassLabel> {
        self.npc_class.get(&agent).copied()
    }

    pub fn npc_classes(&self) -> &BTreeMap<AgentId, ClassLabel> {
        &self.npc_class
    }

    pub fn conflicts(&self) -> &[ClassConflict] {
        &self.conflicts
    }

    pub fn conflict(&self, id: &str) -> Option<&ClassConflict> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    pub fn conflict_mut(&mut self, id: &str) -> Option<&mut ClassConflict> {
        self.conflicts.iter_mut().find(|c| c.id == id)
    }

    pub fn classes_emerged(&self) -> bool {
        self.classes_emerged
    }

    pub fn first_class_year(&self) -> Option<u32> {
        self.first_class_year
    }

    /// First appearance of each class-society label, in order of appearance.
    pub fn emergence_history(&self) -> &[(ClassLabel, u32)] {
        &self.emergence_history
    }

    // -- Classification --

    /// Derive the class label for one agent. Pure.
    pub fn determine_class(facts: &AgentFacts, private_property_exists: bool) -> ClassLabel {
        if !private_property_exists {
            return if facts.is_chief {
                ClassLabel::Chief
            } else if facts.is_elder {
                ClassLabel::Elder
            } else {
                ClassLabel::CommunalMember
            };
        }

        if facts.owns_means_of_production() {
            if facts.owns_land {
                ClassLabel::Landowner
            } else {
                ClassLabel::Craftsman
            }
        } else if facts.works_for_others {
            ClassLabel::Laborer
        } else {
            ClassLabel::Landless
        }
    }

    /// Move `agent` into `label`. Returns false if the agent already had that label.
    pub fn update_npc_class(&mut self, agent: AgentId, label: ClassLabel, year: u32) -> bool {
        let old = self.npc_class.get(&agent).copied();
        if old == Some(label) {
            return false;
        }

        if let Some(class) = old.and_then(|l| self.classes.get_mut(&l)) {
            class.remove_member(agent);
        }

        let is_new_label = !self.classes.contains_key(&label);
        self.classes
            .entry(label)
            .or_insert_with(|| SocialClass::new(label))
            .insert_member(agent);
        self.npc_class.insert(agent, label);

        if label.marks_class_society() && is_new_label {
            self.emergence_history.push((label, year));
            if !self.classes_emerged {
                self.classes_emerged = true;
                self.first_class_year = Some(year);
                tracing::info!(year, label = label.tag(), "classes emerged");
            }
        }
        true
    }

    /// Forget a departed agent: index, class membership and active conflict rosters.
    pub fn remove_agent(&mut self, agent: AgentId) -> Option<ClassLabel> {
        let label = self.npc_class.remove(&agent)?;
        if let Some(class) = self.classes.get_mut(&label) {
            class.remove_member(agent);
        }
        for conflict in self.conflicts.iter_mut().filter(|c| c.is_active()) {
            conflict.participants.remove(&agent);
            conflict.leaders.remove(&agent);
            conflict.suppression_forces.remove(&agent);
        }
        Some(label)
    }

    /// Re-derive every living agent's class and drop indexed agents no longer present.
    /// Returns the number of agents whose label changed or who were removed.
    pub fn reclassify_all(
        &mut self,
        facts: &BTreeMap<AgentId, AgentFacts>,
        private_property_exists: bool,
        year: u32,
    ) -> usize {
        let departed: Vec<AgentId> = self
            .npc_class
            .keys()
            .filter(|id| !facts.contains_key(id))
            .copied()
            .collect();
        let mut changed = 0;
        for agent in departed {
            if self.remove_agent(agent).is_some() {
                changed += 1;
            }
        }

        for (&agent, agent_facts) in facts {
            let label = Self::determine_class(agent_facts, private_property_exists);
            if self.update_npc_class(agent, label, year) {
                changed += 1;
            }
        }
        changed
    }

    // -- Metrics --

    /// Gini coefficient of a wealth distribution. 0.0 for fewer than two values or zero total.
    pub fn calculate_inequality<I: IntoIterator<Item = f64>>(wealth: I) -> f64 {
        let mut values: Vec<f64> = wealth.into_iter().map(|w| w.max(0.0)).collect();
        let n = values.len();
        let total: f64 = values.iter().sum();
        if n <= 1 || total <= 0.0 {
            return 0.0;
        }
        values.sort_by(f64::total_cmp);

        let n = n as f64;
        let weighted: f64 = values
            .iter()
            .enumerate()
            .map(|(i, w)| (2.0 * (i as f64 + 1.0) - n - 1.0) * w)
            .sum();
        (weighted / (n * total)).clamp(0.0, 1.0)
    }

    /// Recompute per-class average wealth and property from current facts.
    pub fn update_class_averages(&mut self, facts: &BTreeMap<AgentId, AgentFacts>) {
        for class in self.classes.values_mut() {
            let known: Vec<&AgentFacts> =
                class.members().iter().filter_map(|id| facts.get(id)).collect();
            if known.is_empty() {
                class.avg_wealth = 0.0;
                class.avg_property = 0.0;
                continue;
            }
            let n = known.len() as f64;
            class.avg_wealth = known.iter().map(|f| f.wealth).sum::<f64>() / n;
            class.avg_property = known.iter().map(|f| f.property).sum::<f64>() / n;
        }
    }

    /// Tension between exploited and exploiting classes, 0.0–1.0.
    pub fn check_class_tension(&self) -> f64 {
        if !self.classes_emerged {
            return 0.0;
        }

        let exploited: usize = ClassLabel::exploited().map(|l| self.class_size(l)).sum();
        let exploiters: usize = ClassLabel::exploiters().map(|l| self.class_size(l)).sum();
        if exploited == 0 || exploiters == 0 {
            return 0.0;
        }

        let ratio = exploited as f64 / exploiters as f64;
        let ratio_tension = (ratio / TENSION_RATIO_SCALE).min(1.0);
        let consciousness: f64 = ClassLabel::exploited()
            .filter_map(|l| self.classes.get(&l))
            .map(|c| c.class_consciousness * TENSION_CONSCIOUSNESS_WEIGHT)
            .sum();

        (ratio_tension + consciousness).clamp(0.0, 1.0)
    }

    /// Sour relations between antagonistic classes in proportion to tension.
    pub fn update_class_relations(&mut self, tension: f64) {
        let hostility = -(RELATION_BASE_HOSTILITY + RELATION_TENSION_HOSTILITY * tension);
        let hostility = hostility.clamp(-1.0, 1.0);
        for (a, b) in ANTAGONISTIC_PAIRS {
            if !self.classes.contains_key(&a) || !self.classes.contains_key(&b) {
                continue;
            }
            if let Some(class) = self.classes.get_mut(&a) {
                class.relations.insert(b, hostility);
            }
            if let Some(class) = self.classes.get_mut(&b) {
                class.relations.insert(a, hostility);
            }
        }
    }

    /// Returns the change actually applied (0.0 if the class does not exist).
    pub fn increase_class_consciousness(&mut self, label: ClassLabel, amount: f64) -> f64 {
        self.classes
            .get_mut(&label)
            .map_or(0.0, |c| c.adjust_consciousness(amount))
    }

    /// Class with the most political power. Ties go to the earlier label.
    pub fn get_dominant_class(&self) -> Option<ClassLabel> {
        let mut best: Option<&SocialClass> = None;
        for class in self.classes.values() {
            if best.is_none_or(|b| class.political_power > b.political_power) {
                best = Some(class);
            }
        }
        best.map(|c| c.label)
    }

    pub fn get_consciousness_phase(&self, label: ClassLabel) -> ConsciousnessPhase {
        self.classes
            .get(&label)
            .map_or(ConsciousnessPhase::None, |c| {
                ConsciousnessPhase::from_level(c.class_consciousness)
            })
    }

    /// Display name to member count, for classes that currently have members.
    pub fn get_class_distribution(&self) -> BTreeMap<String, usize> {
        self.classes
            .values()
            .filter(|c| c.size() > 0)
            .map(|c| (c.label.display_name().to_string(), c.size()))
            .collect()
    }

    pub fn get_active_conflicts(&self) -> Vec<&ClassConflict> {
        self.conflicts.iter().filter(|c| c.is_active()).collect()
    }

    pub fn get_conflict_summary(&self) -> String {
        let active = self.get_active_conflicts();
        if active.is_empty() {
            return "no active conflicts".to_string();
        }
        active
            .iter()
            .map(|c| c.summary())
            .collect::<Vec<_>>()
            .join("; ")
    }

    // -- Conflict lifecycle --

    /// Largest class among `labels` with at least one member. Ties go to the earlier label.
    fn largest_of(&self, labels: impl Iterator<Item = ClassLabel>) -> Option<ClassLabel> {
        let mut best: Option<(ClassLabel, usize)> = None;
        for label in labels {
            let size = self.class_size(label);
            if size > 0 && best.is_none_or(|(_, s)| size > s) {
                best = Some((label, size));
            }
        }
        best.map(|(label, _)| label)
    }

    fn has_active_conflict(&self, oppressed: ClassLabel, ruling: ClassLabel) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.is_active() && c.oppressed_class == oppressed && c.ruling_class == ruling)
    }

    /// Possibly start a new conflict. Called once per day; the cooldown counts down here.
    pub fn check_for_conflict(
        &mut self,
        year: u32,
        rng: &mut dyn RngCore,
    ) -> Option<&ClassConflict> {
        if self.conflict_cooldown > 0 {
            self.conflict_cooldown -= 1;
            return None;
        }

        let tension = self.check_class_tension();
        if tension < MIN_CONFLICT_TENSION {
            return None;
        }
        let any_active = self.conflicts.iter().any(ClassConflict::is_active);
        if any_active && tension <= HIGH_CONFLICT_TENSION {
            return None;
        }

        let oppressed = self.largest_of(ClassLabel::exploited())?;
        let ruling = self.largest_of(ClassLabel::exploiters())?;
        if self.has_active_conflict(oppressed, ruling) {
            return None;
        }

        let consciousness = self.class(oppressed).map_or(0.0, |c| c.class_consciousness);
        let first_bonus = if any_active {
            0.0
        } else {
            SPAWN_FIRST_CONFLICT_BONUS
        };
        let probability = SPAWN_TENSION_WEIGHT * tension
            + SPAWN_CONSCIOUSNESS_WEIGHT * consciousness
            + first_bonus;
        if rng.random_range(0.0..1.0) >= probability {
            return None;
        }

        let conflict = self.create_conflict(oppressed, ruling, tension, year);
        tracing::info!(
            id = %conflict.id,
            year,
            oppressed = oppressed.tag(),
            ruling = ruling.tag(),
            conflict_type = conflict.conflict_type.tag(),
            tension,
            "class conflict started"
        );
        self.conflicts.push(conflict);
        self.conflicts.last()
    }

    fn create_conflict(
        &mut self,
        oppressed: ClassLabel,
        ruling: ClassLabel,
        tension: f64,
        year: u32,
    ) -> ClassConflict {
        let conflict_type = if tension > HIGH_CONFLICT_TENSION {
            ConflictType::Uprising
        } else if tension > RIOT_TENSION {
            ConflictType::Riot
        } else {
            ConflictType::Strike
        };

        let id = format!("conflict_{year}_{:04}", self.conflict_ids.next_id());
        let mut conflict = ClassConflict::new(id, conflict_type, oppressed, ruling, tension, year);

        conflict.grievances = grievances_for(oppressed, ruling);
        conflict.primary_cause = conflict
            .grievances
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_CAUSE.to_string());
        conflict.demands = demands_for(oppressed);

        for label in [oppressed, ruling] {
            if let Some(class) = self.classes.get(&label) {
                for &agent in class.members() {
                    conflict.add_participant(agent, label);
                }
            }
        }
        conflict
    }

    /// Advance every active conflict by one day, resolving those that are ready.
    pub fn update_conflicts(
        &mut self,
        resolver: &mut ConflictResolver,
        date: SimDate,
        rng: &mut dyn RngCore,
    ) -> Vec<ConflictReport> {
        let tension = self.check_class_tension();
        let mut conflicts = std::mem::take(&mut self.conflicts);
        let mut reports = Vec::new();

        for conflict in conflicts.iter_mut().filter(|c| c.is_active()) {
            conflict.days_active += 1;
            let stage_before = conflict.stage;

            if tension > conflict.intensity {
                conflict.escalate(DAILY_ESCALATION);
                let type_before = conflict.conflict_type;
                if conflict.update_conflict_type() {
                    tracing::debug!(
                        id = %conflict.id,
                        from = type_before.tag(),
                        to = conflict.conflict_type.tag(),
                        "conflict type changed"
                    );
                    reports.push(ConflictReport::TypeChanged {
                        conflict_id: conflict.id.clone(),
                        from: type_before,
                        to: conflict.conflict_type,
                    });
                }
            } else {
                conflict.de_escalate(DAILY_DE_ESCALATION);
            }

            if conflict.stage != stage_before {
                tracing::debug!(
                    id = %conflict.id,
                    from = stage_before.tag(),
                    to = conflict.stage.tag(),
                    "conflict stage changed"
                );
                reports.push(ConflictReport::StageChanged {
                    conflict_id: conflict.id.clone(),
                    from: stage_before,
                    to: conflict.stage,
                });
            }

            if matches!(
                conflict.stage,
                ConflictStage::Active | ConflictStage::Escalating | ConflictStage::Crisis
            ) {
                conflict.add_production_loss(DAILY_PRODUCTION_LOSS);
            }

            let ready = matches!(conflict.stage, ConflictStage::Crisis | ConflictStage::Resolving)
                || conflict.days_active >= PROTRACTED_CONFLICT_DAYS;
            if !ready {
                continue;
            }
            let Some(outcome) = resolver.attempt_resolution(conflict, self, date.year(), rng)
            else {
                continue;
            };
            let consequences = resolver.apply_outcome(conflict, outcome, self, date.year());
            self.conflict_cooldown = CONFLICT_COOLDOWN_DAYS;
            reports.push(ConflictReport::Resolved {
                conflict_id: conflict.id.clone(),
                outcome,
                consequences,
            });
        }

        self.conflicts = conflicts;
        reports
    }
}

/// Numeric suffix of a `conflict_<year>_<seq>` id.
fn conflict_sequence(id: &str) -> Option<u64> {
    id.rsplit_once('_')?.1.parse().ok()
}

fn grievances_for(oppressed: ClassLabel, ruling: ClassLabel) -> Vec<String> {
    let mut grievances = Vec::new();
    match oppressed {
        ClassLabel::Landless => {
            grievances.push("inequality in distribution of land");
            grievances.push("no means of subsistence");
        }
        ClassLabel::Laborer => {
            grievances.push("harsh working conditions");
            grievances.push("low pay for labor");
            grievances.push("exploitation");
        }
        _ => {}
    }
    if ruling == ClassLabel::Landowner {
        grievances.push("land concentrated in few hands");
    }
    grievances.push("growing inequality");
    grievances.into_iter().map(String::from).collect()
}

fn demands_for(oppressed: ClassLabel) -> Vec<String> {
    let mut demands = Vec::new();
    match oppressed {
        ClassLabel::Landless => {
            demands.push("redistribution of land");
            demands.push("access to common lands");
        }
        ClassLabel::Laborer => {
            demands.push("better working conditions");
            demands.push("a fair share of the harvest");
            demands.push("the right to rest");
        }
        _ => {}
    }
    demands.push("recognition of the rights of the oppressed");
    demands.push("limits on the power of the wealthy");
    demands.into_iter().map(String::from).collect()
}
