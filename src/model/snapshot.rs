use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::class_label::ClassLabel;
use super::conflict::{ClassConflict, ConflictOutcome, ConflictStage, ConflictType};
use super::social_class::SocialClass;
use crate::sim::{ClassConsciousnessSystem, ClassSystem};

/// Persisted class-engine state.
///
/// Loading is lenient: every field defaults, tags are plain strings resolved on
/// [`Snapshot::restore`], and out-of-range numbers are clamped there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub classes: BTreeMap<String, ClassRecord>,
    pub npc_classes: BTreeMap<AgentId, String>,
    pub conflicts: Vec<ConflictRecord>,
    pub classes_emerged: bool,
    pub first_class_year: Option<i64>,
    pub conflict_cooldown: i64,
    pub organic_intellectuals: Vec<AgentId>,
    /// First appearance of each class-society label.
    pub emergence_history: Vec<EmergenceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergenceRecord {
    pub label: String,
    pub year: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRecord {
    pub members: Vec<AgentId>,
    pub avg_wealth: f64,
    pub avg_property: f64,
    pub political_power: f64,
    pub class_consciousness: f64,
    pub relations: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictRecord {
    pub id: String,
    pub conflict_type: String,
    pub oppressed_class: String,
    pub ruling_class: String,
    pub stage: String,
    pub intensity: f64,
    pub violence_level: f64,
    pub organization_level: f64,
    pub primary_cause: String,
    pub grievances: Vec<String>,
    pub demands: Vec<String>,
    pub year_started: i64,
    pub days_active: i64,
    pub year_resolved: Option<i64>,
    pub production_loss: f64,
    pub resolved: bool,
    pub outcome: Option<String>,
    pub participants: BTreeMap<AgentId, String>,
    pub leaders: Vec<AgentId>,
    pub suppression_forces: Vec<AgentId>,
}

impl Snapshot {
    pub fn capture(classes: &ClassSystem, consciousness: &ClassConsciousnessSystem) -> Self {
        Self {
            classes: classes
                .classes()
                .iter()
                .map(|(label, class)| (label.tag().to_string(), ClassRecord::from(class)))
                .collect(),
            npc_classes: classes
                .npc_classes()
                .iter()
                .map(|(&agent, label)| (agent, label.tag().to_string()))
                .collect(),
            conflicts: classes.conflicts().iter().map(ConflictRecord::from).collect(),
            classes_emerged: classes.classes_emerged(),
            first_class_year: classes.first_class_year().map(i64::from),
            conflict_cooldown: i64::from(classes.conflict_cooldown),
            organic_intellectuals: consciousness.organic_intellectuals().iter().copied().collect(),
            emergence_history: classes
                .emergence_history()
                .iter()
                .map(|&(label, year)| EmergenceRecord {
                    label: label.tag().to_string(),
                    year: i64::from(year),
                })
                .collect(),
        }
    }

    /// Rebuild engine state. The agent index wins over class member lists; agents listed
    /// only in exactly one class record are adopted into the index.
    pub fn restore(self) -> (ClassSystem, ClassConsciousnessSystem) {
        let mut classes = BTreeMap::new();
        let mut listed: BTreeMap<AgentId, Vec<ClassLabel>> = BTreeMap::new();
        for (tag, record) in &self.classes {
            let Some(label) = parse_label(tag, "class record") else {
                continue;
            };
            for &agent in &record.members {
                listed.entry(agent).or_default().push(label);
            }
            classes.insert(label, record.to_class(label));
        }

        let mut npc_class: BTreeMap<AgentId, ClassLabel> = self
            .npc_classes
            .iter()
            .filter_map(|(&agent, tag)| parse_label(tag, "agent index").map(|l| (agent, l)))
            .collect();

        for (agent, labels) in listed {
            if npc_class.contains_key(&agent) {
                continue;
            }
            if let [label] = labels.as_slice() {
                tracing::warn!(agent, label = label.tag(), "adopting class member missing from index");
                npc_class.insert(agent, *label);
            } else {
                tracing::warn!(agent, "dropping agent listed in several classes but not indexed");
            }
        }

        let conflicts = self
            .conflicts
            .iter()
            .filter_map(ConflictRecord::to_conflict)
            .collect();

        let emergence_history = self
            .emergence_history
            .iter()
            .filter_map(|r| parse_label(&r.label, "emergence").map(|l| (l, clamp_u32(r.year))))
            .collect();

        let system = ClassSystem::restore(
            classes,
            npc_class,
            conflicts,
            self.classes_emerged,
            self.first_class_year.map(clamp_u32),
            clamp_u32(self.conflict_cooldown),
            emergence_history,
        );
        let consciousness =
            ClassConsciousnessSystem::restore(self.organic_intellectuals.into_iter().collect());
        (system, consciousness)
    }
}

impl From<&SocialClass> for ClassRecord {
    fn from(class: &SocialClass) -> Self {
        Self {
            members: class.members().iter().copied().collect(),
            avg_wealth: class.avg_wealth,
            avg_property: class.avg_property,
            political_power: class.political_power,
            class_consciousness: class.class_consciousness,
            relations: class
                .relations
                .iter()
                .map(|(l, v)| (l.tag().to_string(), *v))
                .collect(),
        }
    }
}

impl ClassRecord {
    fn to_class(&self, label: ClassLabel) -> SocialClass {
        let mut class = SocialClass::new(label);
        class.avg_wealth = non_negative(self.avg_wealth);
        class.avg_property = non_negative(self.avg_property);
        class.political_power = unit(self.political_power);
        class.class_consciousness = unit(self.class_consciousness);
        class.relations = self
            .relations
            .iter()
            .filter_map(|(tag, &v)| {
                let other = parse_label(tag, "relation")?;
                let v = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
                Some((other, v))
            })
            .collect();
        class
    }
}

impl From<&ClassConflict> for ConflictRecord {
    fn from(c: &ClassConflict) -> Self {
        Self {
            id: c.id.clone(),
            conflict_type: c.conflict_type.tag().to_string(),
            oppressed_class: c.oppressed_class.tag().to_string(),
            ruling_class: c.ruling_class.tag().to_string(),
            stage: c.stage.tag().to_string(),
            intensity: c.intensity,
            violence_level: c.violence_level,
            organization_level: c.organization_level,
            primary_cause: c.primary_cause.clone(),
            grievances: c.grievances.clone(),
            demands: c.demands.clone(),
            year_started: i64::from(c.year_started),
            days_active: i64::from(c.days_active),
            year_resolved: c.year_resolved.map(i64::from),
            production_loss: c.production_loss,
            resolved: c.resolved,
            outcome: c.outcome.map(|o| o.tag().to_string()),
            participants: c
                .participants
                .iter()
                .map(|(&agent, l)| (agent, l.tag().to_string()))
                .collect(),
            leaders: c.leaders.iter().copied().collect(),
            suppression_forces: c.suppression_forces.iter().copied().collect(),
        }
    }
}

impl ConflictRecord {
    /// `None` if either side's label is unknown.
    fn to_conflict(&self) -> Option<ClassConflict> {
        let oppressed = parse_label(&self.oppressed_class, "conflict")?;
        let ruling = parse_label(&self.ruling_class, "conflict")?;
        let conflict_type = ConflictType::from_tag(&self.conflict_type).unwrap_or_else(|| {
            tracing::warn!(id = %self.id, tag = %self.conflict_type, "unknown conflict type, using STRIKE");
            ConflictType::Strike
        });

        let mut c = ClassConflict::new(
            self.id.clone(),
            conflict_type,
            oppressed,
            ruling,
            unit(self.intensity),
            clamp_u32(self.year_started),
        );
        c.violence_level = unit(self.violence_level);
        c.organization_level = unit(self.organization_level);
        c.primary_cause = self.primary_cause.clone();
        c.grievances = self.grievances.clone();
        c.demands = self.demands.clone();
        c.days_active = clamp_u32(self.days_active);
        c.year_resolved = self.year_resolved.map(clamp_u32);
        c.production_loss = non_negative(self.production_loss).min(0.5);
        c.resolved = self.resolved;
        c.outcome = self.outcome.as_deref().and_then(|tag| {
            let outcome = ConflictOutcome::from_tag(tag);
            if outcome.is_none() {
                tracing::warn!(id = %self.id, tag, "unknown conflict outcome dropped");
            }
            outcome
        });
        c.participants = self
            .participants
            .iter()
            .filter_map(|(&agent, tag)| parse_label(tag, "participant").map(|l| (agent, l)))
            .collect();
        c.leaders = self.leaders.iter().copied().collect::<BTreeSet<_>>();
        c.suppression_forces = self.suppression_forces.iter().copied().collect();

        // Explicit stages survive; everything else is re-derived from intensity.
        c.stage = match ConflictStage::from_tag(&self.stage) {
            _ if c.resolved => ConflictStage::Resolved,
            Some(stage @ ConflictStage::Resolving) => stage,
            _ => ConflictStage::from_intensity(c.intensity),
        };
        Some(c)
    }
}

fn parse_label(tag: &str, context: &str) -> Option<ClassLabel> {
    let label = ClassLabel::from_tag(tag);
    if label.is_none() {
        tracing::warn!(tag, context, "skipping unknown class label");
    }
    label
}

fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

fn clamp_u32(v: i64) -> u32 {
    v.clamp(0, i64::from(u32::MAX)) as u32
}
