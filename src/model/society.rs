use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::agent::{AgentFacts, AgentId};
use super::consciousness::ConsciousnessPhase;
use super::date::SimDate;
use super::event::{Event, EventKind};
use super::snapshot::Snapshot;
use crate::consistency::{self, ConsistencyReport};
use crate::id::IdGenerator;
use crate::sim::{ClassConsciousnessSystem, ClassSystem, ConflictResolver};

/// A crisis reported by a collaborator and not yet felt by the class engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crisis {
    pub kind: String,
    /// 0.0–1.0.
    pub severity: f64,
}

/// The simulated society: facts supplied by collaborators plus all class-engine state.
#[derive(Debug, Clone)]
pub struct Society {
    pub current_date: SimDate,
    /// Living agents and their economic facts, refreshed by collaborators.
    pub agents: BTreeMap<AgentId, AgentFacts>,
    pub private_property_exists: bool,
    /// Gini coefficient of wealth as of the last class formation pass.
    pub inequality: f64,
    pub classes: ClassSystem,
    pub consciousness: ClassConsciousnessSystem,
    pub resolver: ConflictResolver,
    pub events: BTreeMap<u64, Event>,
    pending_crises: Vec<Crisis>,
    id_gen: IdGenerator,
}

impl Society {
    pub fn new(start_year: u32) -> Self {
        Self {
            current_date: SimDate::from_year(start_year),
            agents: BTreeMap::new(),
            private_property_exists: false,
            inequality: 0.0,
            classes: ClassSystem::new(),
            consciousness: ClassConsciousnessSystem::new(),
            resolver: ConflictResolver::new(),
            events: BTreeMap::new(),
            pending_crises: Vec::new(),
            id_gen: IdGenerator::new(),
        }
    }

    // -- Inbound --

    pub fn set_agent_facts(&mut self, agent: AgentId, facts: AgentFacts) {
        self.agents.insert(agent, facts);
    }

    /// An agent died or left. Clears it from every index the engine keeps.
    pub fn remove_agent(&mut self, agent: AgentId) -> Option<AgentFacts> {
        self.classes.remove_agent(agent);
        self.consciousness.forget(agent);
        self.agents.remove(&agent)
    }

    pub fn set_private_property(&mut self, exists: bool) {
        self.private_property_exists = exists;
    }

    /// Queue a crisis; its consciousness boost is applied on the next diffusion tick.
    pub fn report_crisis(&mut self, kind: &str, severity: f64) {
        self.pending_crises.push(Crisis {
            kind: kind.to_string(),
            severity: severity.clamp(0.0, 1.0),
        });
    }

    pub(crate) fn take_crises(&mut self) -> Vec<Crisis> {
        std::mem::take(&mut self.pending_crises)
    }

    /// Re-derive every agent's class from its facts, refresh the per-class
    /// averages and recompute wealth inequality. Intellectuals who are no longer
    /// among the agents are dropped. Returns how many agents changed class.
    pub fn classify(&mut self, year: u32) -> usize {
        let changed = self
            .classes
            .reclassify_all(&self.agents, self.private_property_exists, year);
        let departed: Vec<AgentId> = self
            .consciousness
            .organic_intellectuals()
            .iter()
            .copied()
            .filter(|agent| !self.agents.contains_key(agent))
            .collect();
        for agent in departed {
            self.consciousness.forget(agent);
        }
        self.classes.update_class_averages(&self.agents);
        self.inequality = ClassSystem::calculate_inequality(self.agents.values().map(|f| f.wealth));
        changed
    }

    // -- Events --

    /// Log an event at the current date and return its id.
    pub fn add_event(
        &mut self,
        kind: EventKind,
        description: String,
        conflict_id: Option<String>,
        data: serde_json::Value,
    ) -> u64 {
        let id = self.id_gen.next_id();
        self.events.insert(
            id,
            Event {
                id,
                kind,
                date: self.current_date,
                description,
                conflict_id,
                data,
            },
        );
        id
    }

    pub fn events_of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.values().filter(move |e| e.kind == kind)
    }

    // -- Outbound --

    pub fn statistics(&self) -> ClassStatistics {
        let consciousness = self
            .classes
            .classes()
            .values()
            .filter(|c| c.label.is_exploited())
            .map(|c| {
                (
                    c.label.display_name().to_string(),
                    ConsciousnessInfo {
                        level: c.class_consciousness,
                        phase: ConsciousnessPhase::from_level(c.class_consciousness),
                    },
                )
            })
            .collect();

        let conflicts = self.classes.conflicts();
        ClassStatistics {
            year: self.current_date.year(),
            classes_emerged: self.classes.classes_emerged(),
            first_class_year: self.classes.first_class_year(),
            distribution: self.classes.get_class_distribution(),
            dominant_class: self
                .classes
                .get_dominant_class()
                .map(|l| l.display_name().to_string()),
            inequality: self.inequality,
            tension: self.classes.check_class_tension(),
            consciousness,
            active_conflicts: conflicts.iter().filter(|c| c.is_active()).count(),
            total_conflicts: conflicts.len(),
            organic_intellectuals: self.consciousness.organic_intellectuals().len(),
        }
    }

    pub fn check_consistency(&self) -> ConsistencyReport {
        consistency::check_society(self)
    }

    // -- Persistence --

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.classes, &self.consciousness)
    }

    /// Write the class-engine state as pretty JSON.
    pub fn save_state(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)
    }

    /// Replace the class-engine state with the one saved at `path`.
    pub fn load_state(&mut self, path: &Path) -> io::Result<()> {
        let json = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        let (classes, consciousness) = snapshot.restore();
        self.classes = classes;
        self.consciousness = consciousness;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessInfo {
    pub level: f64,
    pub phase: ConsciousnessPhase,
}

/// Serializable summary of the class structure at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub year: u32,
    pub classes_emerged: bool,
    pub first_class_year: Option<u32>,
    pub distribution: BTreeMap<String, usize>,
    pub dominant_class: Option<String>,
    pub inequality: f64,
    pub tension: f64,
    /// Exploited classes only.
    pub consciousness: BTreeMap<String, ConsciousnessInfo>,
    pub active_conflicts: usize,
    pub total_conflicts: usize,
    pub organic_intellectuals: usize,
}
