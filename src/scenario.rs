use std::io;

use crate::model::{AgentFacts, AgentId, Society};
use crate::sim::{SimConfig, SimSystem, run};

/// Typed reference to an agent in a [`Scenario`], enabling chained fact mutation.
///
/// Created by [`Scenario::agent`] (creation) or [`Scenario::agent_mut`] (mutation).
/// Call [`.id()`](AgentRef::id) to terminate the chain and extract the agent ID.
pub struct AgentRef<'a> {
    scenario: &'a mut Scenario,
    id: AgentId,
}

impl<'a> AgentRef<'a> {
    fn facts_mut(&mut self) -> &mut AgentFacts {
        self.scenario.society.agents.entry(self.id).or_default()
    }

    pub fn wealth(mut self, v: f64) -> Self { self.facts_mut().wealth = v; self }
    pub fn property(mut self, v: f64) -> Self { self.facts_mut().property = v; self }
    pub fn owns_land(mut self) -> Self { self.facts_mut().owns_land = true; self }
    pub fn owns_tools(mut self) -> Self { self.facts_mut().owns_tools = true; self }
    pub fn owns_livestock(mut self) -> Self { self.facts_mut().owns_livestock = true; self }
    pub fn works_for_others(mut self) -> Self { self.facts_mut().works_for_others = true; self }
    pub fn elder(mut self) -> Self { self.facts_mut().is_elder = true; self }
    pub fn chief(mut self) -> Self { self.facts_mut().is_chief = true; self }
    pub fn intelligence(mut self, v: u8) -> Self { self.facts_mut().intelligence = v; self }
    pub fn belief(mut self, v: &str) -> Self { self.facts_mut().beliefs.push(v.to_string()); self }

    /// Mutual tie with `other` at the given strength.
    pub fn tie(mut self, other: AgentId, strength: f64) -> Self {
        self.facts_mut().ties.insert(other, strength);
        self.scenario.society.agents.entry(other).or_default().ties.insert(self.id, strength);
        self
    }

    /// Escape hatch: apply an arbitrary closure to the agent's facts.
    pub fn with(mut self, f: impl FnOnce(&mut AgentFacts)) -> Self { f(self.facts_mut()); self }

    /// Terminate the chain and return the agent ID.
    pub fn id(self) -> AgentId { self.id }
}

/// Fluent builder for constructing a [`Society`] in tests.
///
/// Agents get sequential ids starting at 1. Nothing is classified until
/// [`Scenario::classified`] or a simulation run.
pub struct Scenario {
    society: Society,
    next_agent: AgentId,
    start_year: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Create a new scenario starting at year 1.
    pub fn new() -> Self {
        Self::at_year(1)
    }

    /// Create a new scenario starting at the given year.
    pub fn at_year(year: u32) -> Self {
        Self {
            society: Society::new(year),
            next_agent: 1,
            start_year: year,
        }
    }

    pub fn with_private_property(mut self) -> Self {
        self.society.set_private_property(true);
        self
    }

    // -- Agent creation --

    /// Add an agent with default facts and return a builder ref for it.
    pub fn agent(&mut self) -> AgentRef<'_> {
        let id = self.next_agent;
        self.next_agent += 1;
        self.society.set_agent_facts(id, AgentFacts::default());
        AgentRef { scenario: self, id }
    }

    /// Return a builder ref for an existing agent.
    pub fn agent_mut(&mut self, id: AgentId) -> AgentRef<'_> {
        assert!(self.society.agents.contains_key(&id), "agent {id} does not exist");
        AgentRef { scenario: self, id }
    }

    pub fn landowner(&mut self, wealth: f64) -> AgentId {
        self.agent().with(|f| *f = AgentFacts::landowner(wealth)).id()
    }

    pub fn craftsman(&mut self, wealth: f64) -> AgentId {
        self.agent().with(|f| *f = AgentFacts::craftsman(wealth)).id()
    }

    pub fn laborer(&mut self, wealth: f64) -> AgentId {
        self.agent().with(|f| *f = AgentFacts::laborer(wealth)).id()
    }

    pub fn landless(&mut self, wealth: f64) -> AgentId {
        self.agent().with(|f| *f = AgentFacts::landless(wealth)).id()
    }

    /// `count` landless agents all tied to each other at `strength`.
    pub fn landless_community(&mut self, count: usize, wealth: f64, strength: f64) -> Vec<AgentId> {
        let ids: Vec<AgentId> = (0..count).map(|_| self.landless(wealth)).collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                self.agent_mut(a).tie(b, strength);
            }
        }
        ids
    }

    // -- Output --

    /// Borrow the society for inspection.
    pub fn society(&self) -> &Society {
        &self.society
    }

    /// Borrow the society mutably for additional modifications.
    pub fn society_mut(&mut self) -> &mut Society {
        &mut self.society
    }

    /// Consume the scenario and return the constructed society, unclassified.
    pub fn build(self) -> Society {
        self.society
    }

    /// Consume the scenario and return the society after one classification pass.
    pub fn classified(self) -> Society {
        let mut society = self.society;
        society.classify(society.current_date.year());
        society
    }

    /// Build the society and run the given systems. Uses the scenario's start year.
    pub fn run(
        self,
        systems: &mut [Box<dyn SimSystem>],
        num_years: u32,
        seed: u64,
    ) -> io::Result<Society> {
        let start_year = self.start_year;
        let mut society = self.build();
        run(
            &mut society,
            systems,
            SimConfig::new(start_year, num_years, seed),
        )?;
        Ok(society)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassLabel;

    #[test]
    fn agents_get_sequential_ids() {
        let mut s = Scenario::at_year(5);
        let a = s.landowner(100.0);
        let b = s.laborer(3.0);
        assert_eq!((a, b), (1, 2));
        assert!(s.society().agents[&a].owns_land);
        assert_eq!(s.society().current_date.year(), 5);
    }

    #[test]
    fn ties_are_mutual() {
        let mut s = Scenario::new();
        let ids = s.landless_community(3, 1.0, 0.7);
        let society = s.build();
        for &a in &ids {
            assert_eq!(society.agents[&a].social_connections(), 2);
        }
        assert_eq!(society.agents[&ids[0]].tie_strength(ids[2]), Some(0.7));
    }

    #[test]
    fn chained_builder() {
        let mut s = Scenario::new().with_private_property();
        let id = s.agent().owns_tools().wealth(40.0).intelligence(16).belief("equality").id();
        let society = s.classified();
        assert_eq!(society.classes.npc_class(id), Some(ClassLabel::Craftsman));
        assert_eq!(society.agents[&id].intelligence, 16);
    }
}
