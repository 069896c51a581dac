//! Cross-checks between collaborator facts and class-engine state.
//!
//! Nothing here mutates the society; drift is reported, logged and left for
//! the next formation pass (or the caller) to repair.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{AgentId, Society};

/// At most this many offending ids are listed in an issue's details.
const MAX_LISTED_IDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Info,
    Warning,
    Error,
    /// The simulation may misbehave if it continues.
    Critical,
}

impl ConsistencyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsistencyLevel::Info => "INFO",
            ConsistencyLevel::Warning => "WARNING",
            ConsistencyLevel::Error => "ERROR",
            ConsistencyLevel::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub level: ConsistencyLevel,
    /// Area affected: `classes`, `conflicts` or `consciousness`.
    pub system: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level.as_str(), self.system, self.description)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub checks_performed: u32,
    pub year: u32,
}

impl ConsistencyReport {
    pub fn add(
        &mut self,
        level: ConsistencyLevel,
        system: &str,
        description: String,
        details: serde_json::Value,
        suggestion: &str,
    ) {
        self.issues.push(ConsistencyIssue {
            level,
            system: system.to_string(),
            description,
            details,
            suggestion: suggestion.to_string(),
        });
    }

    /// No errors or critical issues. Warnings are tolerated.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.level == ConsistencyLevel::Critical)
    }

    /// Errors and critical issues.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.level >= ConsistencyLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues_by_level(ConsistencyLevel::Warning).count()
    }

    pub fn issues_by_level(&self, level: ConsistencyLevel) -> impl Iterator<Item = &ConsistencyIssue> {
        self.issues.iter().filter(move |i| i.level == level)
    }

    pub fn issues_by_system<'a>(
        &'a self,
        system: &'a str,
    ) -> impl Iterator<Item = &'a ConsistencyIssue> {
        self.issues.iter().filter(move |i| i.system == system)
    }

    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return format!("consistency ok: {} checks passed", self.checks_performed);
        }
        format!(
            "consistency: {} issues ({} errors, {} warnings) in {} checks",
            self.issues.len(),
            self.error_count(),
            self.warning_count(),
            self.checks_performed
        )
    }

    /// Emit every issue through `tracing` at a matching level.
    pub fn log(&self) {
        for issue in &self.issues {
            match issue.level {
                ConsistencyLevel::Critical | ConsistencyLevel::Error => tracing::error!(
                    severity = issue.level.as_str(),
                    system = %issue.system,
                    details = %issue.details,
                    "{}",
                    issue.description
                ),
                ConsistencyLevel::Warning => tracing::warn!(
                    system = %issue.system,
                    details = %issue.details,
                    "{}",
                    issue.description
                ),
                ConsistencyLevel::Info => tracing::info!(
                    system = %issue.system,
                    "{}",
                    issue.description
                ),
            }
        }
    }
}

fn listed(ids: &[AgentId]) -> Vec<AgentId> {
    ids.iter().take(MAX_LISTED_IDS).copied().collect()
}

/// Check the class engine against the agents the collaborators currently report.
pub fn check_society(society: &Society) -> ConsistencyReport {
    let mut report = ConsistencyReport {
        year: society.current_date.year(),
        ..ConsistencyReport::default()
    };
    check_classes(society, &mut report);
    check_conflicts(society, &mut report);
    check_intellectuals(society, &mut report);

    report.log();
    report
}

fn check_classes(society: &Society, report: &mut ConsistencyReport) {
    let classes = &society.classes;

    report.checks_performed += 1;
    if !classes.classes_emerged() {
        if !society.agents.is_empty() {
            report.add(
                ConsistencyLevel::Info,
                "classes",
                "no class society yet".to_string(),
                serde_json::Value::Null,
                "",
            );
        }
    } else {
        let classless: Vec<AgentId> = society
            .agents
            .keys()
            .filter(|id| classes.npc_class(**id).is_none())
            .copied()
            .collect();
        if !classless.is_empty() {
            report.add(
                ConsistencyLevel::Warning,
                "classes",
                format!("{} living agents have no class after emergence", classless.len()),
                serde_json::json!({ "agent_ids": listed(&classless) }),
                "run a class formation pass",
            );
        }
    }

    report.checks_performed += 1;
    for class in classes.classes().values() {
        let missing: Vec<AgentId> = class
            .members()
            .iter()
            .filter(|id| !society.agents.contains_key(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            report.add(
                ConsistencyLevel::Error,
                "classes",
                format!("class {} contains agents that no longer exist", class.label),
                serde_json::json!({ "class": class.label.tag(), "missing_ids": listed(&missing) }),
                "call Society::remove_agent when an agent dies or leaves",
            );
        }
    }

    report.checks_performed += 1;
    for (&agent, &label) in classes.npc_classes() {
        if !classes.class(label).is_some_and(|c| c.has_member(agent)) {
            report.add(
                ConsistencyLevel::Critical,
                "classes",
                format!("agent {agent} is indexed as {label} but is not a member"),
                serde_json::json!({ "agent_id": agent, "class": label.tag() }),
                "",
            );
        }
    }
    for class in classes.classes().values() {
        for &agent in class.members() {
            if classes.npc_class(agent) != Some(class.label) {
                report.add(
                    ConsistencyLevel::Critical,
                    "classes",
                    format!("agent {agent} is a member of {} but not indexed there", class.label),
                    serde_json::json!({ "agent_id": agent, "class": class.label.tag() }),
                    "",
                );
            }
        }
    }
}

fn check_conflicts(society: &Society, report: &mut ConsistencyReport) {
    report.checks_performed += 1;
    for conflict in society.classes.get_active_conflicts() {
        let gone: BTreeSet<AgentId> = conflict
            .participants
            .keys()
            .chain(conflict.leaders.iter())
            .chain(conflict.suppression_forces.iter())
            .filter(|id| !society.agents.contains_key(*id))
            .copied()
            .collect();
        if gone.is_empty() {
            continue;
        }
        let gone: Vec<AgentId> = gone.into_iter().collect();
        report.add(
            ConsistencyLevel::Warning,
            "conflicts",
            format!(
                "conflict {} has {} participants that no longer exist",
                conflict.id,
                gone.len()
            ),
            serde_json::json!({ "conflict_id": conflict.id, "missing_ids": listed(&gone) }),
            "call Society::remove_agent when an agent dies or leaves",
        );
    }
}

fn check_intellectuals(society: &Society, report: &mut ConsistencyReport) {
    report.checks_performed += 1;
    let gone: Vec<AgentId> = society
        .consciousness
        .organic_intellectuals()
        .iter()
        .filter(|id| !society.agents.contains_key(*id))
        .copied()
        .collect();
    if !gone.is_empty() {
        report.add(
            ConsistencyLevel::Warning,
            "consciousness",
            format!("{} organic intellectuals no longer exist", gone.len()),
            serde_json::json!({ "agent_ids": listed(&gone) }),
            "",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentFacts;
    use crate::scenario::Scenario;

    #[test]
    fn freshly_classified_society_is_clean() {
        let mut s = Scenario::at_year(10).with_private_property();
        s.landowner(100.0);
        s.laborer(2.0);
        let report = s.classified().check_consistency();
        assert!(report.issues.is_empty());
        assert!(report.is_valid());
        assert_eq!(report.checks_performed, 5);
        assert!(report.summary().starts_with("consistency ok"));
    }

    #[test]
    fn pre_emergence_is_informational() {
        let mut s = Scenario::at_year(1);
        s.agent().elder().id();
        let report = s.classified().check_consistency();
        assert_eq!(report.issues_by_level(ConsistencyLevel::Info).count(), 1);
        assert!(report.is_valid());
    }

    #[test]
    fn vanished_agent_is_an_error() {
        let mut s = Scenario::at_year(10).with_private_property();
        s.landowner(100.0);
        let worker = s.laborer(2.0);
        let mut society = s.classified();

        // Dropped without remove_agent.
        society.agents.remove(&worker);
        let report = society.check_consistency();
        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
        let issue = report.issues_by_system("classes").next().unwrap();
        assert_eq!(issue.details["missing_ids"][0], worker);

        society.remove_agent(worker);
        assert!(society.check_consistency().is_valid());
    }

    #[test]
    fn unclassified_newcomer_is_a_warning() {
        let mut s = Scenario::at_year(10).with_private_property();
        s.landowner(100.0);
        s.laborer(2.0);
        let mut society = s.classified();
        society.set_agent_facts(99, AgentFacts::laborer(1.0));

        let report = society.check_consistency();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);
        assert!(report.issues[0].to_string().starts_with("[WARNING] classes"));
    }

    #[test]
    fn level_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&ConsistencyLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }
}
