use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::class_label::ClassLabel;

/// Aggregate record for one class.
///
/// `members` is a derived index of the owning `ClassSystem` and can only be changed from
/// inside the crate; the scalar fields are free to adjust.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialClass {
    pub label: ClassLabel,
    members: BTreeSet<AgentId>,
    pub avg_wealth: f64,
    pub avg_property: f64,
    /// Influence over collective decisions, 0.0–1.0.
    pub political_power: f64,
    /// Awareness of shared interest, 0.0–1.0.
    pub class_consciousness: f64,
    /// Attitude toward other classes, -1.0–1.0.
    pub relations: BTreeMap<ClassLabel, f64>,
}

impl SocialClass {
    pub fn new(label: ClassLabel) -> Self {
        Self {
            label,
            members: BTreeSet::new(),
            avg_wealth: 0.0,
            avg_property: 0.0,
            political_power: label.base_political_power(),
            class_consciousness: 0.0,
            relations: BTreeMap::new(),
        }
    }

    pub fn members(&self) -> &BTreeSet<AgentId> {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, agent: AgentId) -> bool {
        self.members.contains(&agent)
    }

    pub(crate) fn insert_member(&mut self, agent: AgentId) {
        self.members.insert(agent);
    }

    /// Removing a non-member is a no-op.
    pub(crate) fn remove_member(&mut self, agent: AgentId) -> bool {
        self.members.remove(&agent)
    }

    pub(crate) fn clear_members(&mut self) {
        self.members.clear();
    }

    /// Add `delta` to consciousness, clamped to 0.0–1.0. Returns the change actually applied.
    pub fn adjust_consciousness(&mut self, delta: f64) -> f64 {
        let before = self.class_consciousness;
        self.class_consciousness = (before + delta).clamp(0.0, 1.0);
        self.class_consciousness - before
    }

    /// Add `delta` to political power, clamped to 0.0–1.0.
    pub fn adjust_political_power(&mut self, delta: f64) {
        self.political_power = (self.political_power + delta).clamp(0.0, 1.0);
    }

    /// Shift the relation toward `other` by `delta`, clamped to -1.0–1.0.
    pub fn adjust_relation(&mut self, other: ClassLabel, delta: f64) {
        let entry = self.relations.entry(other).or_insert(0.0);
        *entry = (*entry + delta).clamp(-1.0, 1.0);
    }

    pub fn relation_to(&self, other: ClassLabel) -> f64 {
        self.relations.get(&other).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_member() {
        let mut class = SocialClass::new(ClassLabel::Landless);
        class.insert_member(1);
        assert!(class.has_member(1));
        assert_eq!(class.size(), 1);

        class.insert_member(2);
        assert_eq!(class.size(), 2);

        assert!(class.remove_member(1));
        assert!(!class.has_member(1));
        assert_eq!(class.size(), 1);
    }

    #[test]
    fn remove_nonexistent_member_is_noop() {
        let mut class = SocialClass::new(ClassLabel::Landless);
        assert!(!class.remove_member(99));
        assert_eq!(class.size(), 0);
    }

    #[test]
    fn new_class_seeds_political_power_from_label() {
        assert!((SocialClass::new(ClassLabel::Landowner).political_power - 0.5).abs() < f64::EPSILON);
        assert!(SocialClass::new(ClassLabel::Laborer).political_power.abs() < f64::EPSILON);
    }

    #[test]
    fn consciousness_clamps_and_reports_applied_delta() {
        let mut class = SocialClass::new(ClassLabel::Laborer);
        class.class_consciousness = 0.9;
        let applied = class.adjust_consciousness(0.5);
        assert!((class.class_consciousness - 1.0).abs() < f64::EPSILON);
        assert!((applied - 0.1).abs() < 1e-10);

        class.adjust_consciousness(-3.0);
        assert!(class.class_consciousness.abs() < f64::EPSILON);
    }

    #[test]
    fn relations_clamp() {
        let mut class = SocialClass::new(ClassLabel::Landless);
        class.adjust_relation(ClassLabel::Landowner, -0.7);
        class.adjust_relation(ClassLabel::Landowner, -0.7);
        assert!((class.relation_to(ClassLabel::Landowner) + 1.0).abs() < f64::EPSILON);
        assert!(class.relation_to(ClassLabel::Chief).abs() < f64::EPSILON);
    }
}
