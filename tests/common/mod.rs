use class_struggle::model::{AgentId, Society};
use class_struggle::scenario::Scenario;

/// A chief-landowner, a craftsman, and a tight-knit landless village of fifteen.
///
/// Two villagers hold egalitarian beliefs and one is sharp enough to become an
/// organic intellectual once consciousness is high.
pub fn build_test_society(start_year: u32) -> (Society, Vec<AgentId>) {
    let mut s = Scenario::at_year(start_year).with_private_property();
    s.agent().owns_land().chief().wealth(800.0).property(400.0).id();
    s.craftsman(60.0);
    let village = s.landless_community(15, 2.0, 0.8);
    s.agent_mut(village[0]).intelligence(16).belief("equality");
    s.agent_mut(village[1]).belief("collective_good");
    s.agent_mut(village[2]).belief("property_sacred");
    (s.build(), village)
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
