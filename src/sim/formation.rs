use super::context::TickContext;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency};
use crate::model::EventKind;

/// Yearly pass that turns collaborator-supplied economic facts into classes.
///
/// Re-derives every agent's label, refreshes class averages and inequality,
/// then recomputes inter-class relations from the resulting tension.
pub struct ClassFormationSystem;

impl SimSystem for ClassFormationSystem {
    fn name(&self) -> &str {
        "class_formation"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Yearly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let year = ctx.society.current_date.year();
        let was_emerged = ctx.society.classes.classes_emerged();

        let changed = ctx.society.classify(year);
        let tension = ctx.society.classes.check_class_tension();
        ctx.society.classes.update_class_relations(tension);

        tracing::debug!(
            year,
            changed,
            tension,
            inequality = ctx.society.inequality,
            "classes reclassified"
        );

        if !was_emerged && ctx.society.classes.classes_emerged() {
            announce_emergence(ctx, year);
        }
    }
}

fn announce_emergence(ctx: &mut TickContext, year: u32) {
    let distribution = ctx.society.classes.get_class_distribution();
    let labels: Vec<&str> = ctx
        .society
        .classes
        .emergence_history()
        .iter()
        .map(|(label, _)| label.tag())
        .collect();
    let data = serde_json::json!({
        "labels": labels,
        "distribution": distribution,
        "inequality": ctx.society.inequality,
    });

    tracing::info!(year, ?labels, "class society emerged");
    let event_id = ctx.society.add_event(
        EventKind::ClassesEmerged,
        format!("Classes emerged in year {year}"),
        None,
        data,
    );
    ctx.signals.push(Signal {
        event_id,
        kind: SignalKind::ClassesEmerged { year },
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassLabel, SimDate};
    use crate::scenario::Scenario;
    use crate::sim::dispatch_systems;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn tick_year(society: &mut crate::model::Society, year: u32) -> Vec<Signal> {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut signals = Vec::new();
        let mut ctx = TickContext {
            society,
            rng: &mut rng,
            signals: &mut signals,
            inbox: &[],
        };
        ctx.society.current_date = SimDate::from_year(year);
        ClassFormationSystem.tick(&mut ctx);
        signals
    }

    #[test]
    fn communal_society_has_no_classes() {
        let mut s = Scenario::at_year(1);
        s.agent().elder().id();
        s.agent().wealth(5.0).id();
        let mut society = s.build();

        let signals = tick_year(&mut society, 1);
        assert!(signals.is_empty());
        assert!(!society.classes.classes_emerged());
        assert_eq!(society.classes.class_size(ClassLabel::Elder), 1);
        assert_eq!(society.classes.class_size(ClassLabel::CommunalMember), 1);
    }

    #[test]
    fn private_property_produces_emergence_once() {
        let mut s = Scenario::at_year(40).with_private_property();
        s.landowner(300.0);
        s.landless(1.0);
        s.landless(2.0);
        let mut society = s.build();

        let signals = tick_year(&mut society, 40);
        assert_eq!(signals.len(), 1);
        assert!(matches!(signals[0].kind, SignalKind::ClassesEmerged { year: 40 }));
        assert_eq!(society.events_of_kind(EventKind::ClassesEmerged).count(), 1);
        assert_eq!(society.classes.first_class_year(), Some(40));
        assert!(society.inequality > 0.5);

        assert!(tick_year(&mut society, 41).is_empty());
        assert_eq!(society.classes.first_class_year(), Some(40));
    }

    #[test]
    fn relations_turn_hostile_between_antagonists() {
        let mut s = Scenario::at_year(1).with_private_property();
        let owner = s.landowner(300.0);
        s.landless(1.0);
        let mut society = s.build();
        tick_year(&mut society, 1);

        let landowner = society.classes.class(ClassLabel::Landowner).unwrap();
        assert!(landowner.relation_to(ClassLabel::Landless) < 0.0);
        assert_eq!(society.classes.npc_class(owner), Some(ClassLabel::Landowner));
    }

    #[test]
    fn departed_agents_are_dropped_on_next_pass() {
        let mut s = Scenario::at_year(1).with_private_property();
        s.landowner(100.0);
        let worker = s.laborer(3.0);
        let mut society = s.build();
        tick_year(&mut society, 1);
        assert_eq!(society.classes.class_size(ClassLabel::Laborer), 1);

        society.agents.remove(&worker);
        let mut systems: Vec<Box<dyn SimSystem>> = vec![Box::new(ClassFormationSystem)];
        let mut rng = SmallRng::seed_from_u64(0);
        dispatch_systems(&mut society, &mut systems, &mut rng, SimDate::from_year(2));
        assert_eq!(society.classes.npc_class(worker), None);
        assert_eq!(society.classes.class_size(ClassLabel::Laborer), 0);
    }
}
