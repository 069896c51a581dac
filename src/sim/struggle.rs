use super::class_system::ConflictReport;
use super::context::TickContext;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency};
use crate::model::{AgentId, ConflictOutcome, EventKind};

/// Daily conflict lifecycle: advance active conflicts, resolve the mature ones,
/// then give the society a chance to start a new one.
///
/// When a conflict starts, organic intellectuals of the oppressed class become its
/// leaders and chiefs of the ruling class join the suppression forces. Intellectuals
/// promoted later join any conflict their class is already fighting.
pub struct ClassStruggleSystem;

impl SimSystem for ClassStruggleSystem {
    fn name(&self) -> &str {
        "class_struggle"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        advance_conflicts(ctx);
        start_conflict(ctx);
    }

    fn handle_signals(&mut self, ctx: &mut TickContext) {
        for signal in ctx.inbox {
            if let SignalKind::IntellectualEmerged { agent_id } = signal.kind {
                join_as_leader(ctx, agent_id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ongoing conflicts
// ---------------------------------------------------------------------------

fn advance_conflicts(ctx: &mut TickContext) {
    let society = &mut *ctx.society;
    let date = society.current_date;
    let reports = society
        .classes
        .update_conflicts(&mut society.resolver, date, &mut *ctx.rng);

    for report in reports {
        match report {
            ConflictReport::StageChanged {
                conflict_id,
                from,
                to,
            } => {
                ctx.society.add_event(
                    EventKind::ConflictStageChanged,
                    format!(
                        "Conflict {conflict_id} moved from {} to {}",
                        from.display_name(),
                        to.display_name()
                    ),
                    Some(conflict_id),
                    serde_json::json!({ "from": from.tag(), "to": to.tag() }),
                );
            }
            ConflictReport::TypeChanged {
                conflict_id,
                from,
                to,
            } => {
                ctx.society.add_event(
                    EventKind::ConflictTypeChanged,
                    format!(
                        "The {} became a {}",
                        from.display_name(),
                        to.display_name()
                    ),
                    Some(conflict_id),
                    serde_json::json!({ "from": from.tag(), "to": to.tag() }),
                );
            }
            ConflictReport::Resolved {
                conflict_id,
                outcome,
                consequences,
            } => record_resolution(ctx, conflict_id, outcome, consequences),
        }
    }
}

fn record_resolution(
    ctx: &mut TickContext,
    conflict_id: String,
    outcome: ConflictOutcome,
    consequences: Vec<String>,
) {
    let event_id = ctx.society.add_event(
        EventKind::ConflictResolved,
        format!("Conflict {conflict_id} ended: {}", outcome.display_name()),
        Some(conflict_id.clone()),
        serde_json::json!({ "outcome": outcome.tag(), "consequences": consequences }),
    );
    for line in consequences {
        ctx.society.add_event(
            EventKind::ResolutionConsequence,
            line,
            Some(conflict_id.clone()),
            serde_json::Value::Null,
        );
    }

    let fraction = outcome.property_redistribution();
    if fraction > 0.0 {
        let redistribution_id = ctx.society.add_event(
            EventKind::PropertyRedistributed,
            format!(
                "{:.0}% of ruling-class property handed to the oppressed",
                fraction * 100.0
            ),
            Some(conflict_id.clone()),
            serde_json::json!({ "fraction": fraction }),
        );
        ctx.signals.push(Signal {
            event_id: redistribution_id,
            kind: SignalKind::PropertyRedistributed {
                conflict_id: conflict_id.clone(),
                fraction,
            },
        });
    }

    ctx.signals.push(Signal {
        event_id,
        kind: SignalKind::ConflictResolved {
            conflict_id,
            outcome,
        },
    });
}

// ---------------------------------------------------------------------------
// New conflicts
// ---------------------------------------------------------------------------

fn start_conflict(ctx: &mut TickContext) {
    let year = ctx.society.current_date.year();
    let Some(conflict) = ctx.society.classes.check_for_conflict(year, &mut *ctx.rng) else {
        return;
    };
    let conflict_id = conflict.id.clone();
    let oppressed = conflict.oppressed_class;
    let ruling = conflict.ruling_class;
    let description = format!(
        "{}: the {oppressed} rose against the {ruling}. Cause: {}",
        conflict.conflict_type.display_name(),
        conflict.primary_cause
    );
    let data = serde_json::json!({
        "conflict_type": conflict.conflict_type.tag(),
        "oppressed": oppressed.tag(),
        "ruling": ruling.tag(),
        "intensity": conflict.intensity,
        "participants": conflict.participants.len(),
    });

    enlist(ctx, &conflict_id);

    let event_id = ctx.society.add_event(
        EventKind::ConflictStarted,
        description,
        Some(conflict_id.clone()),
        data,
    );
    ctx.signals.push(Signal {
        event_id,
        kind: SignalKind::ConflictStarted { conflict_id },
    });
}

/// Fill a fresh conflict's leaders and suppression forces from its participants.
fn enlist(ctx: &mut TickContext, conflict_id: &str) {
    let society = &mut *ctx.society;
    let Some(conflict) = society.classes.conflict_mut(conflict_id) else {
        return;
    };
    let participants: Vec<_> = conflict
        .participants
        .iter()
        .map(|(&agent, &label)| (agent, label))
        .collect();
    for (agent, label) in participants {
        if label == conflict.oppressed_class && society.consciousness.is_organic_intellectual(agent)
        {
            conflict.add_leader(agent);
        } else if label == conflict.ruling_class
            && society.agents.get(&agent).is_some_and(|f| f.is_chief)
        {
            conflict.add_suppression_force(agent);
        }
    }
}

fn join_as_leader(ctx: &mut TickContext, agent: AgentId) {
    let Some(label) = ctx.society.classes.npc_class(agent) else {
        return;
    };
    let ids: Vec<String> = ctx
        .society
        .classes
        .get_active_conflicts()
        .into_iter()
        .filter(|c| c.oppressed_class == label)
        .map(|c| c.id.clone())
        .collect();
    for id in ids {
        if let Some(conflict) = ctx.society.classes.conflict_mut(&id) {
            conflict.add_participant(agent, label);
            if conflict.add_leader(agent) {
                tracing::debug!(agent, conflict = %id, "intellectual leads conflict");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::model::{ClassLabel, ConflictStage, SimDate, Society};
    use crate::scenario::Scenario;
    use crate::sim::dispatch_systems;

    /// One landowner (a chief) against a conscious, numerous landless class.
    fn tense_society() -> (Society, AgentId, Vec<AgentId>) {
        let mut s = Scenario::at_year(200).with_private_property();
        let owner = s.agent().owns_land().chief().wealth(900.0).id();
        let landless = s.landless_community(12, 1.0, 0.8);
        let mut society = s.classified();
        society
            .classes
            .increase_class_consciousness(ClassLabel::Landless, 0.6);
        (society, owner, landless)
    }

    fn run_days(society: &mut Society, days: u32, seed: u64) -> Vec<Signal> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut all = Vec::new();
        for day in 1..=days {
            let mut signals = Vec::new();
            society.current_date = SimDate::new(200, day);
            let mut ctx = TickContext {
                society,
                rng: &mut rng,
                signals: &mut signals,
                inbox: &[],
            };
            ClassStruggleSystem.tick(&mut ctx);
            all.extend(signals);
        }
        all
    }

    #[test]
    fn high_tension_starts_a_conflict() {
        let (mut society, owner, _) = tense_society();
        // Tension is capped at 1.0, so every day has a spawn chance of at least 0.7.
        let signals = run_days(&mut society, 20, 9);

        assert!(signals
            .iter()
            .any(|s| matches!(s.kind, SignalKind::ConflictStarted { .. })));
        let conflict = &society.classes.conflicts()[0];
        assert_eq!(conflict.oppressed_class, ClassLabel::Landless);
        assert_eq!(conflict.ruling_class, ClassLabel::Landowner);
        assert_eq!(conflict.participants.len(), 13);
        assert!(conflict.suppression_forces.contains(&owner));
        assert_eq!(society.events_of_kind(EventKind::ConflictStarted).count(), 1);
    }

    #[test]
    fn intellectuals_lead_new_conflicts() {
        let (mut society, _, landless) = tense_society();
        society
            .consciousness
            .register_organic_intellectual(landless[0], 15, 0.9, 11);
        run_days(&mut society, 20, 9);

        let conflict = &society.classes.conflicts()[0];
        assert!(conflict.leaders.contains(&landless[0]));
        assert!((conflict.organization_level - 0.1).abs() < 1e-9);
    }

    #[test]
    fn late_intellectual_joins_active_conflict() {
        let (mut society, _, landless) = tense_society();
        run_days(&mut society, 20, 9);
        let id = society.classes.conflicts()[0].id.clone();

        let inbox = vec![Signal {
            event_id: 0,
            kind: SignalKind::IntellectualEmerged { agent_id: landless[3] },
        }];
        let mut rng = SmallRng::seed_from_u64(0);
        let mut signals = Vec::new();
        let mut ctx = TickContext {
            society: &mut society,
            rng: &mut rng,
            signals: &mut signals,
            inbox: &inbox,
        };
        ClassStruggleSystem.handle_signals(&mut ctx);

        assert!(society.classes.conflict(&id).unwrap().leaders.contains(&landless[3]));
    }

    #[test]
    fn conflicts_eventually_resolve_with_cooldown() {
        let (mut society, _, _) = tense_society();
        let mut systems: Vec<Box<dyn SimSystem>> = vec![Box::new(ClassStruggleSystem)];
        let mut rng = SmallRng::seed_from_u64(3);
        for day in 1..=360 {
            dispatch_systems(&mut society, &mut systems, &mut rng, SimDate::new(200, day));
        }
        for day in 1..=360 {
            dispatch_systems(&mut society, &mut systems, &mut rng, SimDate::new(201, day));
        }

        let resolved: Vec<_> = society
            .classes
            .conflicts()
            .iter()
            .filter(|c| c.resolved)
            .collect();
        assert!(!resolved.is_empty());
        for conflict in &resolved {
            assert_eq!(conflict.stage, ConflictStage::Resolved);
            assert!(conflict.outcome.is_some());
            assert!(conflict.year_resolved.is_some());
        }
        assert_eq!(
            society.events_of_kind(EventKind::ConflictResolved).count(),
            resolved.len()
        );
    }
}
