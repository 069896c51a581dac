use rand::Rng;

use super::consciousness::ClassConsciousnessSystem;
use super::context::TickContext;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency};
use crate::model::{AgentId, EventKind};

/// A crisis must raise consciousness by more than this to be logged as an event.
const NOTABLE_CRISIS_BOOST: f64 = 0.1;

/// Monthly spread of class consciousness along social ties.
///
/// Each month every classified agent talks to one of its ties, chosen uniformly;
/// the conversation happens with probability equal to the tie's strength.
/// Crises reported since the last tick are felt first. Once a year agents that
/// clear the thresholds are promoted to organic intellectuals.
pub struct ConsciousnessDiffusionSystem;

impl SimSystem for ConsciousnessDiffusionSystem {
    fn name(&self) -> &str {
        "consciousness_diffusion"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Monthly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        apply_crises(ctx);
        spread_along_ties(ctx);
        if ctx.society.current_date.is_year_start() {
            promote_intellectuals(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Crises
// ---------------------------------------------------------------------------

fn apply_crises(ctx: &mut TickContext) {
    for crisis in ctx.society.take_crises() {
        let society = &mut *ctx.society;
        let boost = society
            .consciousness
            .crisis_effect(&mut society.classes, crisis.severity);
        tracing::debug!(kind = %crisis.kind, severity = crisis.severity, boost, "crisis felt");
        if boost <= NOTABLE_CRISIS_BOOST {
            continue;
        }

        let event_id = ctx.society.add_event(
            EventKind::Crisis,
            format!(
                "Crisis ({}) raised class consciousness by {:.0}%",
                crisis.kind,
                boost * 100.0
            ),
            None,
            serde_json::json!({ "kind": crisis.kind, "severity": crisis.severity, "boost": boost }),
        );
        ctx.signals.push(Signal {
            event_id,
            kind: SignalKind::CrisisReported {
                kind: crisis.kind,
                boost,
            },
        });
    }
}

// ---------------------------------------------------------------------------
// Spread
// ---------------------------------------------------------------------------

fn spread_along_ties(ctx: &mut TickContext) {
    struct Contact {
        from: AgentId,
        to: AgentId,
        strength: f64,
        receptivity: f64,
    }

    let society = &mut *ctx.society;
    if !society.classes.classes_emerged() {
        return;
    }

    let mut contacts = Vec::new();
    for (&from, facts) in &society.agents {
        let exploited = society
            .classes
            .npc_class(from)
            .is_some_and(|l| l.is_exploited());
        if !exploited || facts.ties.is_empty() {
            continue;
        }
        let pick = ctx.rng.random_range(0..facts.ties.len());
        let Some((&to, &strength)) = facts.ties.iter().nth(pick) else {
            continue;
        };
        if !ctx.rng.random_bool(strength.clamp(0.0, 1.0)) {
            continue;
        }
        let receptivity = society.agents.get(&to).map_or(1.0, |f| {
            ClassConsciousnessSystem::belief_receptivity(f.beliefs.as_slice())
        });
        contacts.push(Contact {
            from,
            to,
            strength,
            receptivity,
        });
    }

    let year = society.current_date.year();
    let mut spread = 0;
    for c in contacts {
        let event = society.consciousness.spread_with_receptivity(
            c.from,
            c.to,
            &mut society.classes,
            c.strength,
            c.receptivity,
            year,
            &mut *ctx.rng,
        );
        if event.is_some() {
            spread += 1;
        }
    }
    if spread > 0 {
        tracing::debug!(year, spread, "consciousness diffused");
    }
}

// ---------------------------------------------------------------------------
// Organic intellectuals
// ---------------------------------------------------------------------------

fn promote_intellectuals(ctx: &mut TickContext) {
    let society = &mut *ctx.society;
    let mut promoted = Vec::new();
    for (&agent, facts) in &society.agents {
        let Some(label) = society.classes.npc_class(agent) else {
            continue;
        };
        if !label.is_exploited() {
            continue;
        }
        let consciousness = society.classes.class(label).map_or(0.0, |c| c.class_consciousness);
        if society.consciousness.register_organic_intellectual(
            agent,
            facts.intelligence,
            consciousness,
            facts.social_connections(),
        ) {
            promoted.push((agent, label));
        }
    }

    for (agent, label) in promoted {
        tracing::info!(agent, label = label.tag(), "organic intellectual emerged");
        let event_id = ctx.society.add_event(
            EventKind::IntellectualEmerged,
            format!("Agent {agent} became an organic intellectual of the {label}"),
            None,
            serde_json::json!({ "agent": agent, "class": label.tag() }),
        );
        ctx.signals.push(Signal {
            event_id,
            kind: SignalKind::IntellectualEmerged { agent_id: agent },
        });
    }
}
