use serde::{Deserialize, Serialize};

use crate::model::{AgentId, ConflictOutcome};

/// A signal emitted by one system and consumed by others.
/// Carries the id of the event that caused it so reactions can refer back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// The event that triggered this signal.
    pub event_id: u64,
    /// What happened.
    pub kind: SignalKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// The first class other than communal membership appeared.
    ClassesEmerged { year: u32 },

    /// A new conflict was spawned.
    ConflictStarted { conflict_id: String },

    /// A conflict reached an outcome.
    ConflictResolved {
        conflict_id: String,
        outcome: ConflictOutcome,
    },

    /// An outcome hands part of the ruling class's property to the oppressed side.
    /// Ownership itself lives with the economy collaborator.
    PropertyRedistributed { conflict_id: String, fraction: f64 },

    /// A reported crisis raised exploited-class consciousness.
    CrisisReported { kind: String, boost: f64 },

    /// An agent was promoted to organic intellectual.
    IntellectualEmerged { agent_id: AgentId },
}
