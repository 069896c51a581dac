pub mod consistency;
pub mod flush;
pub mod id;
pub mod model;
pub mod scenario;
pub mod sim;

pub use id::IdGenerator;
pub use model::{
    AgentFacts, AgentId, ClassConflict, ClassLabel, ClassStatistics, ConflictOutcome,
    ConflictStage, ConflictType, ConsciousnessPhase, Event, EventKind, SimDate, Snapshot,
    SocialClass, Society,
};
pub use sim::{SimConfig, default_systems, run};
