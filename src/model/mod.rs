#[macro_use]
mod macros;

pub mod agent;
pub mod class_label;
pub mod conflict;
pub mod consciousness;
pub mod date;
pub mod event;
pub mod snapshot;
pub mod social_class;
pub mod society;

pub use agent::{AgentFacts, AgentId};
pub use class_label::ClassLabel;
pub use conflict::{ClassConflict, ConflictOutcome, ConflictStage, ConflictType};
pub use consciousness::{ConsciousnessPhase, ConsciousnessSpreadEvent};
pub use date::SimDate;
pub use event::{Event, EventKind};
pub use snapshot::{EmergenceRecord, Snapshot};
pub use social_class::SocialClass;
pub use society::{ClassStatistics, ConsciousnessInfo, Crisis, Society};
