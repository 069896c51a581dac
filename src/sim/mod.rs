mod class_system;
mod consciousness;
mod context;
mod diffusion;
mod formation;
mod resolver;
mod runner;
pub mod signal;
mod struggle;
mod system;

pub use class_system::{CONFLICT_COOLDOWN_DAYS, ClassSystem, ConflictReport};
pub use consciousness::ClassConsciousnessSystem;
pub use context::TickContext;
pub use diffusion::ConsciousnessDiffusionSystem;
pub use formation::ClassFormationSystem;
pub use resolver::{ConflictResolver, ResolutionRecord};
pub use runner::{SimConfig, dispatch_systems, run, should_fire};
pub use signal::{Signal, SignalKind};
pub use struggle::ClassStruggleSystem;
pub use system::{SimSystem, TickFrequency};

/// The class engine's systems in dispatch order: formation, diffusion, struggle.
pub fn default_systems() -> Vec<Box<dyn SimSystem>> {
    vec![
        Box::new(ClassFormationSystem),
        Box::new(ConsciousnessDiffusionSystem),
        Box::new(ClassStruggleSystem),
    ]
}
