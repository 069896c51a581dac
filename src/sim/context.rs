use rand::RngCore;

use super::signal::Signal;
use crate::model::Society;

/// Context passed to each class system on every tick.
///
/// Systems read agent facts and mutate class-engine state through `society`;
/// events go into its log and cross-system notices into `signals`.
pub struct TickContext<'a> {
    pub society: &'a mut Society,
    pub rng: &'a mut dyn RngCore,
    /// Systems push signals here during tick/handle_signals.
    pub signals: &'a mut Vec<Signal>,
    /// Signals emitted by other systems in the previous pass (read-only).
    pub inbox: &'a [Signal],
}
