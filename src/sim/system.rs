use super::context::TickContext;

/// Cadence of a class system. Formation follows the yearly fact refresh,
/// diffusion runs monthly and conflicts advance daily.
///
/// Ordered coarsest-to-finest; the runner steps at the finest cadence present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickFrequency {
    Yearly,
    Monthly,
    /// 360 days a year, 30 per month.
    Daily,
}

/// One stage of the class engine, driven by the runner as `Box<dyn SimSystem>`.
pub trait SimSystem {
    fn name(&self) -> &str;
    fn frequency(&self) -> TickFrequency;
    fn tick(&mut self, ctx: &mut TickContext);

    /// React to signals emitted by other systems during Phase 1 (`tick()`).
    ///
    /// Called once per dispatch cycle with the full signal buffer in `ctx.inbox`.
    /// Signals pushed to `ctx.signals` here are **not** re-delivered (single-pass).
    /// Default: no-op.
    fn handle_signals(&mut self, ctx: &mut TickContext) {
        let _ = ctx;
    }
}
