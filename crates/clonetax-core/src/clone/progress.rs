//! Progress reporting side channel.

/// Receives progress notifications from a clone run.
///
/// Purely observational: the engine drives a sink once per completed term
/// from its single sequential loop, and nothing the sink does feeds back
/// into control flow.
pub trait ProgressSink {
    /// Called once before the first term, with the total term count.
    fn begin(&mut self, total: u64);

    /// Called after each completed term.
    fn tick(&mut self);

    /// Called once after the last term.
    fn finish(&mut self);
}

/// A sink that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin(&mut self, _total: u64) {}
    fn tick(&mut self) {}
    fn finish(&mut self) {}
}
