//! Components that make progress one T-state at a time.

use crate::Ticks;

/// Something that can run on its own, one T-state per tick.
///
/// A CPU alone only drives its pins. A `Tickable` also answers them, such
/// as a CPU paired with the memory behind its bus.
pub trait Tickable {
    /// Advance by one T-state.
    fn tick(&mut self);

    /// Advance by `count` T-states.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
