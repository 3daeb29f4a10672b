//! Processor state shared by every sequencer.

use crate::pins::Pins;
use crate::registers::Registers;

/// Registers plus pins: everything a machine cycle, addressing mode or
/// instruction may touch while it is being clocked.
///
/// Sequencers never hold on to this. They borrow it for the duration of a
/// single clock pulse, which keeps all mutation of processor state behind
/// one exclusive borrow per pulse.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub regs: Registers,
    pub pins: Pins,
    /// Set by EI; suppresses interrupt acceptance at the next boundary.
    pub(crate) defer_interrupts: bool,
}
