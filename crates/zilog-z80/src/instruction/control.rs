//! CPU control: NOP, HALT, DI, EI, IM n.

use std::fmt;

use crate::state::State;

use super::immediate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    Nop,
    /// Enter the halt state. PC already points past the opcode; the CPU
    /// runs halt fetches until an interrupt arrives.
    Halt,
    Di,
    /// Enable interrupts from the boundary after the next one.
    Ei,
    /// Select interrupt mode 0, 1 or 2.
    Im(u8),
}

#[derive(Debug, Clone)]
pub struct Control {
    op: ControlOp,
    done: bool,
}

impl Control {
    #[must_use]
    pub fn new(op: ControlOp) -> Self {
        Self { op, done: false }
    }

    fn apply(&self, state: &mut State) {
        match self.op {
            ControlOp::Nop => {}
            ControlOp::Halt => {
                log::debug!("HALT at {:04X}", state.regs.pc.wrapping_sub(1));
                state.regs.halted = true;
            }
            ControlOp::Di => {
                state.regs.iff1 = false;
                state.regs.iff2 = false;
            }
            ControlOp::Ei => {
                state.regs.iff1 = true;
                state.regs.iff2 = true;
                state.defer_interrupts = true;
            }
            ControlOp::Im(mode) => state.regs.im = mode,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            ControlOp::Nop => f.write_str("NOP"),
            ControlOp::Halt => f.write_str("HALT"),
            ControlOp::Di => f.write_str("DI"),
            ControlOp::Ei => f.write_str("EI"),
            ControlOp::Im(mode) => write!(f, "IM {mode}"),
        }
    }
}

immediate!(Control);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    #[test]
    fn ei_defers_acceptance() {
        let mut state = State::default();
        let mut ei = Control::new(ControlOp::Ei);
        ei.start_execution(&mut state);
        assert!(ei.is_complete());
        assert!(state.regs.iff1 && state.regs.iff2);
        assert!(state.defer_interrupts);
    }

    #[test]
    #[should_panic(expected = "NOP clocked after completion")]
    fn zero_cycle_instructions_reject_clocks() {
        let mut state = State::default();
        let mut nop = Control::new(ControlOp::Nop);
        nop.start_execution(&mut state);
        nop.clock(&mut state);
    }
}
