//! Machine cycles: the fixed-shape bus transactions every instruction is
//! built from.
//!
//! A machine cycle is clocked one T-state at a time. Each pulse may change
//! the pins; the host must service them before the next pulse. The shapes
//! and their T-state counts are fixed:
//!
//! | Cycle          | T | Signals                                   |
//! |----------------|---|-------------------------------------------|
//! | Opcode fetch   | 4 | T1 M1+MREQ+RD, T3 latch and release       |
//! | Memory read    | 3 | T1 MREQ+RD, T3 latch and release          |
//! | Memory write   | 3 | T1 MREQ+data, T2 WR, T3 release           |
//! | I/O read       | 4 | T2 IORQ+RD, T4 latch and release          |
//! | I/O write      | 4 | T1 data, T2 IORQ+WR, T4 release           |
//! | Acknowledge    | 6 | T1 M1, T3 IORQ, T5 latch and release      |
//! | Internal       | n | none                                      |

use crate::state::State;

/// The shape of a machine cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// M1. `advance_pc` is false for halt fetches and the NMI dummy fetch,
    /// which read at PC without moving it.
    OpcodeFetch { advance_pc: bool },
    MemoryRead,
    MemoryWrite,
    IoRead,
    IoWrite,
    /// Interrupt acknowledge: M1 with IORQ instead of MREQ, two wait states.
    Acknowledge,
    /// Pure wait. No pins change.
    Internal(u8),
}

/// One bus transaction in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineCycle {
    kind: CycleKind,
    /// Explicit address. `None` for reads means "at PC, then advance PC".
    address: Option<u16>,
    /// Value to write, or the value latched by a read.
    data: u8,
    t_state: u8,
}

impl MachineCycle {
    const fn new(kind: CycleKind, address: Option<u16>, data: u8) -> Self {
        Self {
            kind,
            address,
            data,
            t_state: 0,
        }
    }

    /// M1 opcode fetch at PC.
    #[must_use]
    pub const fn opcode_fetch() -> Self {
        Self::new(CycleKind::OpcodeFetch { advance_pc: true }, None, 0)
    }

    /// M1 fetch at PC that leaves PC where it is.
    #[must_use]
    pub const fn halt_fetch() -> Self {
        Self::new(CycleKind::OpcodeFetch { advance_pc: false }, None, 0)
    }

    /// Memory read at `address`, or at PC (advancing it) when `None`.
    #[must_use]
    pub const fn memory_read(address: Option<u16>) -> Self {
        Self::new(CycleKind::MemoryRead, address, 0)
    }

    /// Memory write of `value` to `address`.
    #[must_use]
    pub const fn memory_write(address: u16, value: u8) -> Self {
        Self::new(CycleKind::MemoryWrite, Some(address), value)
    }

    /// Input from `port`.
    #[must_use]
    pub const fn io_read(port: u16) -> Self {
        Self::new(CycleKind::IoRead, Some(port), 0)
    }

    /// Output of `value` to `port`.
    #[must_use]
    pub const fn io_write(port: u16, value: u8) -> Self {
        Self::new(CycleKind::IoWrite, Some(port), value)
    }

    /// Interrupt acknowledge.
    #[must_use]
    pub const fn acknowledge() -> Self {
        Self::new(CycleKind::Acknowledge, None, 0)
    }

    /// `t_states` pulses of internal work.
    #[must_use]
    pub const fn internal(t_states: u8) -> Self {
        Self::new(CycleKind::Internal(t_states), None, 0)
    }

    /// Length of this cycle in T-states.
    #[must_use]
    pub const fn t_states(&self) -> u8 {
        match self.kind {
            CycleKind::OpcodeFetch { .. } | CycleKind::IoRead | CycleKind::IoWrite => 4,
            CycleKind::MemoryRead | CycleKind::MemoryWrite => 3,
            CycleKind::Acknowledge => 6,
            CycleKind::Internal(n) => n,
        }
    }

    /// All T-states have elapsed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.t_state >= self.t_states()
    }

    /// The byte latched from the data bus (reads), or the byte being
    /// written (writes).
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.data
    }

    /// Rearm to T1. A read's latched byte is kept until it is overwritten
    /// by the next latch.
    pub fn reset(&mut self) {
        self.t_state = 0;
    }

    /// Advance one T-state.
    ///
    /// # Panics
    ///
    /// Panics if the cycle is already complete.
    pub fn clock(&mut self, state: &mut State) {
        assert!(
            !self.is_complete(),
            "{:?} clocked after its final T-state",
            self.kind
        );
        self.t_state += 1;
        let t = self.t_state;
        let pins = &mut state.pins;

        match self.kind {
            CycleKind::OpcodeFetch { advance_pc } => match t {
                1 => {
                    pins.address = state.regs.pc;
                    if advance_pc {
                        state.regs.pc = state.regs.pc.wrapping_add(1);
                    }
                    pins.m1 = true;
                    pins.mreq = true;
                    pins.rd = true;
                }
                3 => {
                    self.data = pins.data;
                    pins.release();
                    state.regs.increment_r();
                }
                _ => {}
            },
            CycleKind::MemoryRead => match t {
                1 => {
                    pins.address = match self.address {
                        Some(address) => address,
                        None => {
                            let pc = state.regs.pc;
                            state.regs.pc = pc.wrapping_add(1);
                            pc
                        }
                    };
                    pins.mreq = true;
                    pins.rd = true;
                }
                3 => {
                    self.data = pins.data;
                    pins.release();
                }
                _ => {}
            },
            CycleKind::MemoryWrite => match t {
                1 => {
                    pins.address = self.address.unwrap_or(state.regs.pc);
                    pins.data = self.data;
                    pins.mreq = true;
                }
                2 => pins.wr = true,
                3 => pins.release(),
                _ => {}
            },
            CycleKind::IoRead => match t {
                1 => pins.address = self.address.unwrap_or_default(),
                2 => {
                    pins.iorq = true;
                    pins.rd = true;
                }
                4 => {
                    self.data = pins.data;
                    pins.release();
                }
                _ => {}
            },
            CycleKind::IoWrite => match t {
                1 => {
                    pins.address = self.address.unwrap_or_default();
                    pins.data = self.data;
                }
                2 => {
                    pins.iorq = true;
                    pins.wr = true;
                }
                4 => pins.release(),
                _ => {}
            },
            CycleKind::Acknowledge => match t {
                1 => {
                    pins.address = state.regs.pc;
                    pins.m1 = true;
                }
                3 => pins.iorq = true,
                5 => {
                    self.data = pins.data;
                    pins.release();
                    state.regs.increment_r();
                }
                _ => {}
            },
            CycleKind::Internal(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::Pins;

    /// Control lines as (m1, mreq, iorq, rd, wr).
    fn lines(pins: &Pins) -> (bool, bool, bool, bool, bool) {
        (pins.m1, pins.mreq, pins.iorq, pins.rd, pins.wr)
    }

    fn run(cycle: &mut MachineCycle, state: &mut State) -> Vec<(bool, bool, bool, bool, bool)> {
        let mut seen = Vec::new();
        while !cycle.is_complete() {
            cycle.clock(state);
            seen.push(lines(&state.pins));
        }
        seen
    }

    #[test]
    fn opcode_fetch_signals_per_t_state() {
        let mut state = State::default();
        state.regs.pc = 0x1234;
        let mut cycle = MachineCycle::opcode_fetch();

        cycle.clock(&mut state);
        assert_eq!(state.pins.address, 0x1234);
        assert_eq!(state.regs.pc, 0x1235);
        assert_eq!(lines(&state.pins), (true, true, false, true, false));

        state.pins.data = 0x3E;
        cycle.clock(&mut state);
        assert_eq!(lines(&state.pins), (true, true, false, true, false));

        cycle.clock(&mut state);
        assert_eq!(lines(&state.pins), (false, false, false, false, false));
        assert_eq!(cycle.value(), 0x3E);
        assert_eq!(state.regs.r, 1);

        assert!(!cycle.is_complete());
        cycle.clock(&mut state);
        assert!(cycle.is_complete());
    }

    #[test]
    fn memory_read_defaults_to_pc() {
        let mut state = State::default();
        state.regs.pc = 0x00FF;
        let mut cycle = MachineCycle::memory_read(None);
        cycle.clock(&mut state);
        assert_eq!(state.pins.address, 0x00FF);
        assert_eq!(state.regs.pc, 0x0100);
        state.pins.data = 0x99;
        let rest = run(&mut cycle, &mut state);
        assert_eq!(
            rest,
            vec![
                (false, true, false, true, false),
                (false, false, false, false, false)
            ]
        );
        assert_eq!(cycle.value(), 0x99);
    }

    #[test]
    fn explicit_read_leaves_pc_alone() {
        let mut state = State::default();
        state.regs.pc = 0x4000;
        let mut cycle = MachineCycle::memory_read(Some(0x8000));
        run(&mut cycle, &mut state);
        assert_eq!(state.pins.address, 0x8000);
        assert_eq!(state.regs.pc, 0x4000);
    }

    #[test]
    fn memory_write_signals_per_t_state() {
        let mut state = State::default();
        let mut cycle = MachineCycle::memory_write(0xC000, 0x5A);
        let seen = run(&mut cycle, &mut state);
        assert_eq!(
            seen,
            vec![
                (false, true, false, false, false),
                (false, true, false, false, true),
                (false, false, false, false, false),
            ]
        );
        assert_eq!(state.pins.address, 0xC000);
        assert_eq!(state.pins.data, 0x5A);
    }

    #[test]
    fn io_cycles_use_iorq() {
        let mut state = State::default();
        let mut read = MachineCycle::io_read(0x12FE);
        let seen = run(&mut read, &mut state);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], (false, false, false, false, false));
        assert_eq!(seen[1], (false, false, true, true, false));
        assert_eq!(seen[2], (false, false, true, true, false));
        assert_eq!(seen[3], (false, false, false, false, false));

        let mut write = MachineCycle::io_write(0x00FE, 0x07);
        let seen = run(&mut write, &mut state);
        assert_eq!(seen[1], (false, false, true, false, true));
        assert_eq!(seen[3], (false, false, false, false, false));
        assert_eq!(state.pins.data, 0x07);
    }

    #[test]
    fn acknowledge_raises_iorq_with_m1() {
        let mut state = State::default();
        let mut cycle = MachineCycle::acknowledge();
        let seen = run(&mut cycle, &mut state);
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (true, false, false, false, false));
        assert_eq!(seen[2], (true, false, true, false, false));
        assert_eq!(seen[4], (false, false, false, false, false));
    }

    #[test]
    fn internal_cycle_touches_nothing() {
        let mut state = State::default();
        state.pins.address = 0xBEEF;
        let before = state.pins;
        let mut cycle = MachineCycle::internal(5);
        let seen = run(&mut cycle, &mut state);
        assert_eq!(seen.len(), 5);
        assert_eq!(state.pins, before);
    }

    #[test]
    fn reset_rearms() {
        let mut state = State::default();
        let mut cycle = MachineCycle::internal(2);
        run(&mut cycle, &mut state);
        cycle.reset();
        assert!(!cycle.is_complete());
        assert_eq!(run(&mut cycle, &mut state).len(), 2);
    }

    #[test]
    #[should_panic(expected = "clocked after its final T-state")]
    fn clocking_a_complete_cycle_panics() {
        let mut state = State::default();
        let mut cycle = MachineCycle::memory_read(Some(0));
        run(&mut cycle, &mut state);
        cycle.clock(&mut state);
    }
}
