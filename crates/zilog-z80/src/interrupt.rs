//! Interrupt responses.
//!
//! An accepted NMI or INT takes the place of an opcode fetch. The response
//! is sequenced like an instruction: a fetch-shaped first cycle, then
//! pushes and jumps built from the same machine cycles.
//!
//! | Response | Sequence                                       | T  |
//! |----------|------------------------------------------------|----|
//! | NMI      | dummy fetch 4, internal 1, push 6, PC=0066     | 11 |
//! | IM 0     | acknowledge 6, then the acknowledged opcode    | 13 for RST |
//! | IM 1     | acknowledge 6, internal 1, push 6, PC=0038     | 13 |
//! | IM 2     | acknowledge 6, internal 1, push 6, vector 6    | 19 |

use std::fmt;

use crate::addressing::{Operand, Reader, Width};
use crate::cycle::MachineCycle;
use crate::decode;
use crate::instruction::{push, Behavior, Instruction, Step};
use crate::state::State;

/// Which interrupt is being serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    Nmi,
    /// Maskable interrupt in the given mode.
    Maskable(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Acknowledged,
    Delay,
    Push,
    Commit,
    Vector,
    Jump,
    Execute,
    Done,
}

#[derive(Debug, Clone)]
pub struct InterruptResponse {
    kind: InterruptKind,
    stage: Stage,
    step: Step,
    /// Byte the interrupting device placed on the bus.
    response: u8,
    /// IM 0 only: the instruction supplied during acknowledge.
    inner: Option<Box<Instruction>>,
}

impl InterruptResponse {
    #[must_use]
    pub fn new(kind: InterruptKind) -> Self {
        Self {
            kind,
            stage: Stage::Start,
            step: Step::Idle,
            response: 0,
            inner: None,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    let regs = &mut state.regs;
                    regs.halted = false;
                    regs.iff1 = false;
                    let cycle = match self.kind {
                        InterruptKind::Nmi => MachineCycle::halt_fetch(),
                        InterruptKind::Maskable(_) => {
                            regs.iff2 = false;
                            MachineCycle::acknowledge()
                        }
                    };
                    self.stage = Stage::Acknowledged;
                    self.step.begin(Step::Cycle(cycle), state);
                }
                Stage::Acknowledged => {
                    self.response = self.step.value() as u8;
                    if self.kind == InterruptKind::Maskable(0) {
                        self.stage = Stage::Execute;
                        self.begin_inner(self.response, state);
                    } else {
                        self.stage = Stage::Delay;
                    }
                }
                Stage::Delay => {
                    self.stage = Stage::Push;
                    self.step.begin(Step::Cycle(MachineCycle::internal(1)), state);
                }
                Stage::Push => {
                    let pc = state.regs.pc;
                    let writer = push(state, pc);
                    self.stage = Stage::Commit;
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Commit => {
                    self.stage = match self.kind {
                        InterruptKind::Nmi => {
                            state.regs.pc = 0x0066;
                            Stage::Done
                        }
                        InterruptKind::Maskable(2) => Stage::Vector,
                        InterruptKind::Maskable(_) => {
                            state.regs.pc = 0x0038;
                            Stage::Done
                        }
                    };
                }
                Stage::Vector => {
                    let table = (u16::from(state.regs.i) << 8) | u16::from(self.response & 0xFE);
                    self.stage = Stage::Jump;
                    let reader = Reader::new(Operand::memory(table), Width::Word, 0);
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Jump => {
                    state.regs.pc = self.step.value();
                    self.stage = Stage::Done;
                }
                Stage::Execute => {
                    if self.inner.as_ref().is_some_and(|inner| !inner.is_complete()) {
                        return;
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }

    /// IM 0: run the acknowledged byte as an unprefixed opcode.
    fn begin_inner(&mut self, opcode: u8, state: &mut State) {
        self.step = Step::Idle;
        match decode::decode(opcode.into()) {
            Ok(mut inner) => {
                inner.reset();
                inner.start_execution(state);
                self.inner = Some(Box::new(inner));
            }
            Err(err) => log::warn!("IM 0 acknowledge: {err}"),
        }
    }
}

impl fmt::Display for InterruptResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.inner) {
            (InterruptKind::Nmi, _) => f.write_str("NMI"),
            (InterruptKind::Maskable(0), Some(inner)) => write!(f, "INT 0 ({inner})"),
            (InterruptKind::Maskable(mode), _) => write!(f, "INT {mode}"),
        }
    }
}

impl Behavior for InterruptResponse {
    fn reset(&mut self) {
        self.stage = Stage::Start;
        self.step = Step::Idle;
        self.inner = None;
    }

    fn start_execution(&mut self, state: &mut State) {
        self.advance(state);
    }

    fn clock(&mut self, state: &mut State) {
        assert!(!self.is_complete(), "{self} clocked after completion");
        match (&mut self.inner, self.stage) {
            (Some(inner), Stage::Execute) => inner.clock(state),
            _ => self.step.clock(state),
        }
        self.advance(state);
    }

    fn is_complete(&self) -> bool {
        self.stage == Stage::Done
    }

    fn mnemonic(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock `response` to completion against `ram`, answering the
    /// acknowledge with `vector`. Returns the T-states taken.
    fn run(response: &mut InterruptResponse, state: &mut State, ram: &mut [u8], vector: u8) -> u32 {
        response.start_execution(state);
        let mut t = 0;
        while !response.is_complete() {
            response.clock(state);
            t += 1;
            let pins = state.pins;
            if pins.interrupt_acknowledge() {
                state.pins.data = vector;
            } else if pins.memory_read() {
                state.pins.data = ram[pins.address as usize];
            } else if pins.memory_write() {
                ram[pins.address as usize] = pins.data;
            }
        }
        t
    }

    fn interrupted_state() -> State {
        let mut state = State::default();
        state.regs.pc = 0x1234;
        state.regs.sp = 0x8000;
        state.regs.iff1 = true;
        state.regs.iff2 = true;
        state
    }

    #[test]
    fn nmi_keeps_iff2() {
        let mut ram = vec![0u8; 0x10000];
        let mut state = interrupted_state();
        let mut response = InterruptResponse::new(InterruptKind::Nmi);
        assert_eq!(run(&mut response, &mut state, &mut ram, 0xFF), 11);
        assert_eq!(state.regs.pc, 0x0066);
        assert!(!state.regs.iff1);
        assert!(state.regs.iff2);
        assert_eq!(ram[0x7FFE], 0x34);
        assert_eq!(ram[0x7FFF], 0x12);
    }

    #[test]
    fn mode_1_vectors_to_0038() {
        let mut ram = vec![0u8; 0x10000];
        let mut state = interrupted_state();
        state.regs.halted = true;
        let mut response = InterruptResponse::new(InterruptKind::Maskable(1));
        assert_eq!(run(&mut response, &mut state, &mut ram, 0xFF), 13);
        assert_eq!(state.regs.pc, 0x0038);
        assert_eq!(state.regs.sp, 0x7FFE);
        assert_eq!(ram[0x7FFE], 0x34);
        assert_eq!(ram[0x7FFF], 0x12);
        assert!(!state.regs.iff1);
        assert!(!state.regs.iff2);
        assert!(!state.regs.halted);
    }

    #[test]
    fn return_address_is_stored_before_the_jump() {
        let mut ram = vec![0u8; 0x10000];
        let mut state = interrupted_state();
        let mut response = InterruptResponse::new(InterruptKind::Maskable(1));
        response.start_execution(&mut state);
        let mut t = 0;
        while !response.is_complete() {
            response.clock(&mut state);
            t += 1;
            let pins = state.pins;
            if pins.memory_write() {
                ram[pins.address as usize] = pins.data;
            }
            if state.regs.pc == 0x0038 {
                assert_eq!((ram[0x7FFE], ram[0x7FFF]), (0x34, 0x12), "jumped at T{t}");
            }
        }
        assert_eq!(t, 13);
    }

    #[test]
    fn mode_2_reads_vector_table() {
        let mut ram = vec![0u8; 0x10000];
        ram[0x3F20] = 0xCD;
        ram[0x3F21] = 0xAB;
        let mut state = interrupted_state();
        state.regs.i = 0x3F;
        let mut response = InterruptResponse::new(InterruptKind::Maskable(2));
        assert_eq!(run(&mut response, &mut state, &mut ram, 0x21), 19);
        assert_eq!(state.regs.pc, 0xABCD);
    }

    #[test]
    fn mode_0_executes_rst() {
        let mut ram = vec![0u8; 0x10000];
        let mut state = interrupted_state();
        let mut response = InterruptResponse::new(InterruptKind::Maskable(0));
        assert_eq!(run(&mut response, &mut state, &mut ram, 0xD7), 13);
        assert_eq!(state.regs.pc, 0x0010);
        assert_eq!(ram[0x7FFE], 0x34);
        assert_eq!(response.mnemonic(), "INT 0 (RST 10H)");
    }
}
