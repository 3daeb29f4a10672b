//! PUSH, POP and EX (SP),rr.

use std::fmt;

use crate::addressing::{Operand, Reader, Width, WordOrder, Writer};
use crate::cycle::MachineCycle;
use crate::registers::Register;
use crate::state::State;

use super::branch::{pop, push};
use super::{sequenced, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Transfer,
    Commit,
    Done,
}

/// PUSH rr: one internal T-state, then the pair goes out high byte first.
#[derive(Debug, Clone)]
pub struct Push {
    reg: Register,
    stage: Stage,
    step: Step,
}

impl Push {
    #[must_use]
    pub fn new(reg: Register) -> Self {
        Self {
            reg,
            stage: Stage::Start,
            step: Step::Idle,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Transfer;
                    self.step.begin(Step::Cycle(MachineCycle::internal(1)), state);
                }
                Stage::Transfer => {
                    self.stage = Stage::Commit;
                    let value = state.regs.get(self.reg);
                    let writer = push(state, value);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Commit => self.stage = Stage::Done,
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Push {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PUSH {}", self.reg)
    }
}

sequenced!(Push, Stage);

/// POP rr.
#[derive(Debug, Clone)]
pub struct Pop {
    reg: Register,
    stage: Stage,
    step: Step,
}

impl Pop {
    #[must_use]
    pub fn new(reg: Register) -> Self {
        Self {
            reg,
            stage: Stage::Start,
            step: Step::Idle,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Commit;
                    let reader = pop(state);
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Commit => {
                    state.regs.set(self.reg, self.step.value());
                    state.regs.sp = state.regs.sp.wrapping_add(2);
                    self.stage = Stage::Done;
                }
                Stage::Transfer => unreachable!("pop has no transfer stage"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Pop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POP {}", self.reg)
    }
}

sequenced!(Pop, Stage);

/// EX (SP),HL / IX / IY: swap a pair with the word on top of the stack.
/// One internal T-state after the read, two after the write.
#[derive(Debug, Clone)]
pub struct ExchangeStack {
    reg: Register,
    stage: Stage,
    step: Step,
    value: u16,
}

impl ExchangeStack {
    #[must_use]
    pub fn new(reg: Register) -> Self {
        Self {
            reg,
            stage: Stage::Start,
            step: Step::Idle,
            value: 0,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Transfer;
                    let reader = Reader::new(Operand::memory(state.regs.sp), Width::Word, 1);
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Transfer => {
                    self.value = self.step.value();
                    self.stage = Stage::Commit;
                    let operand = Operand::Memory {
                        address: state.regs.sp,
                        order: WordOrder::HighFirst,
                    };
                    let writer = Writer::new(operand, Width::Word, state.regs.get(self.reg), 2);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Commit => {
                    state.regs.set(self.reg, self.value);
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for ExchangeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EX (SP),{}", self.reg)
    }
}

sequenced!(ExchangeStack, Stage);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    fn run(instruction: &mut impl Behavior, state: &mut State, ram: &mut [u8]) -> u32 {
        instruction.start_execution(state);
        let mut t = 0;
        while !instruction.is_complete() {
            instruction.clock(state);
            t += 1;
            let pins = state.pins;
            if pins.memory_read() {
                state.pins.data = ram[pins.address as usize];
            } else if pins.memory_write() {
                ram[pins.address as usize] = pins.data;
            }
        }
        t
    }

    #[test]
    fn push_writes_high_byte_first() {
        let mut ram = vec![0u8; 0x10000];
        let mut state = State::default();
        state.regs.sp = 0x8000;
        state.regs.set_bc(0x1234);
        let mut push = Push::new(Register::Bc);
        assert_eq!(run(&mut push, &mut state, &mut ram), 7);
        assert_eq!(state.regs.sp, 0x7FFE);
        assert_eq!(ram[0x7FFF], 0x12);
        assert_eq!(ram[0x7FFE], 0x34);
    }

    #[test]
    fn exchange_stack_swaps() {
        let mut ram = vec![0u8; 0x10000];
        ram[0x9000] = 0xCD;
        ram[0x9001] = 0xAB;
        let mut state = State::default();
        state.regs.sp = 0x9000;
        state.regs.set_hl(0x1234);
        let mut ex = ExchangeStack::new(Register::Hl);
        assert_eq!(run(&mut ex, &mut state, &mut ram), 15);
        assert_eq!(state.regs.hl(), 0xABCD);
        assert_eq!(ram[0x9000], 0x34);
        assert_eq!(ram[0x9001], 0x12);
        assert_eq!(state.regs.sp, 0x9000);
    }
}
