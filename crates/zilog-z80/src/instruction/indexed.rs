//! DD CB d op / FD CB d op.
//!
//! The displacement sits between the CB prefix and the final opcode, so
//! these cannot be looked up from the fetched opcode alone. This
//! instruction reads d and the opcode as ordinary memory reads, spends two
//! internal T-states, then builds and runs the rotate/shift/bit instruction
//! they select against (IX+d) or (IY+d).

use std::fmt;

use crate::cycle::MachineCycle;
use crate::decode;
use crate::registers::IndexRegister;
use crate::state::State;

use super::{Behavior, Instruction, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Opcode,
    Delay,
    Dispatch,
    Execute,
    Done,
}

#[derive(Debug, Clone)]
pub struct IndexedBitGroup {
    index: IndexRegister,
    stage: Stage,
    step: Step,
    displacement: i8,
    inner: Option<Box<Instruction>>,
}

impl IndexedBitGroup {
    #[must_use]
    pub fn new(index: IndexRegister) -> Self {
        Self {
            index,
            stage: Stage::Start,
            step: Step::Idle,
            displacement: 0,
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
                    self.stage = Stage::Opcode;
                    self.step.begin(Step::Cycle(MachineCycle::memory_read(None)), state);
                }
                Stage::Opcode => {
                    self.displacement = self.step.value() as i8;
                    self.stage = Stage::Delay;
                    self.step.begin(Step::Cycle(MachineCycle::memory_read(None)), state);
                }
                Stage::Delay => {
                    let opcode = self.step.value() as u8;
                    let mut inner = decode::indexed_bit_group(self.index, self.displacement, opcode);
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("{:02X}CB{:02X}: {}", self.index.prefix(), opcode, inner.mnemonic());
                    }
                    inner.reset();
                    self.inner = Some(Box::new(inner));
                    self.stage = Stage::Dispatch;
                    self.step.begin(Step::Cycle(MachineCycle::internal(2)), state);
                }
                Stage::Dispatch => {
                    self.step = Step::Idle;
                    self.stage = Stage::Execute;
                    if let Some(inner) = &mut self.inner {
                        inner.start_execution(state);
                    }
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
}

impl fmt::Display for IndexedBitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => write!(f, "{inner}"),
            None => write!(f, "{:02X}CB d op", self.index.prefix()),
        }
    }
}

impl Behavior for IndexedBitGroup {
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
