//! LD, 8 and 16 bit.

use std::fmt;

use crate::addressing::{AddressingMode, Operand, Reader, Resolver, Width, Writer};
use crate::cycle::MachineCycle;
use crate::flags::{sz, HF, NF, PF, SF, ZF};
use crate::state::State;

use super::{sequenced, Step};

/// Flag side effects of a load. Only `LD A,I` and `LD A,R` have any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadFlags {
    #[default]
    None,
    /// S and Z from the value, H and N reset, P/V copies IFF2.
    InterruptState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Destination,
    Source,
    Read,
    Settle,
    Write,
    Finish,
    Done,
}

/// Copies a source operand to a destination operand.
///
/// The destination resolves first because its operand bytes come first in
/// the encoding (`LD (IX+d),n` carries d before n).
#[derive(Debug, Clone)]
pub struct Load {
    width: Width,
    dst: AddressingMode,
    src: AddressingMode,
    /// Internal T-states before anything else (`LD SP,HL`, `LD I,A`).
    pre: u8,
    /// Internal T-states between reading the source and writing.
    settle: u8,
    flags: LoadFlags,
    stage: Stage,
    step: Step,
    target: Option<Operand>,
    value: u16,
}

impl Load {
    #[must_use]
    pub fn new(width: Width, dst: AddressingMode, src: AddressingMode) -> Self {
        Self {
            width,
            dst,
            src,
            pre: 0,
            settle: 0,
            flags: LoadFlags::None,
            stage: Stage::Start,
            step: Step::Idle,
            target: None,
            value: 0,
        }
    }

    #[must_use]
    pub fn byte(dst: AddressingMode, src: AddressingMode) -> Self {
        Self::new(Width::Byte, dst, src)
    }

    #[must_use]
    pub fn word(dst: AddressingMode, src: AddressingMode) -> Self {
        Self::new(Width::Word, dst, src)
    }

    #[must_use]
    pub const fn with_pre(mut self, t_states: u8) -> Self {
        self.pre = t_states;
        self
    }

    #[must_use]
    pub const fn with_settle(mut self, t_states: u8) -> Self {
        self.settle = t_states;
        self
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags;
        self
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Destination;
                    self.step.begin(Step::Cycle(MachineCycle::internal(self.pre)), state);
                }
                Stage::Destination => {
                    self.stage = Stage::Source;
                    let resolver = Resolver::new(self.dst, self.width);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Source => {
                    self.target = Some(self.step.operand());
                    self.stage = Stage::Read;
                    let resolver = Resolver::new(self.src, self.width);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Read => {
                    let operand = self.step.operand();
                    self.stage = Stage::Settle;
                    let reader = Reader::new(operand, self.width, 0);
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Settle => {
                    self.value = self.step.value();
                    self.stage = Stage::Write;
                    self.step.begin(Step::Cycle(MachineCycle::internal(self.settle)), state);
                }
                Stage::Write => {
                    let Some(target) = self.target else {
                        unreachable!("load destination resolved before write");
                    };
                    self.stage = Stage::Finish;
                    let writer = Writer::new(target, self.width, self.value, 0);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Finish => {
                    if self.flags == LoadFlags::InterruptState {
                        let mut f = sz(self.value as u8);
                        if state.regs.iff2 {
                            f |= PF;
                        }
                        state.regs.set_flags(SF | ZF | HF | PF | NF, f);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LD {},{}",
            self.dst.describe(self.width),
            self.src.describe(self.width)
        )
    }
}

sequenced!(Load, Stage);
