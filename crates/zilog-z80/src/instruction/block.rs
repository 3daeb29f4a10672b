//! Block transfer, search and I/O: LDI/LDIR, CPI/CPIR, INI/INIR,
//! OUTI/OTIR and their decrementing twins.
//!
//! A repeating form runs one iteration per execution. If it has to go
//! again it spends five more T-states and rewinds PC onto its own opcode,
//! so the next fetch runs it again and interrupts can be taken in between.

use std::fmt;

use crate::addressing::{Operand, Width, Writer};
use crate::alu;
use crate::cycle::MachineCycle;
use crate::flags::{HF, NF, PF, SF, ZF};
use crate::state::State;

use super::{sequenced, Step};

/// Which way HL (and DE) move after each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    const fn apply(self, value: u16) -> u16 {
        match self {
            Self::Increment => value.wrapping_add(1),
            Self::Decrement => value.wrapping_sub(1),
        }
    }

    const fn letter(self) -> char {
        match self {
            Self::Increment => 'I',
            Self::Decrement => 'D',
        }
    }
}

const REPEAT_T_STATES: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Transfer,
    Apply,
    Update,
    Rewind,
    Done,
}

/// Rewind PC onto the two-byte opcode so the next fetch repeats it.
fn rewind(state: &mut State) {
    state.regs.pc = state.regs.pc.wrapping_sub(2);
}

/// LDI, LDD, LDIR, LDDR: (DE) <- (HL), step both, decrement BC.
#[derive(Debug, Clone)]
pub struct BlockTransfer {
    direction: Direction,
    repeat: bool,
    stage: Stage,
    step: Step,
}

impl BlockTransfer {
    #[must_use]
    pub fn new(direction: Direction, repeat: bool) -> Self {
        Self {
            direction,
            repeat,
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
                    let read = MachineCycle::memory_read(Some(state.regs.hl()));
                    self.step.begin(Step::Cycle(read), state);
                }
                Stage::Transfer => {
                    let value = self.step.value();
                    self.stage = Stage::Update;
                    let writer = Writer::new(Operand::memory(state.regs.de()), Width::Byte, value, 2);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Update => {
                    let regs = &mut state.regs;
                    regs.set_hl(self.direction.apply(regs.hl()));
                    regs.set_de(self.direction.apply(regs.de()));
                    let bc = regs.bc().wrapping_sub(1);
                    regs.set_bc(bc);
                    let pv = if bc != 0 { PF } else { 0 };
                    regs.set_flags(HF | PF | NF, pv);

                    if self.repeat && bc != 0 {
                        self.stage = Stage::Rewind;
                        self.step
                            .begin(Step::Cycle(MachineCycle::internal(REPEAT_T_STATES)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Rewind => {
                    rewind(state);
                    self.stage = Stage::Done;
                }
                Stage::Apply => unreachable!("transfer has no compare stage"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for BlockTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD{}", self.direction.letter())?;
        if self.repeat {
            f.write_str("R")?;
        }
        Ok(())
    }
}

sequenced!(BlockTransfer, Stage);

/// CPI, CPD, CPIR, CPDR: compare A with (HL), step HL, decrement BC.
/// The repeating forms stop early on a match.
#[derive(Debug, Clone)]
pub struct BlockCompare {
    direction: Direction,
    repeat: bool,
    stage: Stage,
    step: Step,
    value: u8,
}

impl BlockCompare {
    #[must_use]
    pub fn new(direction: Direction, repeat: bool) -> Self {
        Self {
            direction,
            repeat,
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
                    let read = MachineCycle::memory_read(Some(state.regs.hl()));
                    self.step.begin(Step::Cycle(read), state);
                }
                Stage::Transfer => {
                    self.value = self.step.value() as u8;
                    self.stage = Stage::Apply;
                    self.step.begin(Step::Cycle(MachineCycle::internal(5)), state);
                }
                Stage::Apply => {
                    let regs = &mut state.regs;
                    let result = alu::sub8(regs.a, self.value, false);
                    regs.set_hl(self.direction.apply(regs.hl()));
                    let bc = regs.bc().wrapping_sub(1);
                    regs.set_bc(bc);
                    let pv = if bc != 0 { PF } else { 0 };
                    regs.set_flags(SF | ZF | HF | PF | NF, (result.flags & (SF | ZF | HF)) | pv | NF);

                    if self.repeat && bc != 0 && result.value != 0 {
                        self.stage = Stage::Rewind;
                        self.step
                            .begin(Step::Cycle(MachineCycle::internal(REPEAT_T_STATES)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Rewind => {
                    rewind(state);
                    self.stage = Stage::Done;
                }
                Stage::Update => unreachable!("compare updates in its apply stage"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for BlockCompare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CP{}", self.direction.letter())?;
        if self.repeat {
            f.write_str("R")?;
        }
        Ok(())
    }
}

sequenced!(BlockCompare, Stage);

/// Shared tail of the block I/O forms: decrement already applied to B,
/// step HL, set Z and N, and decide whether to go round again. N is set
/// whatever the byte transferred.
fn finish_io(direction: Direction, repeat: bool, state: &mut State) -> bool {
    let regs = &mut state.regs;
    regs.set_hl(direction.apply(regs.hl()));
    let zero = if regs.b == 0 { ZF } else { 0 };
    regs.set_flags(ZF | NF, zero | NF);
    repeat && regs.b != 0
}

/// INI, IND, INIR, INDR: (HL) <- port BC, step HL, decrement B.
#[derive(Debug, Clone)]
pub struct BlockInput {
    direction: Direction,
    repeat: bool,
    stage: Stage,
    step: Step,
}

impl BlockInput {
    #[must_use]
    pub fn new(direction: Direction, repeat: bool) -> Self {
        Self {
            direction,
            repeat,
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
                    self.stage = Stage::Apply;
                    let read = MachineCycle::io_read(state.regs.bc());
                    self.step.begin(Step::Cycle(read), state);
                }
                Stage::Apply => {
                    let value = self.step.value();
                    state.regs.b = state.regs.b.wrapping_sub(1);
                    self.stage = Stage::Update;
                    let writer = Writer::new(Operand::memory(state.regs.hl()), Width::Byte, value, 0);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Update => {
                    if finish_io(self.direction, self.repeat, state) {
                        self.stage = Stage::Rewind;
                        self.step
                            .begin(Step::Cycle(MachineCycle::internal(REPEAT_T_STATES)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Rewind => {
                    rewind(state);
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for BlockInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IN")?;
        if self.repeat {
            write!(f, "{}R", self.direction.letter())
        } else {
            write!(f, "{}", self.direction.letter())
        }
    }
}

sequenced!(BlockInput, Stage);

/// OUTI, OUTD, OTIR, OTDR: port BC <- (HL), step HL, decrement B. B is
/// decremented before it goes out on the address bus.
#[derive(Debug, Clone)]
pub struct BlockOutput {
    direction: Direction,
    repeat: bool,
    stage: Stage,
    step: Step,
}

impl BlockOutput {
    #[must_use]
    pub fn new(direction: Direction, repeat: bool) -> Self {
        Self {
            direction,
            repeat,
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
                    self.stage = Stage::Apply;
                    let read = MachineCycle::memory_read(Some(state.regs.hl()));
                    self.step.begin(Step::Cycle(read), state);
                }
                Stage::Apply => {
                    let value = self.step.value() as u8;
                    state.regs.b = state.regs.b.wrapping_sub(1);
                    self.stage = Stage::Update;
                    let write = MachineCycle::io_write(state.regs.bc(), value);
                    self.step.begin(Step::Cycle(write), state);
                }
                Stage::Update => {
                    if finish_io(self.direction, self.repeat, state) {
                        self.stage = Stage::Rewind;
                        self.step
                            .begin(Step::Cycle(MachineCycle::internal(REPEAT_T_STATES)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Rewind => {
                    rewind(state);
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for BlockOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.repeat, self.direction) {
            (false, direction) => write!(f, "OUT{}", direction.letter()),
            (true, direction) => write!(f, "OT{}R", direction.letter()),
        }
    }
}

sequenced!(BlockOutput, Stage);
