//! IN and OUT, 8080-compatible and extended forms.

use std::fmt;

use crate::addressing::{AddressingMode, Operand, Resolver, Width};
use crate::cycle::MachineCycle;
use crate::flags::{szp, HF, NF, PF, SF, ZF};
use crate::registers::Register;
use crate::state::State;

use super::{sequenced, Step};

/// Where the 16-bit port address comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSource {
    /// `(n)`: A on the high byte, the immediate byte on the low.
    Immediate,
    /// `(C)`: BC.
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Transfer,
    Commit,
    Done,
}

/// Resolve the port for `source`: zero cycles for `(C)`, one operand
/// read for `(n)`.
fn begin_port(source: PortSource, step: &mut Step, state: &mut State) {
    if source == PortSource::Immediate {
        let resolver = Resolver::new(AddressingMode::Immediate, Width::Byte);
        step.begin(Step::Resolve(resolver), state);
    }
}

fn port_address(source: PortSource, step: &Step, state: &State) -> u16 {
    match source {
        PortSource::Immediate => {
            let low = match step.operand() {
                Operand::Value(n) => n,
                other => unreachable!("immediate port resolved to {other}"),
            };
            (u16::from(state.regs.a) << 8) | low
        }
        PortSource::Register => state.regs.bc(),
    }
}

/// `IN A,(n)`, `IN r,(C)` and the flags-only `IN (C)`.
#[derive(Debug, Clone)]
pub struct Input {
    dst: Option<Register>,
    port: PortSource,
    stage: Stage,
    step: Step,
}

impl Input {
    /// `IN A,(n)`. Flags are untouched.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Some(Register::A), PortSource::Immediate)
    }

    /// `IN r,(C)`, or `IN (C)` with `None`. Sets S, Z and P from the
    /// byte, resets H and N.
    #[must_use]
    pub fn register(dst: Option<Register>) -> Self {
        Self::new(dst, PortSource::Register)
    }

    fn new(dst: Option<Register>, port: PortSource) -> Self {
        Self {
            dst,
            port,
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
                    begin_port(self.port, &mut self.step, state);
                }
                Stage::Transfer => {
                    let port = port_address(self.port, &self.step, state);
                    self.stage = Stage::Commit;
                    self.step.begin(Step::Cycle(MachineCycle::io_read(port)), state);
                }
                Stage::Commit => {
                    let value = self.step.value() as u8;
                    if let Some(reg) = self.dst {
                        state.regs.set(reg, value.into());
                    }
                    if self.port == PortSource::Register {
                        state.regs.set_flags(SF | ZF | HF | PF | NF, szp(value));
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.port, self.dst) {
            (PortSource::Immediate, _) => f.write_str("IN A,(n)"),
            (PortSource::Register, Some(reg)) => write!(f, "IN {reg},(C)"),
            (PortSource::Register, None) => f.write_str("IN (C)"),
        }
    }
}

sequenced!(Input, Stage);

/// `OUT (n),A`, `OUT (C),r` and `OUT (C),0`.
#[derive(Debug, Clone)]
pub struct Output {
    /// `None` sends zero.
    src: Option<Register>,
    port: PortSource,
    stage: Stage,
    step: Step,
}

impl Output {
    /// `OUT (n),A`.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Some(Register::A), PortSource::Immediate)
    }

    /// `OUT (C),r`, or `OUT (C),0` with `None`.
    #[must_use]
    pub fn register(src: Option<Register>) -> Self {
        Self::new(src, PortSource::Register)
    }

    fn new(src: Option<Register>, port: PortSource) -> Self {
        Self {
            src,
            port,
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
                    begin_port(self.port, &mut self.step, state);
                }
                Stage::Transfer => {
                    let port = port_address(self.port, &self.step, state);
                    let value = self.src.map_or(0, |reg| state.regs.get(reg) as u8);
                    self.stage = Stage::Commit;
                    self.step.begin(Step::Cycle(MachineCycle::io_write(port, value)), state);
                }
                Stage::Commit => self.stage = Stage::Done,
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.port, self.src) {
            (PortSource::Immediate, _) => f.write_str("OUT (n),A"),
            (PortSource::Register, Some(reg)) => write!(f, "OUT (C),{reg}"),
            (PortSource::Register, None) => f.write_str("OUT (C),0"),
        }
    }
}

sequenced!(Output, Stage);
