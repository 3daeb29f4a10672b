//! 8 and 16 bit arithmetic and logic.

use std::fmt;

use crate::addressing::{AddressingMode, Operand, Reader, Resolver, Width, Writer};
use crate::alu;
use crate::cycle::MachineCycle;
use crate::flags::{ALL, CF, HF, NF, PF, SF, ZF};
use crate::registers::Register;
use crate::state::State;

use super::{immediate, sequenced, Step};

/// The eight accumulator operations of the `10xxxyyy` opcode block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    /// Operation selected by bits 5..3 of the opcode.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbc,
            4 => Self::And,
            5 => Self::Xor,
            6 => Self::Or,
            _ => Self::Cp,
        }
    }

    /// Result and flags of `a <op> b`.
    #[must_use]
    pub fn apply(self, a: u8, b: u8, carry: bool) -> alu::AluResult {
        match self {
            Self::Add => alu::add8(a, b, false),
            Self::Adc => alu::add8(a, b, carry),
            Self::Sub | Self::Cp => alu::sub8(a, b, false),
            Self::Sbc => alu::sub8(a, b, carry),
            Self::And => alu::and8(a, b),
            Self::Xor => alu::xor8(a, b),
            Self::Or => alu::or8(a, b),
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Add => "ADD A,",
            Self::Adc => "ADC A,",
            Self::Sub => "SUB ",
            Self::Sbc => "SBC A,",
            Self::And => "AND ",
            Self::Xor => "XOR ",
            Self::Or => "OR ",
            Self::Cp => "CP ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Read,
    Apply,
    Write,
    Finish,
    Done,
}

/// `op A,src` for any byte source.
#[derive(Debug, Clone)]
pub struct Alu8 {
    op: AluOp,
    src: AddressingMode,
    stage: Stage,
    step: Step,
}

impl Alu8 {
    #[must_use]
    pub fn new(op: AluOp, src: AddressingMode) -> Self {
        Self {
            op,
            src,
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
                    self.stage = Stage::Read;
                    let resolver = Resolver::new(self.src, Width::Byte);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Read => {
                    let operand = self.step.operand();
                    self.stage = Stage::Apply;
                    let reader = Reader::new(operand, Width::Byte, 0);
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Apply => {
                    let operand = self.step.value() as u8;
                    let result = self.op.apply(state.regs.a, operand, state.regs.carry());
                    if self.op != AluOp::Cp {
                        state.regs.a = result.value;
                    }
                    state.regs.set_flags(ALL, result.flags);
                    self.step = Step::Idle;
                    self.stage = Stage::Done;
                }
                Stage::Write | Stage::Finish => unreachable!("ALU ops never write back"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Alu8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.prefix(), self.src.describe(Width::Byte))
    }
}

sequenced!(Alu8, Stage);

/// INC or DEC of a byte operand: read-modify-write, carry untouched.
#[derive(Debug, Clone)]
pub struct IncDec8 {
    decrement: bool,
    mode: AddressingMode,
    stage: Stage,
    step: Step,
    target: Option<Operand>,
    value: u8,
}

impl IncDec8 {
    #[must_use]
    pub fn inc(mode: AddressingMode) -> Self {
        Self::new(false, mode)
    }

    #[must_use]
    pub fn dec(mode: AddressingMode) -> Self {
        Self::new(true, mode)
    }

    fn new(decrement: bool, mode: AddressingMode) -> Self {
        Self {
            decrement,
            mode,
            stage: Stage::Start,
            step: Step::Idle,
            target: None,
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
                    self.stage = Stage::Read;
                    let resolver = Resolver::new(self.mode, Width::Byte);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Read => {
                    let operand = self.step.operand();
                    self.target = Some(operand);
                    self.stage = Stage::Apply;
                    let settle = u8::from(matches!(operand, Operand::Memory { .. }));
                    self.step.begin(Step::Read(Reader::new(operand, Width::Byte, settle)), state);
                }
                Stage::Apply => {
                    let value = self.step.value() as u8;
                    let result = if self.decrement {
                        alu::dec8(value)
                    } else {
                        alu::inc8(value)
                    };
                    state.regs.set_flags(SF | ZF | HF | PF | NF, result.flags);
                    self.value = result.value;
                    self.stage = Stage::Write;
                }
                Stage::Write => {
                    let Some(target) = self.target else {
                        unreachable!("operand resolved before write");
                    };
                    self.stage = Stage::Finish;
                    let writer = Writer::new(target, Width::Byte, self.value.into(), 0);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Finish => self.stage = Stage::Done,
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for IncDec8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.decrement { "DEC" } else { "INC" };
        write!(f, "{name} {}", self.mode.describe(Width::Byte))
    }
}

sequenced!(IncDec8, Stage);

/// INC or DEC of a register pair. Two internal T-states, no flags.
#[derive(Debug, Clone)]
pub struct IncDec16 {
    decrement: bool,
    reg: Register,
    stage: Stage,
    step: Step,
}

impl IncDec16 {
    #[must_use]
    pub fn inc(reg: Register) -> Self {
        Self::new(false, reg)
    }

    #[must_use]
    pub fn dec(reg: Register) -> Self {
        Self::new(true, reg)
    }

    fn new(decrement: bool, reg: Register) -> Self {
        Self {
            decrement,
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
                    self.stage = Stage::Apply;
                    self.step.begin(Step::Cycle(MachineCycle::internal(2)), state);
                }
                Stage::Apply => {
                    let value = state.regs.get(self.reg);
                    let value = if self.decrement {
                        value.wrapping_sub(1)
                    } else {
                        value.wrapping_add(1)
                    };
                    state.regs.set(self.reg, value);
                    self.stage = Stage::Done;
                }
                Stage::Read | Stage::Write | Stage::Finish => {
                    unreachable!("register pair step has no operand stages")
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for IncDec16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.decrement { "DEC" } else { "INC" };
        write!(f, "{name} {}", self.reg)
    }
}

sequenced!(IncDec16, Stage);

/// 16-bit arithmetic flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideOp {
    /// Affects H, N and C only.
    Add,
    /// Affects every flag.
    Adc,
    /// Affects every flag.
    Sbc,
}

/// `ADD/ADC/SBC rr,rr`: register pairs only, seven internal T-states.
#[derive(Debug, Clone)]
pub struct Add16 {
    op: WideOp,
    dst: Register,
    src: Register,
    stage: Stage,
    step: Step,
}

impl Add16 {
    #[must_use]
    pub fn new(op: WideOp, dst: Register, src: Register) -> Self {
        Self {
            op,
            dst,
            src,
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
                    self.stage = Stage::Apply;
                    self.step.begin(Step::Cycle(MachineCycle::internal(7)), state);
                }
                Stage::Apply => {
                    let a = state.regs.get(self.dst);
                    let b = state.regs.get(self.src);
                    let carry = state.regs.carry();
                    let (result, mask) = match self.op {
                        WideOp::Add => (alu::add16(a, b), HF | NF | CF),
                        WideOp::Adc => (alu::adc16(a, b, carry), ALL),
                        WideOp::Sbc => (alu::sbc16(a, b, carry), ALL),
                    };
                    state.regs.set(self.dst, result.value);
                    state.regs.set_flags(mask, result.flags);
                    self.stage = Stage::Done;
                }
                Stage::Read | Stage::Write | Stage::Finish => {
                    unreachable!("register pair step has no operand stages")
                }
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Add16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            WideOp::Add => "ADD",
            WideOp::Adc => "ADC",
            WideOp::Sbc => "SBC",
        };
        write!(f, "{name} {},{}", self.dst, self.src)
    }
}

sequenced!(Add16, Stage);

/// Accumulator and carry adjustments that need no bus cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Daa,
    Cpl,
    Neg,
    Scf,
    Ccf,
}

#[derive(Debug, Clone)]
pub struct AccumulatorOp {
    op: Adjust,
    done: bool,
}

impl AccumulatorOp {
    #[must_use]
    pub fn new(op: Adjust) -> Self {
        Self { op, done: false }
    }

    fn apply(&self, state: &mut State) {
        let regs = &mut state.regs;
        match self.op {
            Adjust::Daa => {
                let result = alu::daa(regs.a, regs.f);
                regs.a = result.value;
                regs.set_flags(SF | ZF | HF | PF | CF, result.flags);
            }
            Adjust::Cpl => {
                regs.a = !regs.a;
                regs.set_flags(HF | NF, HF | NF);
            }
            Adjust::Neg => {
                let result = alu::neg8(regs.a);
                regs.a = result.value;
                regs.set_flags(ALL, result.flags);
            }
            Adjust::Scf => regs.set_flags(HF | NF | CF, CF),
            Adjust::Ccf => {
                let carry = regs.carry();
                let f = if carry { HF } else { CF };
                regs.set_flags(HF | NF | CF, f);
            }
        }
    }
}

impl fmt::Display for AccumulatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            Adjust::Daa => "DAA",
            Adjust::Cpl => "CPL",
            Adjust::Neg => "NEG",
            Adjust::Scf => "SCF",
            Adjust::Ccf => "CCF",
        };
        f.write_str(name)
    }
}

immediate!(AccumulatorOp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    #[test]
    fn cp_leaves_accumulator() {
        let mut state = State::default();
        state.regs.a = 0x10;
        state.regs.b = 0x20;
        let mut cp = Alu8::new(AluOp::Cp, AddressingMode::Register(Register::B));
        cp.start_execution(&mut state);
        assert!(cp.is_complete());
        assert_eq!(state.regs.a, 0x10);
        assert!(state.regs.flag(CF));
        assert!(state.regs.flag(NF));
    }

    #[test]
    fn inc_preserves_carry() {
        let mut state = State::default();
        state.regs.f = CF;
        state.regs.b = 0xFF;
        let mut inc = IncDec8::inc(AddressingMode::Register(Register::B));
        inc.start_execution(&mut state);
        assert_eq!(state.regs.b, 0);
        assert_eq!(state.regs.f, ZF | HF | CF);
    }

    #[test]
    fn add16_spends_seven_internal_t_states() {
        let mut state = State::default();
        state.regs.set_hl(0x1000);
        state.regs.set_bc(0x0234);
        state.regs.f = SF | ZF | PF;
        let mut add = Add16::new(WideOp::Add, Register::Hl, Register::Bc);
        add.start_execution(&mut state);
        let mut t = 0;
        while !add.is_complete() {
            add.clock(&mut state);
            t += 1;
        }
        assert_eq!(t, 7);
        assert_eq!(state.regs.hl(), 0x1234);
        assert_eq!(state.regs.f, SF | ZF | PF);
    }

    #[test]
    fn ccf_moves_carry_into_half_carry() {
        let mut state = State::default();
        state.regs.f = CF | NF;
        let mut ccf = AccumulatorOp::new(Adjust::Ccf);
        ccf.start_execution(&mut state);
        assert_eq!(state.regs.f, HF);
    }

    #[test]
    fn mnemonics() {
        let src = AddressingMode::hl_indirect();
        assert_eq!(Alu8::new(AluOp::Sub, src).mnemonic(), "SUB (HL)");
        assert_eq!(Alu8::new(AluOp::Adc, AddressingMode::Immediate).mnemonic(), "ADC A,n");
        assert_eq!(IncDec16::dec(Register::Sp).mnemonic(), "DEC SP");
        assert_eq!(
            Add16::new(WideOp::Sbc, Register::Hl, Register::De).mnemonic(),
            "SBC HL,DE"
        );
    }
}
