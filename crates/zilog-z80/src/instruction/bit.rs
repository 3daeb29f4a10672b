//! Rotates, shifts, nibble rotates and single-bit operations.

use std::fmt;

use crate::addressing::{AddressingMode, Operand, Reader, Resolver, Width, Writer};
use crate::flags::{szp, CF, HF, NF, PF, SF, ZF};
use crate::registers::Register;
use crate::state::State;

use super::{sequenced, Step};

/// Direction of a one-bit shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// What enters the vacated bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The bit shifted out (RLC, RRC).
    Circular,
    /// The old carry (RL, RR).
    Carry,
    /// Zero (SLA, SRL).
    Zero,
    /// One (the undocumented SLL).
    One,
    /// Copy of bit 7 (SRA).
    Sign,
}

/// A rotate or shift by one bit. The bit shifted out always lands in
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub direction: ShiftDirection,
    pub fill: Fill,
}

impl Shift {
    pub const RLC: Self = Self::new(ShiftDirection::Left, Fill::Circular);
    pub const RRC: Self = Self::new(ShiftDirection::Right, Fill::Circular);
    pub const RL: Self = Self::new(ShiftDirection::Left, Fill::Carry);
    pub const RR: Self = Self::new(ShiftDirection::Right, Fill::Carry);
    pub const SLA: Self = Self::new(ShiftDirection::Left, Fill::Zero);
    pub const SRA: Self = Self::new(ShiftDirection::Right, Fill::Sign);
    pub const SLL: Self = Self::new(ShiftDirection::Left, Fill::One);
    pub const SRL: Self = Self::new(ShiftDirection::Right, Fill::Zero);

    #[must_use]
    pub const fn new(direction: ShiftDirection, fill: Fill) -> Self {
        Self { direction, fill }
    }

    /// Shift selected by bits 5..3 of a CB-page opcode.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::RLC,
            1 => Self::RRC,
            2 => Self::RL,
            3 => Self::RR,
            4 => Self::SLA,
            5 => Self::SRA,
            6 => Self::SLL,
            _ => Self::SRL,
        }
    }

    /// Shift `value`, returning the result and the bit shifted out.
    #[must_use]
    pub const fn apply(self, value: u8, carry: bool) -> (u8, bool) {
        let (out, shifted) = match self.direction {
            ShiftDirection::Left => (value & 0x80 != 0, value << 1),
            ShiftDirection::Right => (value & 0x01 != 0, value >> 1),
        };
        let fill = match self.fill {
            Fill::Circular => out,
            Fill::Carry => carry,
            Fill::Zero => false,
            Fill::One => true,
            Fill::Sign => value & 0x80 != 0,
        };
        let injected = match (fill, self.direction) {
            (false, _) => 0,
            (true, ShiftDirection::Left) => 0x01,
            (true, ShiftDirection::Right) => 0x80,
        };
        (shifted | injected, out)
    }

    const fn name(self) -> &'static str {
        match (self.direction, self.fill) {
            (ShiftDirection::Left, Fill::Circular) => "RLC",
            (ShiftDirection::Right, Fill::Circular) => "RRC",
            (ShiftDirection::Left, Fill::Carry) => "RL",
            (ShiftDirection::Right, Fill::Carry) => "RR",
            (ShiftDirection::Left, Fill::Zero | Fill::Sign) => "SLA",
            (ShiftDirection::Right, Fill::Sign) => "SRA",
            (ShiftDirection::Left, Fill::One) => "SLL",
            (ShiftDirection::Right, Fill::Zero | Fill::One) => "SRL",
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

fn memory_settle(operand: Operand, t_states: u8) -> u8 {
    if matches!(operand, Operand::Memory { .. }) {
        t_states
    } else {
        0
    }
}

/// Rotate or shift of a byte operand.
///
/// The 8080-compatible accumulator forms (RLCA, RRCA, RLA, RRA) only touch
/// H, N and C; the CB-page forms define every flag.
#[derive(Debug, Clone)]
pub struct Rotate {
    shift: Shift,
    mode: AddressingMode,
    accumulator: bool,
    copy_to: Option<Register>,
    stage: Stage,
    step: Step,
    target: Option<Operand>,
    value: u8,
}

impl Rotate {
    /// CB-page form.
    #[must_use]
    pub fn new(shift: Shift, mode: AddressingMode) -> Self {
        Self {
            shift,
            mode,
            accumulator: false,
            copy_to: None,
            stage: Stage::Start,
            step: Step::Idle,
            target: None,
            value: 0,
        }
    }

    /// RLCA, RRCA, RLA or RRA.
    #[must_use]
    pub fn accumulator(shift: Shift) -> Self {
        Self {
            accumulator: true,
            ..Self::new(shift, AddressingMode::Register(Register::A))
        }
    }

    /// Also store the result in `reg` (indexed CB forms).
    #[must_use]
    pub fn copy_to(mut self, reg: Register) -> Self {
        self.copy_to = Some(reg);
        self
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
                    let reader = Reader::new(operand, Width::Byte, memory_settle(operand, 1));
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Apply => {
                    let (result, carry) = self.shift.apply(self.step.value() as u8, state.regs.carry());
                    let carry = if carry { CF } else { 0 };
                    if self.accumulator {
                        state.regs.set_flags(HF | NF | CF, carry);
                    } else {
                        state.regs.set_flags(SF | ZF | HF | PF | NF | CF, szp(result) | carry);
                    }
                    if let Some(reg) = self.copy_to {
                        state.regs.set(reg, result.into());
                    }
                    self.value = result;
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

impl fmt::Display for Rotate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.accumulator {
            let name = match self.shift.name() {
                "RLC" => "RLCA",
                "RRC" => "RRCA",
                "RL" => "RLA",
                _ => "RRA",
            };
            return f.write_str(name);
        }
        write!(f, "{} {}", self.shift.name(), self.mode.describe(Width::Byte))?;
        if let Some(reg) = self.copy_to {
            write!(f, ",{reg}")?;
        }
        Ok(())
    }
}

sequenced!(Rotate, Stage);

/// BIT, SET or RES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Test,
    Set,
    Reset,
}

/// A single-bit test or update of a byte operand.
#[derive(Debug, Clone)]
pub struct Bit {
    op: BitOp,
    bit: u8,
    mode: AddressingMode,
    copy_to: Option<Register>,
    stage: Stage,
    step: Step,
    target: Option<Operand>,
    value: u8,
}

impl Bit {
    /// # Panics
    ///
    /// Panics if `bit` is not in 0..=7.
    #[must_use]
    pub fn new(op: BitOp, bit: u8, mode: AddressingMode) -> Self {
        assert!(bit < 8, "bit number {bit} out of range");
        Self {
            op,
            bit,
            mode,
            copy_to: None,
            stage: Stage::Start,
            step: Step::Idle,
            target: None,
            value: 0,
        }
    }

    /// Also store the result in `reg` (indexed SET/RES forms).
    #[must_use]
    pub fn copy_to(mut self, reg: Register) -> Self {
        self.copy_to = Some(reg);
        self
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
                    let reader = Reader::new(operand, Width::Byte, memory_settle(operand, 1));
                    self.step.begin(Step::Read(reader), state);
                }
                Stage::Apply => {
                    let value = self.step.value() as u8;
                    let mask = 1 << self.bit;
                    match self.op {
                        BitOp::Test => {
                            let zero = if value & mask == 0 { ZF } else { 0 };
                            state.regs.set_flags(ZF | HF | NF, zero | HF);
                            self.stage = Stage::Done;
                            continue;
                        }
                        BitOp::Set => self.value = value | mask,
                        BitOp::Reset => self.value = value & !mask,
                    }
                    if let Some(reg) = self.copy_to {
                        state.regs.set(reg, self.value.into());
                    }
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

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            BitOp::Test => "BIT",
            BitOp::Set => "SET",
            BitOp::Reset => "RES",
        };
        write!(f, "{name} {},{}", self.bit, self.mode.describe(Width::Byte))?;
        if let Some(reg) = self.copy_to {
            write!(f, ",{reg}")?;
        }
        Ok(())
    }
}

sequenced!(Bit, Stage);

/// RLD and RRD: rotate a BCD digit between A and (HL).
#[derive(Debug, Clone)]
pub struct RotateDigit {
    left: bool,
    stage: Stage,
    step: Step,
    target: Option<Operand>,
    value: u8,
}

impl RotateDigit {
    #[must_use]
    pub fn rld() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn rrd() -> Self {
        Self::new(false)
    }

    fn new(left: bool) -> Self {
        Self {
            left,
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
                    let resolver = Resolver::new(AddressingMode::hl_indirect(), Width::Byte);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Read => {
                    let operand = self.step.operand();
                    self.target = Some(operand);
                    self.stage = Stage::Apply;
                    self.step.begin(Step::Read(Reader::new(operand, Width::Byte, 4)), state);
                }
                Stage::Apply => {
                    let memory = self.step.value() as u8;
                    let a = state.regs.a;
                    let (memory, a) = if self.left {
                        ((memory << 4) | (a & 0x0F), (a & 0xF0) | (memory >> 4))
                    } else {
                        ((a << 4) | (memory >> 4), (a & 0xF0) | (memory & 0x0F))
                    };
                    state.regs.a = a;
                    state.regs.set_flags(SF | ZF | HF | PF | NF, szp(a));
                    self.value = memory;
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

impl fmt::Display for RotateDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.left { "RLD" } else { "RRD" })
    }
}

sequenced!(RotateDigit, Stage);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    #[test]
    fn shift_table() {
        assert_eq!(Shift::RLC.apply(0x81, false), (0x03, true));
        assert_eq!(Shift::RRC.apply(0x01, false), (0x80, true));
        assert_eq!(Shift::RL.apply(0x80, true), (0x01, true));
        assert_eq!(Shift::RR.apply(0x01, false), (0x00, true));
        assert_eq!(Shift::SLA.apply(0xFF, true), (0xFE, true));
        assert_eq!(Shift::SRA.apply(0x81, false), (0xC0, true));
        assert_eq!(Shift::SLL.apply(0x00, false), (0x01, false));
        assert_eq!(Shift::SRL.apply(0x80, true), (0x40, false));
    }

    #[test]
    fn accumulator_rotate_keeps_sign_zero_parity() {
        let mut state = State::default();
        state.regs.a = 0x80;
        state.regs.f = SF | ZF | PF | HF | NF;
        let mut rlca = Rotate::accumulator(Shift::RLC);
        rlca.start_execution(&mut state);
        assert_eq!(state.regs.a, 0x01);
        assert_eq!(state.regs.f, SF | ZF | PF | CF);
        assert_eq!(rlca.mnemonic(), "RLCA");
    }

    #[test]
    fn bit_test_only_touches_z_h_n() {
        let mut state = State::default();
        state.regs.b = 0x00;
        state.regs.f = SF | PF | CF | NF;
        let mut bit = Bit::new(BitOp::Test, 7, AddressingMode::Register(Register::B));
        bit.start_execution(&mut state);
        assert!(bit.is_complete());
        assert_eq!(state.regs.f, SF | ZF | HF | PF | CF);
    }

    #[test]
    fn set_with_copy_updates_register() {
        let mut state = State::default();
        state.regs.c = 0x00;
        let mut set = Bit::new(BitOp::Set, 3, AddressingMode::Register(Register::C)).copy_to(Register::B);
        set.start_execution(&mut state);
        assert_eq!(state.regs.c, 0x08);
        assert_eq!(state.regs.b, 0x08);
        assert_eq!(set.mnemonic(), "SET 3,C,B");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn bit_number_is_checked() {
        let _ = Bit::new(BitOp::Test, 8, AddressingMode::Register(Register::A));
    }
}
