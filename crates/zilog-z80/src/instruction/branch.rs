//! JP, JR, DJNZ, CALL, RST and RET.
//!
//! Conditional forms always consume their operand bytes. Only a taken
//! branch commits PC and pays the extra internal T-states.

use std::fmt;

use crate::addressing::{AddressingMode, Operand, Reader, Resolver, Width, WordOrder, Writer};
use crate::cycle::MachineCycle;
use crate::flags::{CF, PF, SF, ZF};
use crate::registers::{Register, Registers};
use crate::state::State;

use super::{sequenced, Step};

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCondition {
    Always,
    NonZero,
    Zero,
    NoCarry,
    Carry,
    ParityOdd,
    ParityEven,
    Positive,
    Negative,
    /// DJNZ: B, after its decrement, is not zero.
    BNonZero,
}

impl JumpCondition {
    /// Condition selected by the `ccc` field of an opcode.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::NonZero,
            1 => Self::Zero,
            2 => Self::NoCarry,
            3 => Self::Carry,
            4 => Self::ParityOdd,
            5 => Self::ParityEven,
            6 => Self::Positive,
            _ => Self::Negative,
        }
    }

    #[must_use]
    pub const fn holds(self, regs: &Registers) -> bool {
        match self {
            Self::Always => true,
            Self::NonZero => regs.f & ZF == 0,
            Self::Zero => regs.f & ZF != 0,
            Self::NoCarry => regs.f & CF == 0,
            Self::Carry => regs.f & CF != 0,
            Self::ParityOdd => regs.f & PF == 0,
            Self::ParityEven => regs.f & PF != 0,
            Self::Positive => regs.f & SF == 0,
            Self::Negative => regs.f & SF != 0,
            Self::BNonZero => regs.b != 0,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Always | Self::BNonZero => "",
            Self::NonZero => "NZ,",
            Self::Zero => "Z,",
            Self::NoCarry => "NC,",
            Self::Carry => "C,",
            Self::ParityOdd => "PO,",
            Self::ParityEven => "PE,",
            Self::Positive => "P,",
            Self::Negative => "M,",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Resolve,
    Decide,
    Transfer,
    Commit,
    Done,
}

/// Resolved branch target from an operand.
fn target_of(operand: Operand, state: &State) -> u16 {
    match operand {
        Operand::Value(v) => v,
        Operand::Register(reg) => state.regs.get(reg),
        Operand::Memory { address, .. } => address,
    }
}

/// JP, JR and DJNZ.
#[derive(Debug, Clone)]
pub struct Jump {
    condition: JumpCondition,
    target: AddressingMode,
    /// Internal T-states when the branch is taken (5 for relative jumps).
    penalty: u8,
    stage: Stage,
    step: Step,
    destination: u16,
}

impl Jump {
    /// `JP cc,nn`, or `JP nn` with [`JumpCondition::Always`].
    #[must_use]
    pub fn absolute(condition: JumpCondition) -> Self {
        Self::new(condition, AddressingMode::Immediate, 0)
    }

    /// `JR cc,e`, or `JR e`.
    #[must_use]
    pub fn relative(condition: JumpCondition) -> Self {
        Self::new(condition, AddressingMode::Relative, 5)
    }

    /// `DJNZ e`.
    #[must_use]
    pub fn djnz() -> Self {
        Self::new(JumpCondition::BNonZero, AddressingMode::Relative, 5)
    }

    /// `JP (HL)`, `JP (IX)`, `JP (IY)`: PC takes the register's value.
    #[must_use]
    pub fn register(reg: Register) -> Self {
        Self::new(JumpCondition::Always, AddressingMode::Register(reg), 0)
    }

    fn new(condition: JumpCondition, target: AddressingMode, penalty: u8) -> Self {
        Self {
            condition,
            target,
            penalty,
            stage: Stage::Start,
            step: Step::Idle,
            destination: 0,
        }
    }

    fn width(&self) -> Width {
        match self.target {
            AddressingMode::Relative => Width::Byte,
            _ => Width::Word,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Resolve;
                    if self.condition == JumpCondition::BNonZero {
                        state.regs.b = state.regs.b.wrapping_sub(1);
                        self.step.begin(Step::Cycle(MachineCycle::internal(1)), state);
                    }
                }
                Stage::Resolve => {
                    self.stage = Stage::Decide;
                    let resolver = Resolver::new(self.target, self.width());
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Decide => {
                    self.destination = target_of(self.step.operand(), state);
                    if self.condition.holds(&state.regs) {
                        self.stage = Stage::Commit;
                        self.step.begin(Step::Cycle(MachineCycle::internal(self.penalty)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Commit => {
                    state.regs.pc = self.destination;
                    self.stage = Stage::Done;
                }
                Stage::Transfer => unreachable!("jumps touch no memory"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.condition.suffix();
        match self.target {
            AddressingMode::Relative if self.condition == JumpCondition::BNonZero => {
                f.write_str("DJNZ e")
            }
            AddressingMode::Relative => write!(f, "JR {suffix}e"),
            AddressingMode::Register(reg) => write!(f, "JP ({reg})"),
            _ => write!(f, "JP {suffix}nn"),
        }
    }
}

sequenced!(Jump, Stage);

/// CALL and RST: push the return address, then jump.
#[derive(Debug, Clone)]
pub struct Call {
    condition: JumpCondition,
    target: AddressingMode,
    stage: Stage,
    step: Step,
    destination: u16,
}

impl Call {
    /// `CALL cc,nn`, or `CALL nn`.
    #[must_use]
    pub fn new(condition: JumpCondition) -> Self {
        Self::with_target(condition, AddressingMode::Immediate)
    }

    /// `RST p`.
    #[must_use]
    pub fn rst(vector: u16) -> Self {
        Self::with_target(JumpCondition::Always, AddressingMode::Static(vector))
    }

    fn with_target(condition: JumpCondition, target: AddressingMode) -> Self {
        Self {
            condition,
            target,
            stage: Stage::Start,
            step: Step::Idle,
            destination: 0,
        }
    }

    fn advance(&mut self, state: &mut State) {
        loop {
            if self.step.is_busy() {
                return;
            }
            match self.stage {
                Stage::Start | Stage::Resolve => {
                    self.stage = Stage::Decide;
                    let resolver = Resolver::new(self.target, Width::Word);
                    self.step.begin(Step::Resolve(resolver), state);
                }
                Stage::Decide => {
                    self.destination = target_of(self.step.operand(), state);
                    if self.condition.holds(&state.regs) {
                        self.stage = Stage::Transfer;
                        self.step.begin(Step::Cycle(MachineCycle::internal(1)), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Transfer => {
                    self.stage = Stage::Commit;
                    let pc = state.regs.pc;
                    let writer = push(state, pc);
                    self.step.begin(Step::Write(writer), state);
                }
                Stage::Commit => {
                    state.regs.pc = self.destination;
                    self.stage = Stage::Done;
                }
                Stage::Done => return,
            }
        }
    }
}

/// Decrement SP by two and build the writer that stores `value` there,
/// high byte first.
pub(crate) fn push(state: &mut State, value: u16) -> Writer {
    state.regs.sp = state.regs.sp.wrapping_sub(2);
    let operand = Operand::Memory {
        address: state.regs.sp,
        order: WordOrder::HighFirst,
    };
    Writer::new(operand, Width::Word, value, 0)
}

/// Reader for the word at SP. The caller adds two to SP when it completes.
pub(crate) fn pop(state: &State) -> Reader {
    Reader::new(Operand::memory(state.regs.sp), Width::Word, 0)
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            AddressingMode::Static(vector) => write!(f, "RST {vector:02X}H"),
            _ => write!(f, "CALL {}nn", self.condition.suffix()),
        }
    }
}

sequenced!(Call, Stage);

/// Which return instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Ret,
    /// Return from interrupt. Leaves IFF1 alone.
    Reti,
    /// Return from NMI. Restores IFF1 from IFF2.
    Retn,
}

/// RET, RET cc, RETI, RETN.
#[derive(Debug, Clone)]
pub struct Return {
    condition: JumpCondition,
    kind: ReturnKind,
    stage: Stage,
    step: Step,
}

impl Return {
    #[must_use]
    pub fn new(condition: JumpCondition) -> Self {
        Self::with_kind(condition, ReturnKind::Ret)
    }

    #[must_use]
    pub fn with_kind(condition: JumpCondition, kind: ReturnKind) -> Self {
        Self {
            condition,
            kind,
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
                    self.stage = Stage::Decide;
                    if self.condition != JumpCondition::Always {
                        self.step.begin(Step::Cycle(MachineCycle::internal(1)), state);
                    }
                }
                Stage::Decide => {
                    if self.condition.holds(&state.regs) {
                        self.stage = Stage::Commit;
                        let reader = pop(state);
                        self.step.begin(Step::Read(reader), state);
                    } else {
                        self.stage = Stage::Done;
                    }
                }
                Stage::Commit => {
                    state.regs.pc = self.step.value();
                    state.regs.sp = state.regs.sp.wrapping_add(2);
                    if self.kind == ReturnKind::Retn {
                        state.regs.iff1 = state.regs.iff2;
                    }
                    self.stage = Stage::Done;
                }
                Stage::Resolve | Stage::Transfer => unreachable!("returns resolve nothing"),
                Stage::Done => return,
            }
        }
    }
}

impl fmt::Display for Return {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReturnKind::Reti => f.write_str("RETI"),
            ReturnKind::Retn => f.write_str("RETN"),
            ReturnKind::Ret => match self.condition.suffix().trim_end_matches(',') {
                "" => f.write_str("RET"),
                cc => write!(f, "RET {cc}"),
            },
        }
    }
}

sequenced!(Return, Stage);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    #[test]
    fn condition_table() {
        let mut regs = Registers::default();
        assert!(JumpCondition::NonZero.holds(&regs));
        regs.f = ZF | CF;
        assert!(JumpCondition::Zero.holds(&regs));
        assert!(JumpCondition::Carry.holds(&regs));
        assert!(!JumpCondition::NoCarry.holds(&regs));
        assert!(JumpCondition::ParityOdd.holds(&regs));
        assert!(JumpCondition::Positive.holds(&regs));
        regs.b = 1;
        assert!(JumpCondition::BNonZero.holds(&regs));
    }

    #[test]
    fn jp_hl_is_free() {
        let mut state = State::default();
        state.regs.set_hl(0xBEEF);
        let mut jp = Jump::register(Register::Hl);
        jp.start_execution(&mut state);
        assert!(jp.is_complete());
        assert_eq!(state.regs.pc, 0xBEEF);
        assert_eq!(jp.mnemonic(), "JP (HL)");
    }

    #[test]
    fn untaken_return_costs_one() {
        let mut state = State::default();
        state.regs.pc = 0x1234;
        state.regs.f = ZF;
        let mut ret = Return::new(JumpCondition::NonZero);
        ret.start_execution(&mut state);
        ret.clock(&mut state);
        assert!(ret.is_complete());
        assert_eq!(state.regs.pc, 0x1234);
    }

    #[test]
    fn retn_restores_iff1() {
        let mut state = State::default();
        state.regs.iff2 = true;
        let mut retn = Return::with_kind(JumpCondition::Always, ReturnKind::Retn);
        retn.start_execution(&mut state);
        while !retn.is_complete() {
            retn.clock(&mut state);
        }
        assert!(state.regs.iff1);
        assert_eq!(state.regs.sp, 2);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Jump::relative(JumpCondition::Carry).mnemonic(), "JR C,e");
        assert_eq!(Jump::djnz().mnemonic(), "DJNZ e");
        assert_eq!(Call::new(JumpCondition::Always).mnemonic(), "CALL nn");
        assert_eq!(Call::rst(0x38).mnemonic(), "RST 38H");
        assert_eq!(Return::new(JumpCondition::ParityEven).mnemonic(), "RET PE");
    }
}
