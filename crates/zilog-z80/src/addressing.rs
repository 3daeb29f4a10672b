//! Addressing modes.
//!
//! An instruction names its operands with [`AddressingMode`]. A
//! [`Resolver`] clocks whatever bus cycles the mode needs (operand bytes,
//! displacement, address arithmetic) and yields an [`Operand`]. From an
//! operand an instruction builds a [`Reader`] or a [`Writer`], each of which
//! is again a clockable sequencer, because reading and writing the same
//! operand cost different amounts of time.

use std::fmt;

use crate::cycle::MachineCycle;
use crate::registers::{IndexRegister, Register};
use crate::state::State;

/// Operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

/// Byte order used when a word is written to memory.
///
/// Reads always fetch the low byte first. Writes normally do too, but stack
/// pushes and `EX (SP),rr` write the high byte (at the higher address)
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOrder {
    LowFirst,
    HighFirst,
}

/// How an operand is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// Operand bytes follow the opcode. Read-only.
    Immediate,
    /// A register. Zero cycles.
    Register(Register),
    /// A register pair holds the byte operand's address.
    RegisterIndirect(Register),
    /// A two-byte little-endian address follows the opcode.
    Extended,
    /// A register pair points at a word operand in memory (`(SP)`).
    ExtendedPointer { pair: Register, order: WordOrder },
    /// IX or IY plus a signed displacement byte, followed by `delay`
    /// internal T-states of address arithmetic. A displacement that was
    /// already read elsewhere (DDCB/FDCB) is supplied up front.
    Indexed {
        index: IndexRegister,
        delay: u8,
        displacement: Option<i8>,
    },
    /// Signed displacement from the address of the next instruction.
    /// Read-only; resolves to the target address.
    Relative,
    /// A constant (RST vectors). Read-only.
    Static(u16),
}

impl AddressingMode {
    /// `(IX+d)`/`(IY+d)` with the standard 5 T-state address calculation.
    #[must_use]
    pub const fn indexed(index: IndexRegister) -> Self {
        Self::Indexed {
            index,
            delay: 5,
            displacement: None,
        }
    }

    /// `(HL)`.
    #[must_use]
    pub const fn hl_indirect() -> Self {
        Self::RegisterIndirect(Register::Hl)
    }

    /// Assembler text for this operand at the given width.
    #[must_use]
    pub fn describe(&self, width: Width) -> String {
        match (self, width) {
            (Self::Immediate, Width::Byte) => "n".to_string(),
            (Self::Immediate, Width::Word) => "nn".to_string(),
            (Self::Register(reg), _) => reg.to_string(),
            (Self::RegisterIndirect(reg), _) | (Self::ExtendedPointer { pair: reg, .. }, _) => {
                format!("({reg})")
            }
            (Self::Extended, _) => "(nn)".to_string(),
            (
                Self::Indexed {
                    index,
                    displacement,
                    ..
                },
                _,
            ) => match displacement {
                Some(d) => format!("({}{d:+})", index.pair()),
                None => format!("({}+d)", index.pair()),
            },
            (Self::Relative, _) => "e".to_string(),
            (Self::Static(value), _) => format!("{value:02X}H"),
        }
    }
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Memory { address: u16, order: WordOrder },
    /// A constant produced by resolution. Read-only.
    Value(u16),
}

impl Operand {
    /// A byte, or a low-byte-first word, in memory.
    #[must_use]
    pub const fn memory(address: u16) -> Self {
        Self::Memory {
            address,
            order: WordOrder::LowFirst,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(reg) => write!(f, "{reg}"),
            Self::Memory { address, .. } => write!(f, "({address:04X}H)"),
            Self::Value(v) => write!(f, "{v:04X}H"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveStage {
    Start,
    Low,
    High,
    Displacement,
    Delay,
    Done,
}

/// Clocks an addressing mode until its operand is known.
#[derive(Debug, Clone)]
pub struct Resolver {
    mode: AddressingMode,
    width: Width,
    stage: ResolveStage,
    cycle: Option<MachineCycle>,
    low: u8,
    displacement: i8,
    operand: Option<Operand>,
}

impl Resolver {
    #[must_use]
    pub fn new(mode: AddressingMode, width: Width) -> Self {
        Self {
            mode,
            width,
            stage: ResolveStage::Start,
            cycle: None,
            low: 0,
            displacement: 0,
            operand: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.mode, self.width);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == ResolveStage::Done
    }

    /// The resolved operand.
    ///
    /// # Panics
    ///
    /// Panics if resolution has not finished.
    #[must_use]
    pub fn operand(&self) -> Operand {
        match self.operand {
            Some(operand) => operand,
            None => panic!("operand of {:?} requested before it resolved", self.mode),
        }
    }

    /// Advance one T-state.
    pub fn clock(&mut self, state: &mut State) {
        assert!(!self.is_complete(), "{:?} clocked after resolving", self.mode);
        if let Some(cycle) = &mut self.cycle {
            cycle.clock(state);
        }
        self.advance(state);
    }

    fn finish(&mut self, operand: Operand) {
        self.operand = Some(operand);
        self.stage = ResolveStage::Done;
    }

    fn read_next(&mut self, stage: ResolveStage) {
        self.cycle = Some(MachineCycle::memory_read(None));
        self.stage = stage;
    }

    /// Make all progress possible without a clock pulse.
    pub fn advance(&mut self, state: &mut State) {
        loop {
            if self.cycle.is_some_and(|c| !c.is_complete()) {
                return;
            }
            let latched = self.cycle.take().map_or(0, |c| c.value());

            match self.stage {
                ResolveStage::Start => match self.mode {
                    AddressingMode::Register(reg) => self.finish(Operand::Register(reg)),
                    AddressingMode::RegisterIndirect(pair) => {
                        self.finish(Operand::memory(state.regs.get(pair)));
                    }
                    AddressingMode::ExtendedPointer { pair, order } => {
                        self.finish(Operand::Memory {
                            address: state.regs.get(pair),
                            order,
                        });
                    }
                    AddressingMode::Static(value) => self.finish(Operand::Value(value)),
                    AddressingMode::Immediate | AddressingMode::Extended => {
                        self.read_next(ResolveStage::Low);
                    }
                    AddressingMode::Relative
                    | AddressingMode::Indexed {
                        displacement: None, ..
                    } => self.read_next(ResolveStage::Displacement),
                    AddressingMode::Indexed {
                        displacement: Some(d),
                        delay,
                        ..
                    } => {
                        self.displacement = d;
                        self.start_delay(delay);
                    }
                },
                ResolveStage::Low => {
                    if self.mode == AddressingMode::Immediate && self.width == Width::Byte {
                        self.finish(Operand::Value(latched.into()));
                    } else {
                        self.low = latched;
                        self.read_next(ResolveStage::High);
                    }
                }
                ResolveStage::High => {
                    let word = u16::from(self.low) | (u16::from(latched) << 8);
                    if self.mode == AddressingMode::Extended {
                        self.finish(Operand::memory(word));
                    } else {
                        self.finish(Operand::Value(word));
                    }
                }
                ResolveStage::Displacement => {
                    let d = latched as i8;
                    if let AddressingMode::Indexed { delay, .. } = self.mode {
                        self.displacement = d;
                        self.start_delay(delay);
                    } else {
                        // PC already points past the displacement byte.
                        let target = state.regs.pc.wrapping_add(d as u16);
                        self.finish(Operand::Value(target));
                    }
                }
                ResolveStage::Delay => {
                    let AddressingMode::Indexed { index, .. } = self.mode else {
                        unreachable!("delay stage outside indexed addressing");
                    };
                    let base = state.regs.get(index.pair());
                    self.finish(Operand::memory(base.wrapping_add(self.displacement as u16)));
                }
                ResolveStage::Done => return,
            }
        }
    }

    fn start_delay(&mut self, delay: u8) {
        if delay > 0 {
            self.cycle = Some(MachineCycle::internal(delay));
        }
        self.stage = ResolveStage::Delay;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessStage {
    Start,
    First,
    Second,
    Settle,
    Done,
}

/// Reads a resolved operand.
///
/// Register and constant operands are available immediately. Memory
/// operands cost one read cycle per byte, followed by `settle` internal
/// T-states (read-modify-write instructions use this for their ALU pass).
#[derive(Debug, Clone)]
pub struct Reader {
    operand: Operand,
    width: Width,
    settle: u8,
    stage: AccessStage,
    cycle: Option<MachineCycle>,
    value: u16,
}

impl Reader {
    #[must_use]
    pub fn new(operand: Operand, width: Width, settle: u8) -> Self {
        Self {
            operand,
            width,
            settle,
            stage: AccessStage::Start,
            cycle: None,
            value: 0,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == AccessStage::Done
    }

    /// The value read.
    ///
    /// # Panics
    ///
    /// Panics if the read has not finished.
    #[must_use]
    pub fn value(&self) -> u16 {
        assert!(self.is_complete(), "read of {} not finished", self.operand);
        self.value
    }

    pub fn clock(&mut self, state: &mut State) {
        assert!(!self.is_complete(), "read of {} clocked after completion", self.operand);
        if let Some(cycle) = &mut self.cycle {
            cycle.clock(state);
        }
        self.advance(state);
    }

    pub fn advance(&mut self, state: &mut State) {
        loop {
            if self.cycle.is_some_and(|c| !c.is_complete()) {
                return;
            }
            let latched = self.cycle.take().map_or(0, |c| c.value());

            match self.stage {
                AccessStage::Start => match self.operand {
                    Operand::Register(reg) => {
                        self.value = state.regs.get(reg);
                        self.stage = AccessStage::Done;
                    }
                    Operand::Value(v) => {
                        self.value = match self.width {
                            Width::Byte => v & 0xFF,
                            Width::Word => v,
                        };
                        self.stage = AccessStage::Done;
                    }
                    Operand::Memory { address, .. } => {
                        self.cycle = Some(MachineCycle::memory_read(Some(address)));
                        self.stage = AccessStage::First;
                    }
                },
                AccessStage::First => {
                    self.value = latched.into();
                    if self.width == Width::Word {
                        let Operand::Memory { address, .. } = self.operand else {
                            unreachable!();
                        };
                        self.cycle = Some(MachineCycle::memory_read(Some(address.wrapping_add(1))));
                        self.stage = AccessStage::Second;
                    } else {
                        self.stage = AccessStage::Second;
                    }
                }
                AccessStage::Second => {
                    if self.width == Width::Word {
                        self.value |= u16::from(latched) << 8;
                    }
                    if self.settle > 0 {
                        self.cycle = Some(MachineCycle::internal(self.settle));
                    }
                    self.stage = AccessStage::Settle;
                }
                AccessStage::Settle => self.stage = AccessStage::Done,
                AccessStage::Done => return,
            }
        }
    }
}

/// Writes a value through a resolved operand.
///
/// Memory writes may be followed by `settle` internal T-states.
#[derive(Debug, Clone)]
pub struct Writer {
    operand: Operand,
    width: Width,
    value: u16,
    settle: u8,
    stage: AccessStage,
    cycle: Option<MachineCycle>,
}

impl Writer {
    /// # Panics
    ///
    /// Panics if `operand` is a read-only constant.
    #[must_use]
    pub fn new(operand: Operand, width: Width, value: u16, settle: u8) -> Self {
        assert!(
            !matches!(operand, Operand::Value(_)),
            "cannot write through read-only operand {operand}"
        );
        Self {
            operand,
            width,
            value,
            settle,
            stage: AccessStage::Start,
            cycle: None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == AccessStage::Done
    }

    pub fn clock(&mut self, state: &mut State) {
        assert!(!self.is_complete(), "write to {} clocked after completion", self.operand);
        if let Some(cycle) = &mut self.cycle {
            cycle.clock(state);
        }
        self.advance(state);
    }

    pub fn advance(&mut self, state: &mut State) {
        let [low, high] = self.value.to_le_bytes();
        loop {
            if self.cycle.is_some_and(|c| !c.is_complete()) {
                return;
            }
            self.cycle = None;

            match (self.stage, self.operand) {
                (AccessStage::Start, Operand::Register(reg)) => {
                    state.regs.set(reg, self.value);
                    self.stage = AccessStage::Done;
                }
                (AccessStage::Start, Operand::Memory { address, order }) => {
                    let first = match (self.width, order) {
                        (Width::Byte, _) | (Width::Word, WordOrder::LowFirst) => {
                            MachineCycle::memory_write(address, low)
                        }
                        (Width::Word, WordOrder::HighFirst) => {
                            MachineCycle::memory_write(address.wrapping_add(1), high)
                        }
                    };
                    self.cycle = Some(first);
                    self.stage = AccessStage::First;
                }
                (AccessStage::First, Operand::Memory { address, order }) => {
                    if self.width == Width::Word {
                        let second = match order {
                            WordOrder::LowFirst => {
                                MachineCycle::memory_write(address.wrapping_add(1), high)
                            }
                            WordOrder::HighFirst => MachineCycle::memory_write(address, low),
                        };
                        self.cycle = Some(second);
                    }
                    self.stage = AccessStage::Second;
                }
                (AccessStage::Second, _) => {
                    if self.settle > 0 {
                        self.cycle = Some(MachineCycle::internal(self.settle));
                    }
                    self.stage = AccessStage::Settle;
                }
                (AccessStage::Settle, _) => self.stage = AccessStage::Done,
                (AccessStage::Done, _) => return,
                (_, Operand::Value(_) | Operand::Register(_)) => {
                    unreachable!("register and constant writes finish at start")
                }
            }
        }
    }
}
