//! Z80 register set.

use std::fmt;

use crate::flags::CF;

/// Every register an operand can name.
///
/// Byte registers and register pairs share one enum so a register-direct
/// operand is a single value regardless of width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    I,
    R,
    /// High byte of IX (undocumented).
    Ixh,
    /// Low byte of IX (undocumented).
    Ixl,
    /// High byte of IY (undocumented).
    Iyh,
    /// Low byte of IY (undocumented).
    Iyl,
    Af,
    Bc,
    De,
    Hl,
    Sp,
    Ix,
    Iy,
}

impl Register {
    /// Assembler name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::F => "F",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::H => "H",
            Self::L => "L",
            Self::I => "I",
            Self::R => "R",
            Self::Ixh => "IXH",
            Self::Ixl => "IXL",
            Self::Iyh => "IYH",
            Self::Iyl => "IYL",
            Self::Af => "AF",
            Self::Bc => "BC",
            Self::De => "DE",
            Self::Hl => "HL",
            Self::Sp => "SP",
            Self::Ix => "IX",
            Self::Iy => "IY",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An index register. Indexed addressing can only be built from one of
/// these, so "HL plus displacement" is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexRegister {
    Ix,
    Iy,
}

impl IndexRegister {
    /// The full 16-bit register.
    #[must_use]
    pub const fn pair(self) -> Register {
        match self {
            Self::Ix => Register::Ix,
            Self::Iy => Register::Iy,
        }
    }

    /// The undocumented high-byte half.
    #[must_use]
    pub const fn high(self) -> Register {
        match self {
            Self::Ix => Register::Ixh,
            Self::Iy => Register::Iyh,
        }
    }

    /// The undocumented low-byte half.
    #[must_use]
    pub const fn low(self) -> Register {
        match self {
            Self::Ix => Register::Ixl,
            Self::Iy => Register::Iyl,
        }
    }

    /// The prefix byte selecting this register.
    #[must_use]
    pub const fn prefix(self) -> u8 {
        match self {
            Self::Ix => 0xDD,
            Self::Iy => 0xFD,
        }
    }
}

/// Z80 register file and processor status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    // Main registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    // Alternate registers
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,

    // Index registers
    pub ix: u16,
    pub iy: u16,

    // Other registers
    pub sp: u16,
    pub pc: u16,
    /// Interrupt vector base.
    pub i: u8,
    /// Memory refresh counter.
    pub r: u8,

    // Interrupt state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,

    // Halt state
    pub halted: bool,
}

impl Registers {
    /// Get AF register pair.
    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    /// Get BC register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    /// Get DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    /// Get HL register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    /// Set AF register pair.
    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.f = value as u8;
    }

    /// Set BC register pair.
    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    /// Set DE register pair.
    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    /// Set HL register pair.
    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// Read any register. Byte registers are zero-extended.
    #[must_use]
    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::A => self.a.into(),
            Register::F => self.f.into(),
            Register::B => self.b.into(),
            Register::C => self.c.into(),
            Register::D => self.d.into(),
            Register::E => self.e.into(),
            Register::H => self.h.into(),
            Register::L => self.l.into(),
            Register::I => self.i.into(),
            Register::R => self.r.into(),
            Register::Ixh => self.ix >> 8,
            Register::Ixl => self.ix & 0xFF,
            Register::Iyh => self.iy >> 8,
            Register::Iyl => self.iy & 0xFF,
            Register::Af => self.af(),
            Register::Bc => self.bc(),
            Register::De => self.de(),
            Register::Hl => self.hl(),
            Register::Sp => self.sp,
            Register::Ix => self.ix,
            Register::Iy => self.iy,
        }
    }

    /// Write any register. Byte registers take the low byte of `value`.
    pub fn set(&mut self, reg: Register, value: u16) {
        let byte = value as u8;
        match reg {
            Register::A => self.a = byte,
            Register::F => self.f = byte,
            Register::B => self.b = byte,
            Register::C => self.c = byte,
            Register::D => self.d = byte,
            Register::E => self.e = byte,
            Register::H => self.h = byte,
            Register::L => self.l = byte,
            Register::I => self.i = byte,
            Register::R => self.r = byte,
            Register::Ixh => self.ix = (self.ix & 0x00FF) | (u16::from(byte) << 8),
            Register::Ixl => self.ix = (self.ix & 0xFF00) | u16::from(byte),
            Register::Iyh => self.iy = (self.iy & 0x00FF) | (u16::from(byte) << 8),
            Register::Iyl => self.iy = (self.iy & 0xFF00) | u16::from(byte),
            Register::Af => self.set_af(value),
            Register::Bc => self.set_bc(value),
            Register::De => self.set_de(value),
            Register::Hl => self.set_hl(value),
            Register::Sp => self.sp = value,
            Register::Ix => self.ix = value,
            Register::Iy => self.iy = value,
        }
    }

    /// True if every bit of `mask` is set in F.
    #[must_use]
    pub const fn flag(&self, mask: u8) -> bool {
        self.f & mask == mask
    }

    /// Carry as 0 or 1, for ADC/SBC/RL/RR.
    #[must_use]
    pub const fn carry(&self) -> bool {
        self.f & CF != 0
    }

    /// Replace the flags selected by `mask` with the matching bits of
    /// `value`. Flags outside `mask` are left exactly as they were.
    pub fn set_flags(&mut self, mask: u8, value: u8) {
        self.f = (self.f & !mask) | (value & mask);
    }

    /// EX AF,AF'.
    pub fn exchange_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_alt);
        std::mem::swap(&mut self.f, &mut self.f_alt);
    }

    /// EXX: swap BC, DE and HL with their alternates.
    pub fn exchange_all(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_alt);
        std::mem::swap(&mut self.c, &mut self.c_alt);
        std::mem::swap(&mut self.d, &mut self.d_alt);
        std::mem::swap(&mut self.e, &mut self.e_alt);
        std::mem::swap(&mut self.h, &mut self.h_alt);
        std::mem::swap(&mut self.l, &mut self.l_alt);
    }

    /// EX DE,HL.
    pub fn exchange_de_hl(&mut self) {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
    }

    /// Increment R register (lower 7 bits only).
    pub fn increment_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }
}
