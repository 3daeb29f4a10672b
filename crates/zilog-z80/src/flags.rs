//! Z80 flag register bits.
//!
//! Bits 3 and 5 of F exist on the chip but are not modelled: no instruction
//! changes them, so whatever a host seeds there survives untouched.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

/// Every modelled flag.
pub const ALL: u8 = SF | ZF | HF | PF | NF | CF;

/// Compute parity of a byte (true if even number of 1 bits).
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones() & 1 == 0
}

/// Sign and zero bits for a byte result.
#[must_use]
pub const fn sz(value: u8) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x80 != 0 {
        f |= SF;
    }
    f
}

/// Sign, zero and parity bits for a byte result.
#[must_use]
pub const fn szp(value: u8) -> u8 {
    let mut f = sz(value);
    if parity(value) {
        f |= PF;
    }
    f
}
