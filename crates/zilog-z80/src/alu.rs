//! ALU operations.
//!
//! Every function returns the result together with a full set of flag bits.
//! The caller decides which of those bits the instruction is allowed to
//! change and applies them with [`Registers::set_flags`], so flags an
//! instruction does not define are never touched.
//!
//! [`Registers::set_flags`]: crate::registers::Registers::set_flags

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::verbose_bit_mask)] // Clearer to read mask comparisons.

use crate::flags::{sz, szp, CF, HF, NF, PF, SF, ZF};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult<T = u8> {
    pub value: T,
    pub flags: u8,
}

/// Add two bytes with optional carry.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let result = wide as u8;

    let mut flags = sz(result);
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= HF;
    }
    // Both operands share a sign the result does not.
    if (a ^ b) & 0x80 == 0 && (a ^ result) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }

    AluResult { value: result, flags }
}

/// Subtract with optional borrow. Also serves CP, which discards the value.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let result = a.wrapping_sub(b).wrapping_sub(c);

    let mut flags = sz(result) | NF;
    if (a & 0x0F) < (b & 0x0F) + c {
        flags |= HF;
    }
    // Operands differ in sign and the result took the subtrahend's.
    if (a ^ b) & 0x80 != 0 && (b ^ result) & 0x80 == 0 {
        flags |= PF;
    }
    if u16::from(a) < u16::from(b) + u16::from(c) {
        flags |= CF;
    }

    AluResult { value: result, flags }
}

/// AND: H set, N and C reset, P/V is parity.
#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let result = a & b;
    AluResult {
        value: result,
        flags: szp(result) | HF,
    }
}

/// OR: H, N and C reset, P/V is parity.
#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let result = a | b;
    AluResult {
        value: result,
        flags: szp(result),
    }
}

/// XOR: H, N and C reset, P/V is parity.
#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let result = a ^ b;
    AluResult {
        value: result,
        flags: szp(result),
    }
}

/// Increment. Carry is not produced; callers must mask it out.
#[must_use]
pub fn inc8(a: u8) -> AluResult {
    let result = a.wrapping_add(1);
    let mut flags = sz(result);
    if a & 0x0F == 0x0F {
        flags |= HF;
    }
    if a == 0x7F {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// Decrement. Carry is not produced; callers must mask it out.
#[must_use]
pub fn dec8(a: u8) -> AluResult {
    let result = a.wrapping_sub(1);
    let mut flags = sz(result) | NF;
    if a & 0x0F == 0x00 {
        flags |= HF;
    }
    if a == 0x80 {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// Two's complement negation of A.
///
/// Equivalent to `0 - a`: H is the borrow out of bit 4 (set whenever the
/// low nibble is non-zero), P/V only for 0x80, C whenever `a` is non-zero.
#[must_use]
pub fn neg8(a: u8) -> AluResult {
    sub8(0, a, false)
}

/// Decimal adjust after BCD addition or subtraction.
///
/// `flags` is the current F; N selects the direction. N itself is not
/// changed.
#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let subtract = flags & NF != 0;
    let half = flags & HF != 0;
    let carry = flags & CF != 0;
    let low = a & 0x0F;

    let mut correction = 0;
    let mut carry_out = false;
    if half || low > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry_out = true;
    }

    let result = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };

    let half_out = if subtract { half && low < 6 } else { low > 9 };

    let mut out = szp(result);
    if half_out {
        out |= HF;
    }
    if carry_out {
        out |= CF;
    }
    AluResult {
        value: result,
        flags: out,
    }
}

/// ADD HL,rr (and IX/IY): only H, N and C are defined.
#[must_use]
pub fn add16(a: u16, b: u16) -> AluResult<u16> {
    let wide = u32::from(a) + u32::from(b);
    let mut flags = 0;
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        flags |= HF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    AluResult {
        value: wide as u16,
        flags,
    }
}

fn sz16(value: u16) -> u8 {
    let mut flags = 0;
    if value == 0 {
        flags |= ZF;
    }
    if value & 0x8000 != 0 {
        flags |= SF;
    }
    flags
}

/// ADC HL,rr: every flag is defined.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> AluResult<u16> {
    let c = u16::from(carry);
    let wide = u32::from(a) + u32::from(b) + u32::from(c);
    let result = wide as u16;

    let mut flags = sz16(result);
    if (a & 0x0FFF) + (b & 0x0FFF) + c > 0x0FFF {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ result) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    AluResult {
        value: result,
        flags,
    }
}

/// SBC HL,rr: every flag is defined.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> AluResult<u16> {
    let c = u16::from(carry);
    let result = a.wrapping_sub(b).wrapping_sub(c);

    let mut flags = sz16(result) | NF;
    if (a & 0x0FFF) < (b & 0x0FFF) + c {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (b ^ result) & 0x8000 == 0 {
        flags |= PF;
    }
    if u32::from(a) < u32::from(b) + u32::from(c) {
        flags |= CF;
    }
    AluResult {
        value: result,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_half_carry_and_overflow() {
        let r = add8(0x0F, 0x01, false);
        assert_eq!(r.value, 0x10);
        assert_eq!(r.flags, HF);

        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, SF | HF | PF);

        let r = add8(0xFF, 0x01, false);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | HF | CF);
    }

    #[test]
    fn add_with_carry_in() {
        let r = add8(0x0E, 0x01, true);
        assert_eq!(r.value, 0x10);
        assert_eq!(r.flags & HF, HF);
    }

    #[test]
    fn sub_borrows() {
        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags, SF | HF | NF | CF);

        let r = sub8(0x80, 0x01, false);
        assert_eq!(r.value, 0x7F);
        assert_eq!(r.flags, HF | PF | NF);

        let r = sub8(0x42, 0x42, false);
        assert_eq!(r.flags, ZF | NF);
    }

    #[test]
    fn logic_ops_report_parity() {
        let r = and8(0x8F, 0x03);
        assert_eq!(r.value, 0x03);
        assert_eq!(r.flags, HF | PF);

        assert_eq!(or8(0x00, 0x00).flags, ZF | PF);
        assert_eq!(xor8(0xFF, 0x7F).flags, SF);
    }

    #[test]
    fn inc_dec_boundaries() {
        assert_eq!(inc8(0x7F).flags, SF | HF | PF);
        assert_eq!(inc8(0xFF).flags, ZF | HF);
        assert_eq!(dec8(0x80).flags, HF | PF | NF);
        assert_eq!(dec8(0x01).flags, ZF | NF);
        assert_eq!(inc8(0x7F).flags & CF, 0);
    }

    #[test]
    fn neg_quirks() {
        let r = neg8(0x80);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, SF | PF | NF | CF);

        let r = neg8(0x00);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | NF);

        let r = neg8(0x01);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags, SF | HF | NF | CF);

        // Low nibble zero: no borrow from bit 4.
        assert_eq!(neg8(0x10).flags & HF, 0);
    }

    #[test]
    fn daa_after_addition() {
        let r = daa(0x0E, 0);
        assert_eq!(r.value, 0x14);
        assert_eq!(r.flags & CF, 0);
        assert_eq!(r.flags & HF, HF);

        // 0x99 + 0x01 = 0x9A, adjusts to 0x00 with carry.
        let r = daa(0x9A, 0);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | PF | HF | CF);
    }

    #[test]
    fn daa_after_subtraction() {
        // 0x10 - 0x01 = 0x0F with H set: adjusts to 0x09.
        let r = daa(0x0F, NF | HF);
        assert_eq!(r.value, 0x09);
        assert_eq!(r.flags & CF, 0);
        assert_eq!(r.flags & HF, 0);
    }

    #[test]
    fn wide_arithmetic() {
        let r = add16(0x0FFF, 0x0001);
        assert_eq!(r.value, 0x1000);
        assert_eq!(r.flags, HF);

        let r = adc16(0x7FFF, 0x0000, true);
        assert_eq!(r.value, 0x8000);
        assert_eq!(r.flags, SF | HF | PF);

        let r = sbc16(0x0000, 0x0000, true);
        assert_eq!(r.value, 0xFFFF);
        assert_eq!(r.flags, SF | HF | NF | CF);

        let r = sbc16(0x1234, 0x1234, false);
        assert_eq!(r.flags, ZF | NF);
    }
}
