//! Extended-opcode decode.
//!
//! An extended opcode is the final opcode byte with any page prefix in the
//! high byte: `0x0078` is `LD A,B`, `0xCB7E` is `BIT 7,(HL)`, `0xED44` is
//! `NEG`, `0xDD21` is `LD IX,nn`. The DD and FD pages reuse the unprefixed
//! table with HL replaced by IX or IY, H and L by their halves and `(HL)`
//! by `(IX+d)`. `0xDDCB` and `0xFDCB` decode to an [`IndexedBitGroup`],
//! which reads the displacement and final opcode itself.
//!
//! Opcodes are split the usual way: `x` = bits 7..6, `y` = bits 5..3,
//! `z` = bits 2..0, `p` = bits 5..4, `q` = bit 3.

use crate::addressing::AddressingMode::{self, Extended, Immediate, RegisterIndirect};
use crate::error::DecodeError;
use crate::instruction::{
    AccumulatorOp, Add16, Adjust, Alu8, AluOp, Bit, BitOp, BlockCompare, BlockInput, BlockOutput,
    BlockTransfer, Call, Control, ControlOp, Direction, Exchange, ExchangeKind, ExchangeStack,
    IncDec16, IncDec8, IndexedBitGroup, Input, Instruction, Jump, JumpCondition, Load, LoadFlags,
    Output, Pop, Push, Return, ReturnKind, Rotate, RotateDigit, Shift, WideOp,
};
use crate::registers::{IndexRegister, Register};

/// Build the instruction for an extended opcode.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownOpcode`] for bare prefix bytes, prefix
/// chains and opcodes with no defined behaviour.
pub fn decode(opcode: u16) -> Result<Instruction, DecodeError> {
    let [page, op] = opcode.to_be_bytes();
    let instruction = match page {
        0x00 => decode_main(op, None),
        0xCB => Some(decode_bit_group(op, operand(op & 7, None), None)),
        0xDD => decode_main(op, Some(IndexRegister::Ix)),
        0xED => decode_extended(op),
        0xFD => decode_main(op, Some(IndexRegister::Iy)),
        _ => None,
    };
    instruction.ok_or(DecodeError::UnknownOpcode(opcode))
}

/// The instruction selected by the final byte of `DD CB d op` or
/// `FD CB d op`, once d and op have been read.
pub(crate) fn indexed_bit_group(index: IndexRegister, displacement: i8, op: u8) -> Instruction {
    let mode = AddressingMode::Indexed {
        index,
        delay: 0,
        displacement: Some(displacement),
    };
    decode_bit_group(op, mode, byte_register(op & 7))
}

/// Registers selected by a 3-bit operand field. 6 is the memory operand.
const fn byte_register(code: u8) -> Option<Register> {
    match code & 7 {
        0 => Some(Register::B),
        1 => Some(Register::C),
        2 => Some(Register::D),
        3 => Some(Register::E),
        4 => Some(Register::H),
        5 => Some(Register::L),
        6 => None,
        _ => Some(Register::A),
    }
}

/// Operand for a 3-bit field, with the index substitution applied.
fn operand(code: u8, index: Option<IndexRegister>) -> AddressingMode {
    match (byte_register(code), index) {
        (Some(Register::H), Some(index)) => AddressingMode::Register(index.high()),
        (Some(Register::L), Some(index)) => AddressingMode::Register(index.low()),
        (Some(reg), _) => AddressingMode::Register(reg),
        (None, Some(index)) => AddressingMode::indexed(index),
        (None, None) => AddressingMode::hl_indirect(),
    }
}

/// Operand for a 3-bit field that is not substituted, because the other
/// operand of the same instruction is `(IX+d)`.
fn plain_operand(code: u8) -> AddressingMode {
    operand(code, None)
}

/// BC, DE, HL (or IX/IY), SP.
const fn pair_sp(p: u8, hl: Register) -> Register {
    match p & 3 {
        0 => Register::Bc,
        1 => Register::De,
        2 => hl,
        _ => Register::Sp,
    }
}

/// BC, DE, HL (or IX/IY), AF.
const fn pair_af(p: u8, hl: Register) -> Register {
    match p & 3 {
        0 => Register::Bc,
        1 => Register::De,
        2 => hl,
        _ => Register::Af,
    }
}

fn decode_main(op: u8, index: Option<IndexRegister>) -> Option<Instruction> {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;
    let hl = index.map_or(Register::Hl, IndexRegister::pair);

    let instruction: Instruction = match (x, z) {
        (0, 0) => match y {
            0 => Control::new(ControlOp::Nop).into(),
            1 => Exchange::new(ExchangeKind::AfAlternate).into(),
            2 => Jump::djnz().into(),
            3 => Jump::relative(JumpCondition::Always).into(),
            _ => Jump::relative(JumpCondition::from_bits(y - 4)).into(),
        },
        (0, 1) if q == 0 => {
            Load::word(AddressingMode::Register(pair_sp(p, hl)), Immediate).into()
        }
        (0, 1) => Add16::new(WideOp::Add, hl, pair_sp(p, hl)).into(),
        (0, 2) => {
            let a = AddressingMode::Register(Register::A);
            match y {
                0 => Load::byte(RegisterIndirect(Register::Bc), a),
                1 => Load::byte(a, RegisterIndirect(Register::Bc)),
                2 => Load::byte(RegisterIndirect(Register::De), a),
                3 => Load::byte(a, RegisterIndirect(Register::De)),
                4 => Load::word(Extended, AddressingMode::Register(hl)),
                5 => Load::word(AddressingMode::Register(hl), Extended),
                6 => Load::byte(Extended, a),
                _ => Load::byte(a, Extended),
            }
            .into()
        }
        (0, 3) if q == 0 => IncDec16::inc(pair_sp(p, hl)).into(),
        (0, 3) => IncDec16::dec(pair_sp(p, hl)).into(),
        (0, 4) => IncDec8::inc(operand(y, index)).into(),
        (0, 5) => IncDec8::dec(operand(y, index)).into(),
        (0, 6) => match (y, index) {
            // d and n are both read before the address is ready.
            (6, Some(index)) => {
                let dst = AddressingMode::Indexed {
                    index,
                    delay: 0,
                    displacement: None,
                };
                Load::byte(dst, Immediate).with_settle(2).into()
            }
            _ => Load::byte(operand(y, index), Immediate).into(),
        },
        (0, _) => match y {
            0 => Rotate::accumulator(Shift::RLC).into(),
            1 => Rotate::accumulator(Shift::RRC).into(),
            2 => Rotate::accumulator(Shift::RL).into(),
            3 => Rotate::accumulator(Shift::RR).into(),
            4 => AccumulatorOp::new(Adjust::Daa).into(),
            5 => AccumulatorOp::new(Adjust::Cpl).into(),
            6 => AccumulatorOp::new(Adjust::Scf).into(),
            _ => AccumulatorOp::new(Adjust::Ccf).into(),
        },
        (1, _) if y == 6 && z == 6 => Control::new(ControlOp::Halt).into(),
        (1, _) if y == 6 => Load::byte(operand(y, index), plain_operand(z)).into(),
        (1, _) if z == 6 => Load::byte(plain_operand(y), operand(z, index)).into(),
        (1, _) => Load::byte(operand(y, index), operand(z, index)).into(),
        (2, _) => Alu8::new(AluOp::from_bits(y), operand(z, index)).into(),
        (3, 0) => Return::new(JumpCondition::from_bits(y)).into(),
        (3, 1) if q == 0 => Pop::new(pair_af(p, hl)).into(),
        (3, 1) => match p {
            0 => Return::new(JumpCondition::Always).into(),
            1 => Exchange::new(ExchangeKind::All).into(),
            2 => Jump::register(hl).into(),
            _ => Load::word(
                AddressingMode::Register(Register::Sp),
                AddressingMode::Register(hl),
            )
            .with_pre(2)
            .into(),
        },
        (3, 2) => Jump::absolute(JumpCondition::from_bits(y)).into(),
        (3, 3) => match y {
            0 => Jump::absolute(JumpCondition::Always).into(),
            1 => IndexedBitGroup::new(index?).into(),
            2 => Output::immediate().into(),
            3 => Input::immediate().into(),
            4 => ExchangeStack::new(hl).into(),
            // Never substituted.
            5 => Exchange::new(ExchangeKind::DeHl).into(),
            6 => Control::new(ControlOp::Di).into(),
            _ => Control::new(ControlOp::Ei).into(),
        },
        (3, 4) => Call::new(JumpCondition::from_bits(y)).into(),
        (3, 5) if q == 0 => Push::new(pair_af(p, hl)).into(),
        (3, 5) if p == 0 => Call::new(JumpCondition::Always).into(),
        // DD, ED and FD are prefixes.
        (3, 5) => return None,
        (3, 6) => Alu8::new(AluOp::from_bits(y), Immediate).into(),
        _ => Call::rst(u16::from(y) * 8).into(),
    };
    Some(instruction)
}

/// The CB page, and the final byte of DD CB / FD CB. `copy` is the
/// register an indexed rotate, SET or RES also writes its result to.
fn decode_bit_group(op: u8, mode: AddressingMode, copy: Option<Register>) -> Instruction {
    let y = (op >> 3) & 7;
    match op >> 6 {
        0 => {
            let rotate = Rotate::new(Shift::from_bits(y), mode);
            match copy {
                Some(reg) => rotate.copy_to(reg).into(),
                None => rotate.into(),
            }
        }
        1 => Bit::new(BitOp::Test, y, mode).into(),
        x => {
            let op = if x == 2 { BitOp::Reset } else { BitOp::Set };
            let bit = Bit::new(op, y, mode);
            match copy {
                Some(reg) => bit.copy_to(reg).into(),
                None => bit.into(),
            }
        }
    }
}

fn decode_extended(op: u8) -> Option<Instruction> {
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;

    let instruction: Instruction = match (op >> 6, z) {
        (1, 0) => Input::register(byte_register(y)).into(),
        (1, 1) => Output::register(byte_register(y)).into(),
        (1, 2) => {
            let wide = if q == 0 { WideOp::Sbc } else { WideOp::Adc };
            Add16::new(wide, Register::Hl, pair_sp(p, Register::Hl)).into()
        }
        (1, 3) => {
            let pair = AddressingMode::Register(pair_sp(p, Register::Hl));
            if q == 0 {
                Load::word(Extended, pair).into()
            } else {
                Load::word(pair, Extended).into()
            }
        }
        (1, 4) => AccumulatorOp::new(Adjust::Neg).into(),
        (1, 5) if y == 1 => Return::with_kind(JumpCondition::Always, ReturnKind::Reti).into(),
        (1, 5) => Return::with_kind(JumpCondition::Always, ReturnKind::Retn).into(),
        (1, 6) => {
            let mode = match y & 3 {
                0 | 1 => 0,
                2 => 1,
                _ => 2,
            };
            Control::new(ControlOp::Im(mode)).into()
        }
        (1, 7) => {
            let a = AddressingMode::Register(Register::A);
            match y {
                0 => Load::byte(AddressingMode::Register(Register::I), a)
                    .with_pre(1)
                    .into(),
                1 => Load::byte(AddressingMode::Register(Register::R), a)
                    .with_pre(1)
                    .into(),
                2 => Load::byte(a, AddressingMode::Register(Register::I))
                    .with_pre(1)
                    .with_flags(LoadFlags::InterruptState)
                    .into(),
                3 => Load::byte(a, AddressingMode::Register(Register::R))
                    .with_pre(1)
                    .with_flags(LoadFlags::InterruptState)
                    .into(),
                4 => RotateDigit::rrd().into(),
                5 => RotateDigit::rld().into(),
                _ => return None,
            }
        }
        (2, 0..=3) if y >= 4 => {
            let direction = if y & 1 == 0 {
                Direction::Increment
            } else {
                Direction::Decrement
            };
            let repeat = y >= 6;
            match z {
                0 => BlockTransfer::new(direction, repeat).into(),
                1 => BlockCompare::new(direction, repeat).into(),
                2 => BlockInput::new(direction, repeat).into(),
                _ => BlockOutput::new(direction, repeat).into(),
            }
        }
        _ => return None,
    };
    Some(instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Behavior;

    fn mnemonic(opcode: u16) -> String {
        match decode(opcode) {
            Ok(instruction) => instruction.mnemonic(),
            Err(err) => panic!("{err}"),
        }
    }

    #[test]
    fn unprefixed_page() {
        assert_eq!(mnemonic(0x0000), "NOP");
        assert_eq!(mnemonic(0x0078), "LD A,B");
        assert_eq!(mnemonic(0x0036), "LD (HL),n");
        assert_eq!(mnemonic(0x003A), "LD A,(nn)");
        assert_eq!(mnemonic(0x0022), "LD (nn),HL");
        assert_eq!(mnemonic(0x0009), "ADD HL,BC");
        assert_eq!(mnemonic(0x0076), "HALT");
        assert_eq!(mnemonic(0x00F5), "PUSH AF");
        assert_eq!(mnemonic(0x00FF), "RST 38H");
        assert_eq!(mnemonic(0x0010), "DJNZ e");
        assert_eq!(mnemonic(0x00E9), "JP (HL)");
    }

    #[test]
    fn index_substitution() {
        assert_eq!(mnemonic(0xDD21), "LD IX,nn");
        assert_eq!(mnemonic(0xDD7E), "LD A,(IX+d)");
        assert_eq!(mnemonic(0xFD66), "LD H,(IY+d)");
        assert_eq!(mnemonic(0xDD75), "LD (IX+d),L");
        assert_eq!(mnemonic(0xDD65), "LD IXH,IXL");
        assert_eq!(mnemonic(0xFD2C), "INC IYL");
        assert_eq!(mnemonic(0xDDE3), "EX (SP),IX");
        assert_eq!(mnemonic(0xDDEB), "EX DE,HL");
        assert_eq!(mnemonic(0xDD29), "ADD IX,IX");
        assert_eq!(mnemonic(0xFDE9), "JP (IY)");
    }

    #[test]
    fn index_prefix_without_hl_behaves_unprefixed() {
        assert_eq!(mnemonic(0xDD00), "NOP");
        assert_eq!(mnemonic(0xFD47), "LD B,A");
    }

    #[test]
    fn bit_and_extended_pages() {
        assert_eq!(mnemonic(0xCB7E), "BIT 7,(HL)");
        assert_eq!(mnemonic(0xCB30), "SLL B");
        assert_eq!(mnemonic(0xED44), "NEG");
        assert_eq!(mnemonic(0xED4D), "RETI");
        assert_eq!(mnemonic(0xED57), "LD A,I");
        assert_eq!(mnemonic(0xED70), "IN (C)");
        assert_eq!(mnemonic(0xED71), "OUT (C),0");
        assert_eq!(mnemonic(0xEDB0), "LDIR");
        assert_eq!(mnemonic(0xEDBB), "OTDR");
        assert_eq!(mnemonic(0xED6F), "RLD");
    }

    #[test]
    fn indexed_bit_group_copies_to_register() {
        let rotate = indexed_bit_group(IndexRegister::Ix, 5, 0x00);
        assert_eq!(rotate.mnemonic(), "RLC (IX+5),B");
        let test = indexed_bit_group(IndexRegister::Iy, -2, 0x46);
        assert_eq!(test.mnemonic(), "BIT 0,(IY-2)");
        let set = indexed_bit_group(IndexRegister::Ix, 0, 0xFE);
        assert_eq!(set.mnemonic(), "SET 7,(IX+0)");
    }

    #[test]
    fn unknown_opcodes() {
        for opcode in [0x00CB, 0x00DD, 0x00ED, 0x00FD, 0xDDDD, 0xDDED, 0xED00, 0xED77, 0xEDFF] {
            assert_eq!(
                decode(opcode).map(|i| i.mnemonic()),
                Err(DecodeError::UnknownOpcode(opcode)),
                "{opcode:04X}"
            );
        }
        assert_eq!(
            DecodeError::UnknownOpcode(0xED00).to_string(),
            "unknown opcode ED00"
        );
    }

    #[test]
    fn every_cb_opcode_decodes() {
        for op in 0..=0xFFu16 {
            assert!(decode(0xCB00 | op).is_ok(), "CB{op:02X}");
        }
    }
}
