//! Decode errors.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No instruction is defined for this extended opcode. Prefixed
    /// opcodes carry the prefix in the high byte (`0xED77`).
    UnknownOpcode(u16),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode(opcode) if *opcode > 0xFF => {
                write!(f, "unknown opcode {opcode:04X}")
            }
            Self::UnknownOpcode(opcode) => write!(f, "unknown opcode {opcode:02X}"),
        }
    }
}

impl std::error::Error for DecodeError {}
