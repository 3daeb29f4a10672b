//! Cycle-accurate Z80 CPU emulator.
//!
//! Each call to `clock()` advances exactly one T-state. The CPU talks to
//! the outside world only through its [`Pins`]; [`Machine`] is a ready-made
//! host that answers them from any [`emu_core::Bus`].

pub mod addressing;
pub mod alu;
mod cpu;
pub mod cycle;
mod decode;
mod error;
pub mod flags;
pub mod instruction;
mod interrupt;
mod machine;
mod pins;
mod registers;
mod state;

pub use cpu::Z80;
pub use decode::decode;
pub use error::DecodeError;
pub use flags::{CF, HF, NF, PF, SF, ZF};
pub use interrupt::{InterruptKind, InterruptResponse};
pub use machine::Machine;
pub use pins::Pins;
pub use registers::{IndexRegister, Register, Registers};
pub use state::State;
