//! Just enough CP/M to run console test programs such as ZEXDOC.
//!
//! Memory layout:
//! - 0x0000: warm boot. A HALT, so returning to CP/M stops the run.
//! - 0x0005: BDOS entry. A RET; the call itself is answered by the host.
//! - 0x0006: top of the TPA, which programs load into SP.
//! - 0x0100: program load address (TPA start).

use std::io::{self, Write};

use emu_core::SimpleBus;
use zilog_z80::Registers;

pub const TPA: u16 = 0x0100;
pub const BDOS: u16 = 0x0005;
const TPA_TOP: u16 = 0xFE00;

/// Initial SP. The word above it is 0x0000, so a final RET warm boots.
pub const STACK: u16 = TPA_TOP - 2;

/// What the program asked BDOS for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bdos {
    /// Console output done; carry on with the RET at the entry point.
    Continue,
    /// System reset (function 0).
    Exit,
}

/// Write the page-zero vectors and the initial return address.
pub fn install(bus: &mut SimpleBus) {
    bus.load(0x0000, &[0x76]);
    bus.load(BDOS, &[0xC9]);
    bus.load(0x0006, &TPA_TOP.to_le_bytes());
    bus.load(STACK, &[0x00, 0x00]);
}

/// Answer the BDOS call whose function number is in C.
pub fn call<W: Write>(regs: &Registers, bus: &SimpleBus, console: &mut W) -> io::Result<Bdos> {
    match regs.c {
        0 => return Ok(Bdos::Exit),
        2 => console.write_all(&[regs.e])?,
        9 => {
            let mut address = regs.de();
            let mut text = Vec::new();
            for _ in 0..=u16::MAX {
                let byte = bus.peek(address);
                if byte == b'$' {
                    break;
                }
                text.push(byte);
                address = address.wrapping_add(1);
            }
            console.write_all(&text)?;
        }
        other => log::warn!("unsupported BDOS function {other}"),
    }
    console.flush()?;
    Ok(Bdos::Continue)
}
