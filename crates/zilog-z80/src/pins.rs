//! The Z80's bus pins.
//!
//! These are the only channel between the CPU and the rest of a machine.
//! The CPU drives address, the control outputs and (during writes) data;
//! the host drives data during reads and the two interrupt inputs.

/// Pin-level view of the CPU's bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pins {
    /// Address bus.
    pub address: u16,
    /// Data bus.
    pub data: u8,
    /// Machine cycle one: opcode fetch or interrupt acknowledge.
    pub m1: bool,
    /// Memory request.
    pub mreq: bool,
    /// I/O request.
    pub iorq: bool,
    /// Read strobe.
    pub rd: bool,
    /// Write strobe.
    pub wr: bool,
    /// Maskable interrupt request (input, level sensitive).
    pub int: bool,
    /// Non-maskable interrupt (input, edge sensitive).
    pub nmi: bool,
}

impl Pins {
    /// Memory must place the byte at `address` on `data`.
    #[must_use]
    pub const fn memory_read(&self) -> bool {
        self.mreq && self.rd
    }

    /// Memory must store `data` at `address`.
    #[must_use]
    pub const fn memory_write(&self) -> bool {
        self.mreq && self.wr
    }

    /// The port at `address` must place a byte on `data`.
    #[must_use]
    pub const fn io_read(&self) -> bool {
        self.iorq && self.rd
    }

    /// The port at `address` must accept `data`.
    #[must_use]
    pub const fn io_write(&self) -> bool {
        self.iorq && self.wr
    }

    /// The interrupting device must place its response byte on `data`.
    #[must_use]
    pub const fn interrupt_acknowledge(&self) -> bool {
        self.m1 && self.iorq
    }

    /// Drop every control output.
    pub(crate) fn release(&mut self) {
        self.m1 = false;
        self.mreq = false;
        self.iorq = false;
        self.rd = false;
        self.wr = false;
    }
}
