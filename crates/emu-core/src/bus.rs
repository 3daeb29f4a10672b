//! Memory and I/O bus interface.

use std::collections::HashMap;

/// Memory and I/O collaborator behind a CPU's pins.
///
/// The CPU never calls this directly. A host samples the CPU's control
/// lines after each clock pulse and forwards the transaction here: a read
/// when MREQ and RD are both asserted, a write when MREQ and WR are, and the
/// I/O equivalents when IORQ replaces MREQ.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte from an I/O port. Unconnected ports float high.
    fn io_read(&mut self, _port: u16) -> u8 {
        0xFF
    }

    /// Write a byte to an I/O port.
    fn io_write(&mut self, _port: u16, _value: u8) {}

    /// Byte driven onto the data bus during an interrupt acknowledge cycle.
    ///
    /// Defaults to 0xFF, which is `RST 38h` in interrupt mode 0.
    fn acknowledge(&mut self) -> u8 {
        0xFF
    }
}

/// Flat 64 KiB RAM with a simple port space.
///
/// Input ports return whatever was preloaded with [`SimpleBus::set_port`]
/// (0xFF otherwise). Output writes are recorded in order so tests can check
/// what the CPU sent.
pub struct SimpleBus {
    ram: Box<[u8; 0x10000]>,
    ports: HashMap<u16, u8>,
    outputs: Vec<(u16, u8)>,
    vector: u8,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            ports: HashMap::new(),
            outputs: Vec::new(),
            vector: 0xFF,
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64 KiB.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read RAM without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Write RAM without going through the CPU.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    /// Preload the value an `IN` from `port` will see.
    pub fn set_port(&mut self, port: u16, value: u8) {
        self.ports.insert(port, value);
    }

    /// Every `(port, value)` pair written so far, oldest first.
    #[must_use]
    pub fn outputs(&self) -> &[(u16, u8)] {
        &self.outputs
    }

    /// Set the byte supplied during interrupt acknowledge.
    pub fn set_vector(&mut self, value: u8) {
        self.vector = value;
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.ports.get(&port).copied().unwrap_or(0xFF)
    }

    fn io_write(&mut self, port: u16, value: u8) {
        self.outputs.push((port, value));
    }

    fn acknowledge(&mut self) -> u8 {
        self.vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x12, 0x34]);
        assert_eq!(bus.peek(0xFFFF), 0x12);
        assert_eq!(bus.peek(0x0000), 0x34);
    }

    #[test]
    fn unset_ports_float_high() {
        let mut bus = SimpleBus::new();
        bus.set_port(0x10FE, 0x42);
        assert_eq!(bus.io_read(0x10FE), 0x42);
        assert_eq!(bus.io_read(0x00FE), 0xFF);
    }

    #[test]
    fn outputs_are_recorded_in_order() {
        let mut bus = SimpleBus::new();
        bus.io_write(0x0001, 0xAA);
        bus.io_write(0x0002, 0xBB);
        assert_eq!(bus.outputs(), &[(0x0001, 0xAA), (0x0002, 0xBB)]);
    }
}
