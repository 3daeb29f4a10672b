//! A Z80 wired to a bus.

use emu_core::{Bus, Cpu, Tickable, Ticks};

use crate::cpu::Z80;
use crate::pins::Pins;

/// The reference host: clocks the CPU and answers its pins from a
/// [`Bus`] after every pulse.
///
/// Each transaction is serviced once, on the pulse its request line rises.
/// Reads put the byte on the data pins, where it stays until the cycle
/// latches it.
#[derive(Debug)]
pub struct Machine<B: Bus> {
    cpu: Z80,
    bus: B,
    /// Pins as they were after the previous pulse.
    previous: Pins,
}

impl<B: Bus> Machine<B> {
    #[must_use]
    pub fn new(bus: B) -> Self {
        Self::with_cpu(Z80::new(), bus)
    }

    #[must_use]
    pub fn with_cpu(cpu: Z80, bus: B) -> Self {
        let previous = *cpu.pins();
        Self { cpu, bus, previous }
    }

    #[must_use]
    pub const fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    #[must_use]
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Answer whatever request rose on the last pulse.
    fn service(&mut self) {
        let pins = *self.cpu.pins();
        let previous = self.previous;
        if pins.memory_read() && !previous.memory_read() {
            self.cpu.pins_mut().data = self.bus.read(pins.address);
        } else if pins.memory_write() && !previous.memory_write() {
            self.bus.write(pins.address, pins.data);
        } else if pins.interrupt_acknowledge() && !previous.interrupt_acknowledge() {
            self.cpu.pins_mut().data = self.bus.acknowledge();
        } else if pins.io_read() && !previous.io_read() {
            self.cpu.pins_mut().data = self.bus.io_read(pins.address);
        } else if pins.io_write() && !previous.io_write() {
            self.bus.io_write(pins.address, pins.data);
        }
        self.previous = *self.cpu.pins();
    }

    /// Run to the next instruction boundary, finishing whatever is in
    /// flight (or running one whole instruction from a boundary). Returns
    /// the T-states taken.
    pub fn step(&mut self) -> Ticks {
        let start = self.cpu.total_ticks();
        loop {
            self.tick();
            if self.cpu.at_boundary() {
                return self.cpu.total_ticks() - start;
            }
        }
    }

    /// Clock until a HALT instruction has completed. Returns the T-states
    /// taken, or `None` if `budget` ran out first.
    pub fn run_until_halt(&mut self, budget: Ticks) -> Option<Ticks> {
        let start = self.cpu.total_ticks();
        loop {
            let used = self.cpu.total_ticks() - start;
            if self.cpu.is_halted() && self.cpu.at_boundary() {
                return Some(used);
            }
            if used >= budget {
                return None;
            }
            self.tick();
        }
    }
}

impl<B: Bus> Tickable for Machine<B> {
    fn tick(&mut self) {
        self.cpu.clock();
        self.service();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    #[test]
    fn step_runs_one_instruction() {
        let mut bus = SimpleBus::new();
        bus.load(0, &[0x3E, 0x42, 0x00]);
        let mut machine = Machine::new(bus);
        assert_eq!(machine.step(), Ticks::new(7));
        assert_eq!(machine.cpu().regs().a, 0x42);
        assert_eq!(machine.step(), Ticks::new(4));
        assert_eq!(machine.cpu().pc(), 3);
    }

    #[test]
    fn budget_stops_a_runaway_loop() {
        let mut bus = SimpleBus::new();
        // JR -2
        bus.load(0, &[0x18, 0xFE]);
        let mut machine = Machine::new(bus);
        assert_eq!(machine.run_until_halt(Ticks::new(1000)), None);
        assert_eq!(machine.cpu().total_ticks(), Ticks::new(1000));
    }

    #[test]
    fn writes_reach_the_bus_once() {
        let mut bus = SimpleBus::new();
        // LD A,5; OUT (0x10),A; HALT
        bus.load(0, &[0x3E, 0x05, 0xD3, 0x10, 0x76]);
        let mut machine = Machine::new(bus);
        assert_eq!(machine.run_until_halt(Ticks::new(100)), Some(Ticks::new(22)));
        assert_eq!(machine.bus().outputs(), &[(0x0510, 0x05)]);
    }
}
