//! Shared harness for the integration tests.

#![allow(dead_code)] // Each test binary uses a different subset.

use emu_core::{SimpleBus, Ticks};
use zilog_z80::Machine;

/// Where test programs are loaded and started.
pub const ORIGIN: u16 = 0x0000;

/// Stack pointer every test machine starts with.
pub const STACK: u16 = 0x8000;

/// A machine with `program` at [`ORIGIN`], PC there and SP at [`STACK`].
pub fn machine(program: &[u8]) -> Machine<SimpleBus> {
    let mut bus = SimpleBus::new();
    bus.load(ORIGIN, program);
    let mut machine = Machine::new(bus);
    let regs = machine.cpu_mut().regs_mut();
    regs.pc = ORIGIN;
    regs.sp = STACK;
    machine
}

/// Run one instruction and return its T-states.
pub fn run_instruction(machine: &mut Machine<SimpleBus>) -> u64 {
    machine.step().get()
}

/// Run until HALT completes and return the T-states taken, panicking if
/// the program takes more than a million.
pub fn run_until_halt(machine: &mut Machine<SimpleBus>) -> u64 {
    match machine.run_until_halt(Ticks::new(1_000_000)) {
        Some(ticks) => ticks.get(),
        None => panic!(
            "program did not halt; PC={:04X}",
            machine.cpu().regs().pc
        ),
    }
}

/// T-states taken by the first instruction of `program`.
pub fn cycles(program: &[u8]) -> u64 {
    run_instruction(&mut machine(program))
}
