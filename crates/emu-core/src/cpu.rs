//! CPU core trait.

/// A CPU core driven one clock pulse at a time.
///
/// The CPU talks to the outside world only through its pins. Each call to
/// [`Cpu::clock`] advances exactly one T-state and updates the pins; the
/// host services them before the next call.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by one T-state.
    fn clock(&mut self);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Drive the maskable interrupt request line.
    fn interrupt(&mut self, asserted: bool);

    /// Drive the non-maskable interrupt line.
    fn nmi(&mut self, asserted: bool);

    /// Reset the CPU.
    fn reset(&mut self);
}
