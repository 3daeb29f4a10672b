//! Z80 CPU core with per-T-state execution.

use emu_core::{Cpu, Observable, Ticks, Value};

use crate::cycle::MachineCycle;
use crate::decode::decode;
use crate::flags::{CF, HF, NF, PF, SF, ZF};
use crate::instruction::{Behavior, Instruction};
use crate::interrupt::{InterruptKind, InterruptResponse};
use crate::pins::Pins;
use crate::registers::Registers;
use crate::state::State;

/// An opcode fetch in progress, possibly after one or more prefix bytes.
#[derive(Debug, Clone, Copy)]
struct Fetch {
    cycle: MachineCycle,
    /// Page prefix already fetched (0 for none).
    prefix: u8,
    /// Address of the first byte of the instruction.
    pc: u16,
    /// A halt fetch: the byte is discarded.
    halt: bool,
}

/// What the CPU is doing between boundaries.
#[derive(Debug, Clone)]
enum Phase {
    /// At an instruction boundary. The next pulse starts a new slot.
    Idle,
    Fetching(Fetch),
    Executing(Instruction),
    Interrupt(InterruptResponse),
}

/// Z80 CPU.
///
/// The CPU owns no memory. Every call to [`Cpu::clock`] advances one
/// T-state and leaves the bus request on [`Z80::pins`]; the host answers it
/// before the next pulse (see [`crate::Machine`]).
#[derive(Debug, Clone)]
pub struct Z80 {
    state: State,
    phase: Phase,
    /// Latched by a rising edge on the NMI pin.
    nmi_pending: bool,
    /// NMI pin level at the previous pulse, for edge detection.
    nmi_last: bool,
    total_ticks: Ticks,
}

impl Z80 {
    /// Create a Z80 in its reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::default(),
            phase: Phase::Idle,
            nmi_pending: false,
            nmi_last: false,
            total_ticks: Ticks::ZERO,
        }
    }

    /// Total T-states elapsed since creation.
    #[must_use]
    pub const fn total_ticks(&self) -> Ticks {
        self.total_ticks
    }

    #[must_use]
    pub const fn regs(&self) -> &Registers {
        &self.state.regs
    }

    /// Register file, for seeding state before a run.
    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.state.regs
    }

    #[must_use]
    pub const fn pins(&self) -> &Pins {
        &self.state.pins
    }

    /// Pins, for the host to drive data and the interrupt inputs.
    pub fn pins_mut(&mut self) -> &mut Pins {
        &mut self.state.pins
    }

    /// True between instructions: the next pulse starts a fetch or an
    /// interrupt response.
    #[must_use]
    pub const fn at_boundary(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// The instruction or interrupt response in flight, if any.
    #[must_use]
    pub fn mnemonic(&self) -> Option<String> {
        match &self.phase {
            Phase::Executing(instruction) => Some(instruction.mnemonic()),
            Phase::Interrupt(response) => Some(response.mnemonic()),
            Phase::Idle | Phase::Fetching(_) => None,
        }
    }

    /// Start whatever occupies the next slot: NMI, INT, a halt fetch or an
    /// ordinary fetch.
    fn begin_slot(&mut self) {
        let deferred = std::mem::take(&mut self.state.defer_interrupts);
        let regs = &self.state.regs;

        let kind = if self.nmi_pending {
            self.nmi_pending = false;
            Some(InterruptKind::Nmi)
        } else if self.state.pins.int && regs.iff1 && !deferred {
            Some(InterruptKind::Maskable(regs.im))
        } else {
            None
        };

        if let Some(kind) = kind {
            log::debug!("{kind:?} accepted at {:04X}", regs.pc);
            let mut response = InterruptResponse::new(kind);
            response.start_execution(&mut self.state);
            self.phase = Phase::Interrupt(response);
            return;
        }

        let halt = regs.halted;
        let cycle = if halt {
            MachineCycle::halt_fetch()
        } else {
            MachineCycle::opcode_fetch()
        };
        self.phase = Phase::Fetching(Fetch {
            cycle,
            prefix: 0,
            pc: regs.pc,
            halt,
        });
    }

    /// A fetch cycle has finished: fetch again after a prefix, or decode.
    fn finish_fetch(&mut self, fetch: &Fetch) {
        let byte = fetch.cycle.value();
        if fetch.halt {
            self.phase = Phase::Idle;
            return;
        }
        match (fetch.prefix, byte) {
            (0, 0xCB | 0xDD | 0xED | 0xFD) | (0xDD | 0xFD, 0xDD | 0xED | 0xFD) => {
                self.phase = Phase::Fetching(Fetch {
                    cycle: MachineCycle::opcode_fetch(),
                    prefix: byte,
                    ..*fetch
                });
            }
            (prefix, byte) => self.dispatch(u16::from_be_bytes([prefix, byte]), fetch.pc),
        }
    }

    fn dispatch(&mut self, opcode: u16, pc: u16) {
        let mut instruction = match decode(opcode) {
            Ok(instruction) => instruction,
            Err(err) => {
                log::warn!("{err} at {pc:04X}");
                self.phase = Phase::Idle;
                return;
            }
        };
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{pc:04X}  {opcode:04X}  {}", instruction.mnemonic());
        }
        instruction.reset();
        instruction.start_execution(&mut self.state);
        self.phase = if instruction.is_complete() {
            Phase::Idle
        } else {
            Phase::Executing(instruction)
        };
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn clock(&mut self) {
        self.total_ticks.increment();

        let nmi = self.state.pins.nmi;
        if nmi && !self.nmi_last {
            self.nmi_pending = true;
        }
        self.nmi_last = nmi;

        if matches!(self.phase, Phase::Idle) {
            self.begin_slot();
        }

        match &mut self.phase {
            Phase::Idle => unreachable!("a slot was started on this pulse"),
            Phase::Fetching(fetch) => {
                fetch.cycle.clock(&mut self.state);
                if fetch.cycle.is_complete() {
                    let fetch = *fetch;
                    self.finish_fetch(&fetch);
                }
            }
            Phase::Executing(instruction) => {
                instruction.clock(&mut self.state);
                if instruction.is_complete() {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Interrupt(response) => {
                response.clock(&mut self.state);
                if response.is_complete() {
                    self.phase = Phase::Idle;
                }
            }
        }
    }

    fn pc(&self) -> u16 {
        self.state.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.state.regs
    }

    fn is_halted(&self) -> bool {
        self.state.regs.halted
    }

    fn interrupt(&mut self, asserted: bool) {
        self.state.pins.int = asserted;
    }

    fn nmi(&mut self, asserted: bool) {
        self.state.pins.nmi = asserted;
    }

    /// PC, I and R to zero, interrupts disabled, mode 0, nothing in
    /// flight. Other registers keep their values.
    fn reset(&mut self) {
        log::debug!("reset at {:04X}", self.state.regs.pc);
        let regs = &mut self.state.regs;
        regs.pc = 0;
        regs.i = 0;
        regs.r = 0;
        regs.iff1 = false;
        regs.iff2 = false;
        regs.im = 0;
        regs.halted = false;
        self.state.defer_interrupts = false;
        self.state.pins.release();
        self.phase = Phase::Idle;
        self.nmi_pending = false;
    }
}

const Z80_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate registers
    "a'", "f'", "b'", "c'", "d'", "e'", "h'", "l'",
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r",
    // Flags (individual)
    "flags.s", "flags.z", "flags.h", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im",
    // Pins
    "pins.address", "pins.data", "pins.m1", "pins.mreq", "pins.iorq",
    "pins.rd", "pins.wr", "pins.int", "pins.nmi",
    // CPU state
    "halted", "ticks", "mnemonic",
];

fn pair(high: u8, low: u8) -> u16 {
    u16::from_be_bytes([high, low])
}

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.state.regs;
        let pins = &self.state.pins;
        match path {
            // Main registers
            "a" => Some(regs.a.into()),
            "f" => Some(regs.f.into()),
            "b" => Some(regs.b.into()),
            "c" => Some(regs.c.into()),
            "d" => Some(regs.d.into()),
            "e" => Some(regs.e.into()),
            "h" => Some(regs.h.into()),
            "l" => Some(regs.l.into()),

            // Register pairs
            "af" => Some(regs.af().into()),
            "bc" => Some(regs.bc().into()),
            "de" => Some(regs.de().into()),
            "hl" => Some(regs.hl().into()),

            // Alternate registers
            "a'" => Some(regs.a_alt.into()),
            "f'" => Some(regs.f_alt.into()),
            "b'" => Some(regs.b_alt.into()),
            "c'" => Some(regs.c_alt.into()),
            "d'" => Some(regs.d_alt.into()),
            "e'" => Some(regs.e_alt.into()),
            "h'" => Some(regs.h_alt.into()),
            "l'" => Some(regs.l_alt.into()),
            "af'" => Some(pair(regs.a_alt, regs.f_alt).into()),
            "bc'" => Some(pair(regs.b_alt, regs.c_alt).into()),
            "de'" => Some(pair(regs.d_alt, regs.e_alt).into()),
            "hl'" => Some(pair(regs.h_alt, regs.l_alt).into()),

            // Index registers
            "ix" => Some(regs.ix.into()),
            "iy" => Some(regs.iy.into()),
            "ixh" => Some(((regs.ix >> 8) as u8).into()),
            "ixl" => Some((regs.ix as u8).into()),
            "iyh" => Some(((regs.iy >> 8) as u8).into()),
            "iyl" => Some((regs.iy as u8).into()),

            // Other registers
            "sp" => Some(regs.sp.into()),
            "pc" => Some(regs.pc.into()),
            "i" => Some(regs.i.into()),
            "r" => Some(regs.r.into()),

            // Individual flags
            "flags.s" => Some((regs.f & SF != 0).into()),
            "flags.z" => Some((regs.f & ZF != 0).into()),
            "flags.h" => Some((regs.f & HF != 0).into()),
            "flags.p" => Some((regs.f & PF != 0).into()),
            "flags.n" => Some((regs.f & NF != 0).into()),
            "flags.c" => Some((regs.f & CF != 0).into()),

            // Interrupt state
            "iff1" => Some(regs.iff1.into()),
            "iff2" => Some(regs.iff2.into()),
            "im" => Some(regs.im.into()),

            // Pins
            "pins.address" => Some(pins.address.into()),
            "pins.data" => Some(pins.data.into()),
            "pins.m1" => Some(pins.m1.into()),
            "pins.mreq" => Some(pins.mreq.into()),
            "pins.iorq" => Some(pins.iorq.into()),
            "pins.rd" => Some(pins.rd.into()),
            "pins.wr" => Some(pins.wr.into()),
            "pins.int" => Some(pins.int.into()),
            "pins.nmi" => Some(pins.nmi.into()),

            // CPU state
            "halted" => Some(regs.halted.into()),
            "ticks" => Some(self.total_ticks.get().into()),
            "mnemonic" => Some(self.mnemonic().unwrap_or_default().into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
